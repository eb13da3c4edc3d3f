//! Logging utilities with colored output.
//!
//! This module provides:
//! - `log!` macro for formatted terminal output with colored prefixes
//! - `debug!` macro, printed only with `--verbose`
//! - the session banner shown when the first client connects
//!
//! # Example
//!
//! ```ignore
//! log!("watch"; "watching {}/ for {}", dir, slug);
//! debug!("ws"; "client {} joined", id);
//! ```

use crossterm::{
    cursor, execute,
    terminal::{Clear, ClearType},
};
use owo_colors::OwoColorize;
use std::{
    io::{Write, stdout},
    sync::atomic::{AtomicBool, Ordering},
};

use crate::utils::date::DateTimeUtc;

/// Global verbose flag (set by --verbose CLI argument)
static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Set verbose mode globally
pub fn set_verbose(v: bool) {
    VERBOSE.store(v, Ordering::SeqCst);
}

/// Check if verbose mode is enabled
pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}

// ============================================================================
// Log Macro
// ============================================================================

/// Log a message with a colored module prefix
///
/// # Usage
/// ```ignore
/// log!("module"; "message with {} formatting", args);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Log a debug message (only shown when --verbose is enabled)
///
/// # Usage
/// ```ignore
/// debug!("module"; "debug info: {}", value);
/// ```
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Log a message with a colored module prefix
#[inline]
pub fn log(module: &str, message: &str) {
    let module_lower = module.to_ascii_lowercase();
    let prefix = colorize_prefix(module, &module_lower);

    let mut stdout = stdout().lock();
    execute!(stdout, Clear(ClearType::UntilNewLine)).ok();
    writeln!(stdout, "{prefix} {message}").ok();
    stdout.flush().ok();
}

/// Apply color to a module prefix based on module type
#[inline]
fn colorize_prefix(module: &str, module_lower: &str) -> String {
    let prefix = format!("[{module}]");
    match module_lower {
        "serve" => prefix.bright_blue().bold().to_string(),
        "watch" => prefix.bright_green().bold().to_string(),
        "ws" | "reload" => prefix.bright_magenta().bold().to_string(),
        "error" => prefix.bright_red().bold().to_string(),
        _ => prefix.bright_yellow().bold().to_string(),
    }
}

// ============================================================================
// Session Banner
// ============================================================================

const SEPARATOR_WIDTH: usize = 50;

/// Lines of the session banner.
fn session_banner(slug: &str, port: u16, started: DateTimeUtc) -> [String; 4] {
    [
        "─".repeat(SEPARATOR_WIDTH),
        format!("🚀 Session started: {}", started.to_display()),
        format!("🟢 Project at http://localhost:{port}/{slug}"),
        "⏹️  Press Ctrl+C to stop the server.".to_string(),
    ]
}

/// Print the banner marking the start of a preview session.
pub fn print_session_banner(slug: &str, port: u16) {
    let [separator, started, project, hint] = session_banner(slug, port, DateTimeUtc::now());

    let mut stdout = stdout().lock();
    writeln!(stdout).ok();
    writeln!(stdout, "{}", separator.dimmed()).ok();
    writeln!(stdout, "{started}").ok();
    writeln!(stdout, "{}", project.bold()).ok();
    writeln!(stdout, "{}", hint.dimmed()).ok();
    writeln!(stdout).ok();
    stdout.flush().ok();
}

/// Clear the terminal and move the cursor home.
pub fn clear_screen() {
    let mut stdout = stdout().lock();
    execute!(stdout, Clear(ClearType::All), Clear(ClearType::Purge), cursor::MoveTo(0, 0)).ok();
    stdout.flush().ok();
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_banner_lines() {
        let started = DateTimeUtc::new(2026, 3, 4, 5, 6, 7);
        let lines = session_banner("game1", 3000, started);

        assert_eq!(lines[0].chars().count(), SEPARATOR_WIDTH);
        assert!(lines[0].chars().all(|c| c == '─'));
        assert_eq!(lines[1], "🚀 Session started: 2026-03-04 05:06:07");
        assert_eq!(lines[2], "🟢 Project at http://localhost:3000/game1");
        assert!(lines[3].contains("Ctrl+C"));
    }

    #[test]
    fn test_verbose_toggle() {
        set_verbose(true);
        assert!(is_verbose());
        set_verbose(false);
        assert!(!is_verbose());
    }
}
