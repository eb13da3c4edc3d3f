//! Server configuration.
//!
//! Built from the `serve` command line; there is no config file of its own
//! (`project.toml` belongs to the project, see [`crate::project`]).

use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use crate::cli::ServeArgs;
use crate::utils::path::normalize_path;

/// Default HTTP port (overridable with `PORT`).
pub const DEFAULT_HTTP_PORT: u16 = 3000;

/// Default WebSocket port for live updates.
pub const DEFAULT_WS_PORT: u16 = 35729;

/// Development server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeConfig {
    /// Network interface to bind.
    /// - `127.0.0.1` (default): localhost only
    /// - `0.0.0.0`: all interfaces (LAN accessible)
    pub interface: IpAddr,

    /// HTTP port number.
    pub port: u16,

    /// WebSocket port number.
    pub ws_port: u16,

    /// Explicit project directory, tilde-expanded.
    pub project_path: Option<PathBuf>,

    /// Preview page directory, tilde-expanded and absolute.
    pub static_dir: Option<PathBuf>,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_HTTP_PORT,
            ws_port: DEFAULT_WS_PORT,
            project_path: None,
            static_dir: None,
        }
    }
}

impl ServeConfig {
    /// Apply command-line overrides on top of the defaults.
    pub fn from_args(args: &ServeArgs) -> Self {
        let defaults = Self::default();
        Self {
            interface: args.interface.unwrap_or(defaults.interface),
            port: args.port,
            ws_port: args.ws_port,
            project_path: args.project_path.as_deref().map(expand_path),
            static_dir: args.static_dir.as_deref().map(expand_path),
        }
    }
}

/// Expand `~` and make the path absolute.
fn expand_path(path: &Path) -> PathBuf {
    let expanded = shellexpand::tilde(path.to_str().unwrap_or_default()).into_owned();
    normalize_path(Path::new(&expanded))
}
