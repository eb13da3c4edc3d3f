//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{DEFAULT_HTTP_PORT, DEFAULT_WS_PORT};

/// microrunner development server CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Enable verbose output for debugging
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the development server with live updates
    #[command(visible_alias = "s")]
    Serve {
        #[command(flatten)]
        args: ServeArgs,
    },
}

/// Serve command arguments.
#[derive(clap::Args, Debug, Clone)]
pub struct ServeArgs {
    /// Project directory (must contain project.toml).
    /// Defaults to the nearest ancestor of the current directory holding one.
    #[arg(long = "project-path", value_hint = clap::ValueHint::DirPath)]
    pub project_path: Option<PathBuf>,

    /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
    #[arg(short, long)]
    pub interface: Option<std::net::IpAddr>,

    /// HTTP port number to listen on
    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_HTTP_PORT)]
    pub port: u16,

    /// WebSocket port for live updates
    #[arg(short, long = "ws-port", default_value_t = DEFAULT_WS_PORT)]
    pub ws_port: u16,

    /// Directory with the preview page and its static files
    #[arg(short, long = "static-dir", value_hint = clap::ValueHint::DirPath)]
    pub static_dir: Option<PathBuf>,
}
