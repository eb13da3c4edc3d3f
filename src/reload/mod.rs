//! Reload Module
//!
//! WebSocket live updates for the preview page.
//!
//! # Modules
//!
//! - `message` - wire messages (update, sprites, log, error, restart)
//! - `server` - WebSocket server for client connections

pub mod message;
pub mod server;
