//! Process-wide state shared by the HTTP and WebSocket fronts.

mod state;

pub use state::{is_shutdown, register_server, setup_shutdown_handler};
