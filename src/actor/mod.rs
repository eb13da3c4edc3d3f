//! Live-update plumbing for serve mode.
//!
//! ```text
//! WatcherManager --> BroadcastBus --> clients (ws)
//!    (notify)         (per slug)
//!        ^                ^
//!        +---- SessionOrchestrator (on connect)
//! ```
//!
//! # Module Structure
//!
//! - `watch` - per-project file watchers with debouncing
//! - `bus` - slug-keyed client registry and fan-out
//! - `session` - wires a new client to its project
//! - `ws` - tungstenite adapter for bus clients

pub mod bus;
pub mod session;
pub mod watch;
pub mod ws;
