//! Session Orchestrator: wires an inbound client to its project.
//!
//! ```text
//! connect(slug) → resolve root → ensure_watching → subscribe → banner (once)
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::bus::{BroadcastBus, ClientConn, ClientId};
use super::watch::WatcherManager;
use crate::project::ProjectResolver;
use crate::reload::message::{ClientMessage, display_data};

pub struct SessionOrchestrator {
    resolver: ProjectResolver,
    watchers: Arc<WatcherManager>,
    bus: Arc<BroadcastBus>,
    /// HTTP port shown in the banner
    http_port: u16,
    started: AtomicBool,
}

impl SessionOrchestrator {
    pub fn new(
        resolver: ProjectResolver,
        watchers: Arc<WatcherManager>,
        bus: Arc<BroadcastBus>,
        http_port: u16,
    ) -> Self {
        Self {
            resolver,
            watchers,
            bus,
            http_port,
            started: AtomicBool::new(false),
        }
    }

    /// Register a new client for `slug`.
    ///
    /// A client without a slug is closed and not registered. Watcher
    /// failures are logged; the client still joins the bus.
    pub fn connect(&self, slug: Option<&str>, mut conn: Box<dyn ClientConn>) -> Option<ClientId> {
        let Some(slug) = slug.filter(|s| !s.is_empty()) else {
            crate::debug!("ws"; "client without project, closing");
            conn.close();
            return None;
        };

        match self.resolver.resolve() {
            Some(root) => {
                if let Err(e) = self.watchers.ensure_watching(slug, &root) {
                    crate::log!("watch"; "{}", e);
                }
            }
            None => crate::debug!("ws"; "no project found for {}, not watching", slug),
        }

        let id = self.bus.subscribe(slug, conn);

        if !self.started.swap(true, Ordering::SeqCst) {
            crate::logger::print_session_banner(slug, self.http_port);
        }

        Some(id)
    }

    /// Act on one text frame from a client of `slug`.
    ///
    /// Returns the parsed message; malformed input is ignored.
    pub fn handle_client_message(&self, slug: &str, text: &str) -> Option<ClientMessage> {
        let Some(message) = ClientMessage::parse(text) else {
            crate::debug!("ws"; "ignoring client message: {}", text);
            return None;
        };

        match &message {
            ClientMessage::Log { data } => println!("{}", display_data(data)),
            ClientMessage::Error { data } => eprintln!("{}", display_data(data)),
            ClientMessage::Restart => {
                crate::logger::clear_screen();
                crate::logger::print_session_banner(slug, self.http_port);
            }
        }

        Some(message)
    }

    /// Poll all clients once and dispatch what they sent.
    pub fn poll(&self) -> usize {
        let received = self.bus.poll_clients();
        for (slug, text) in &received {
            self.handle_client_message(slug, text);
        }
        received.len()
    }

    /// Whether the session banner has been printed.
    #[cfg(test)]
    pub fn has_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    #[cfg(test)]
    pub fn bus(&self) -> &Arc<BroadcastBus> {
        &self.bus
    }

    /// Close every client and stop every watcher.
    pub fn shutdown(&self) {
        self.bus.close_all();
        self.watchers.shutdown();
    }
}
