//! Broadcast Bus: per-project fan-out to connected clients.
//!
//! ```text
//! Watcher --publish(slug)--> BroadcastBus --send--> clients of slug
//!                                 ^                     |
//!                                 +----poll_clients-----+
//! ```
//!
//! Connections sit behind [`ClientConn`] so the bus never touches sockets
//! directly. Within one slug, messages go out in publish order.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::reload::message::ServerMessage;

/// Unique id assigned on subscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(u64);

/// Result of polling a connection for input.
#[derive(Debug, PartialEq, Eq)]
pub enum Incoming {
    /// A text frame from the client
    Text(String),
    /// Nothing available right now
    Idle,
    /// Peer closed or the connection failed
    Closed,
}

/// A live client connection.
pub trait ClientConn: Send {
    /// Send one text frame.
    fn send_text(&mut self, text: &str) -> std::io::Result<()>;

    /// Non-blocking read of the next frame.
    fn poll(&mut self) -> Incoming;

    /// Close the connection. Errors are ignored.
    fn close(&mut self);
}

struct Client {
    id: ClientId,
    conn: Box<dyn ClientConn>,
    /// Cleared on send failure; skipped until pruned
    open: bool,
}

/// Client registry grouped by project slug.
pub struct BroadcastBus {
    clients: Mutex<FxHashMap<String, Vec<Client>>>,
    next_id: AtomicU64,
}

impl BroadcastBus {
    pub fn new() -> Self {
        Self {
            clients: Mutex::new(FxHashMap::default()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a connection under `slug`.
    pub fn subscribe(&self, slug: &str, conn: Box<dyn ClientConn>) -> ClientId {
        let id = ClientId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut clients = self.clients.lock();
        let group = clients.entry(slug.to_owned()).or_default();
        group.push(Client {
            id,
            conn,
            open: true,
        });
        crate::debug!("ws"; "client {} joined {} (total: {})", id.0, slug, group.len());
        id
    }

    /// Remove a connection. Returns whether it was registered.
    ///
    /// Disconnected clients are normally pruned by [`Self::poll_clients`].
    #[allow(dead_code)]
    pub fn unsubscribe(&self, slug: &str, id: ClientId) -> bool {
        let mut clients = self.clients.lock();
        let Some(group) = clients.get_mut(slug) else {
            return false;
        };

        let before = group.len();
        group.retain(|c| c.id != id);
        let removed = group.len() != before;
        if group.is_empty() {
            clients.remove(slug);
        }
        removed
    }

    /// Send a message to every open client of `slug`.
    ///
    /// Serializes once. Returns how many clients received it.
    pub fn publish(&self, slug: &str, message: &ServerMessage) -> usize {
        let text = message.to_json();
        let mut clients = self.clients.lock();
        let Some(group) = clients.get_mut(slug) else {
            crate::debug!("ws"; "no clients for {}", slug);
            return 0;
        };

        let mut delivered = 0;
        for client in group.iter_mut().filter(|c| c.open) {
            match client.conn.send_text(&text) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    crate::debug!("ws"; "client {} send failed: {}", client.id.0, e);
                    client.open = false;
                }
            }
        }

        crate::debug!("ws"; "sent to {} clients of {}", delivered, slug);
        delivered
    }

    /// Poll every connection once.
    ///
    /// Returns text frames as `(slug, text)` in registry order. Clients that
    /// closed, or that failed a send, are pruned.
    pub fn poll_clients(&self) -> Vec<(String, String)> {
        let mut received = Vec::new();
        let mut clients = self.clients.lock();

        for (slug, group) in clients.iter_mut() {
            group.retain_mut(|client| {
                if !client.open {
                    return false;
                }
                loop {
                    match client.conn.poll() {
                        Incoming::Text(text) => received.push((slug.clone(), text)),
                        Incoming::Idle => return true,
                        Incoming::Closed => {
                            crate::debug!("ws"; "client {} left {}", client.id.0, slug);
                            return false;
                        }
                    }
                }
            });
        }
        clients.retain(|_, group| !group.is_empty());

        received
    }

    /// Number of registered clients for `slug`, open or not.
    #[cfg(test)]
    pub fn client_count(&self, slug: &str) -> usize {
        self.clients.lock().get(slug).map_or(0, Vec::len)
    }

    /// Close and drop every connection.
    pub fn close_all(&self) {
        let mut clients = self.clients.lock();
        for (_, mut group) in clients.drain() {
            for client in &mut group {
                client.conn.close();
            }
        }
    }
}

impl Default for BroadcastBus {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
