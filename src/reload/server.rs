//! WebSocket server for live updates.
//!
//! Two background threads:
//! - acceptor: handshakes new clients and hands them to the session
//! - reader: polls every client for messages (non-blocking, 100ms tick)

use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;

use crate::actor::session::SessionOrchestrator;
use crate::actor::ws;

/// Maximum port retry attempts
const MAX_PORT_RETRIES: u16 = 10;

/// Poll interval of both background threads
const TICK: Duration = Duration::from_millis(100);

/// Bind the WebSocket port and start serving clients.
///
/// Returns the port actually bound.
pub fn start_ws_server(base_port: u16, session: Arc<SessionOrchestrator>) -> Result<u16> {
    let (listener, actual_port) = try_bind_port(base_port, MAX_PORT_RETRIES)?;
    listener.set_nonblocking(true)?;

    let acceptor_session = Arc::clone(&session);
    thread::Builder::new()
        .name("ws-accept".into())
        .spawn(move || accept_loop(&listener, &acceptor_session))?;

    thread::Builder::new()
        .name("ws-read".into())
        .spawn(move || reader_loop(&session))?;

    Ok(actual_port)
}

fn accept_loop(listener: &TcpListener, session: &SessionOrchestrator) {
    while !crate::core::is_shutdown() {
        match listener.accept() {
            Ok((stream, addr)) => {
                crate::debug!("reload"; "client connected: {}", addr);
                handle_connection(stream, session);
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(TICK);
            }
            Err(e) => {
                crate::log!("reload"; "accept error: {}", e);
                thread::sleep(TICK);
            }
        }
    }
}

fn handle_connection(stream: TcpStream, session: &SessionOrchestrator) {
    match ws::accept(stream) {
        Ok((slug, conn)) => {
            session.connect(slug.as_deref(), Box::new(conn));
        }
        Err(e) => crate::log!("reload"; "{}", e),
    }
}

fn reader_loop(session: &SessionOrchestrator) {
    while !crate::core::is_shutdown() {
        thread::sleep(TICK);
        session.poll();
    }
}

/// Try binding to port, retry with incremented port if in use
fn try_bind_port(base_port: u16, max_retries: u16) -> Result<(TcpListener, u16)> {
    let mut last_error = None;

    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port);
        match TcpListener::bind(addr) {
            Ok(listener) => {
                let actual_port = listener.local_addr()?.port();
                if offset > 0 {
                    crate::log!("reload"; "port {} in use, using {} instead", base_port, actual_port);
                }
                return Ok((listener, actual_port));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(anyhow::anyhow!(
        "Failed to bind WebSocket server after {} attempts: {}",
        max_retries,
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::bus::BroadcastBus;
    use crate::actor::watch::WatcherManager;
    use crate::project::{ConfigStore, ProjectResolver};
    use crate::reload::message::ServerMessage;
    use tempfile::TempDir;
    use tungstenite::Message;

    fn session(runtime: &tokio::runtime::Runtime, temp: &TempDir) -> Arc<SessionOrchestrator> {
        let store = Arc::new(ConfigStore::new());
        let bus = Arc::new(BroadcastBus::new());
        let watchers = Arc::new(WatcherManager::new(
            store,
            Arc::clone(&bus),
            runtime.handle().clone(),
        ));
        let resolver = ProjectResolver::new(None, temp.path().to_path_buf());
        Arc::new(SessionOrchestrator::new(resolver, watchers, bus, 3000))
    }

    fn wait_until(mut cond: impl FnMut() -> bool) {
        for _ in 0..100 {
            if cond() {
                return;
            }
            thread::sleep(Duration::from_millis(50));
        }
        panic!("condition not reached");
    }

    #[test]
    fn test_try_bind_port_skips_busy_port() {
        let (busy, port) = try_bind_port(0, 1).unwrap();
        let (_next, next_port) = try_bind_port(port, 3).unwrap();
        assert_ne!(next_port, port);
        drop(busy);
    }

    #[test]
    fn test_client_receives_messages_for_its_project() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let temp = TempDir::new().unwrap();
        let session = session(&runtime, &temp);
        let port = start_ws_server(0, Arc::clone(&session)).unwrap();

        let url = format!("ws://127.0.0.1:{port}/?project=game1");
        let (mut client, _) = tungstenite::connect(url).unwrap();

        wait_until(|| session.bus().client_count("game1") == 1);
        assert!(session.has_started());

        let sent = session
            .bus()
            .publish("game1", &ServerMessage::update("main", "print(1)", 9));
        assert_eq!(sent, 1);

        let frame = client.read().unwrap();
        let Message::Text(text) = frame else {
            panic!("expected text frame, got {frame:?}");
        };
        let value: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
        assert_eq!(value["type"], "update");
        assert_eq!(value["code"], "print(1)");

        // Closing is noticed by the reader thread
        client.close(None).unwrap();
        wait_until(|| session.bus().client_count("game1") == 0);
    }
}
