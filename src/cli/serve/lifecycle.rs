//! Server lifecycle management.

use crate::{actor::session::SessionOrchestrator, core::register_server, log};
use anyhow::Result;
use crossbeam::channel::{Receiver, Sender};
use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};
use tiny_http::Server;
use tokio::runtime::Runtime;

/// Maximum number of port binding attempts.
const MAX_PORT_RETRIES: u16 = 10;

/// Upper bound for background work to wind down after Ctrl+C.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Bind to the specified interface and port, with automatic port retry.
pub fn bind_with_retry(interface: IpAddr, base_port: u16) -> Result<(Server, SocketAddr)> {
    let mut last_error = None;

    for offset in 0..MAX_PORT_RETRIES {
        let port = base_port.saturating_add(offset);
        match Server::http(SocketAddr::new(interface, port)) {
            Ok(server) => {
                // Port 0 asks the OS; report what it picked
                let addr = server
                    .server_addr()
                    .to_ip()
                    .unwrap_or_else(|| SocketAddr::new(interface, port));
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, addr.port());
                }
                return Ok((server, addr));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(anyhow::anyhow!(
        "Failed to bind after {} attempts (ports {}-{}): {}",
        MAX_PORT_RETRIES,
        base_port,
        base_port.saturating_add(MAX_PORT_RETRIES - 1),
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

/// Register server for graceful shutdown.
///
/// When Ctrl+C is pressed, the handler set up in `main()` unblocks the
/// server and signals `shutdown_tx`.
pub fn register_server_for_shutdown(server: Arc<Server>, shutdown_tx: Sender<()>) {
    register_server(server, shutdown_tx);
}

/// Runtime for watcher tasks.
pub fn build_runtime() -> Result<Runtime> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("watch")
        .enable_all()
        .build()?;
    Ok(runtime)
}

/// Close clients and stop watchers once shutdown is signalled.
pub fn spawn_shutdown_listener(
    session: Arc<SessionOrchestrator>,
    shutdown_rx: Receiver<()>,
) -> Result<JoinHandle<()>> {
    let handle = thread::Builder::new()
        .name("shutdown".into())
        .spawn(move || {
            // A closed channel also means the server is going away
            let _ = shutdown_rx.recv();
            session.shutdown();
        })?;
    Ok(handle)
}

/// Wait for the shutdown listener to finish (max 2 seconds).
pub fn wait_for_shutdown(handle: JoinHandle<()>) {
    let ticks = SHUTDOWN_GRACE.as_millis() / 50;
    for _ in 0..ticks {
        if handle.is_finished() {
            let _ = handle.join();
            return;
        }
        thread::sleep(Duration::from_millis(50));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_bind_with_retry_moves_past_busy_port() {
        let localhost = IpAddr::V4(Ipv4Addr::LOCALHOST);
        let (_first, addr) = bind_with_retry(localhost, 0).unwrap();
        assert_ne!(addr.port(), 0);

        let (_second, next) = bind_with_retry(localhost, addr.port()).unwrap();
        assert_ne!(next.port(), addr.port());
    }
}
