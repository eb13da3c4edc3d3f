//! Development server with live updates.
//!
//! ```text
//! HTTP (tiny_http + rayon)   /api/...  → project info, files
//!                            else      → static dir
//! WebSocket (tungstenite)    ?project= → SessionOrchestrator
//! tokio runtime              per-project watchers → BroadcastBus
//! ```

mod api;
mod lifecycle;
mod path;
mod response;
#[cfg(test)]
mod tests;

use crate::{
    actor::{bus::BroadcastBus, session::SessionOrchestrator, watch::WatcherManager},
    config::ServeConfig,
    debug, log,
    project::{ConfigStore, ProjectResolver},
    reload::server::start_ws_server,
    utils::date::DateTimeUtc,
};
use anyhow::{Context, Result};
use crossbeam::channel;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tiny_http::{Request, Server};

/// Number of threads answering HTTP requests.
const REQUEST_THREADS: usize = 4;

/// Shared state of the request handlers.
pub struct ServeState {
    store: Arc<ConfigStore>,
    resolver: ProjectResolver,
    static_dir: Option<PathBuf>,
    /// Actual WebSocket port, reported to the preview page
    ws_port: u16,
}

/// Bound server ready to accept requests
pub struct BoundServer {
    server: Arc<Server>,
    addr: SocketAddr,
    shutdown_rx: channel::Receiver<()>,
}

/// Bind the HTTP server without starting the request loop
pub fn bind_server(config: &ServeConfig) -> Result<BoundServer> {
    let (server, addr) = lifecycle::bind_with_retry(config.interface, config.port)?;
    let server = Arc::new(server);

    let (shutdown_tx, shutdown_rx) = channel::unbounded::<()>();
    lifecycle::register_server_for_shutdown(Arc::clone(&server), shutdown_tx);

    log!("serve"; "http://{}", addr);

    Ok(BoundServer {
        server,
        addr,
        shutdown_rx,
    })
}

impl BoundServer {
    /// Start watchers, the WebSocket server and the request loop (blocking).
    pub fn run(self, config: &ServeConfig) -> Result<()> {
        let resolver = ProjectResolver::from_cwd(config.project_path.clone())
            .context("failed to read current directory")?;
        let store = Arc::new(ConfigStore::new());
        prepare_project(&store, &resolver);

        let runtime = lifecycle::build_runtime()?;

        let bus = Arc::new(BroadcastBus::new());
        let watchers = Arc::new(WatcherManager::new(
            Arc::clone(&store),
            Arc::clone(&bus),
            runtime.handle().clone(),
        ));
        let session = Arc::new(SessionOrchestrator::new(
            resolver.clone(),
            watchers,
            bus,
            self.addr.port(),
        ));

        let ws_port = start_ws_server(config.ws_port, Arc::clone(&session))
            .context("failed to start WebSocket server")?;
        debug!("reload"; "ws://localhost:{}", ws_port);

        let listener = lifecycle::spawn_shutdown_listener(session, self.shutdown_rx)?;

        let state = Arc::new(ServeState {
            store,
            resolver,
            static_dir: config.static_dir.clone(),
            ws_port,
        });
        run_request_loop(&self.server, &state)?;

        lifecycle::wait_for_shutdown(listener);
        runtime.shutdown_timeout(lifecycle::SHUTDOWN_GRACE);
        Ok(())
    }
}

/// Bring the sprite map in line with the sprites directory before serving.
fn prepare_project(store: &ConfigStore, resolver: &ProjectResolver) {
    let Some(root) = resolver.resolve() else {
        match resolver.explicit() {
            Some(path) => log!("serve"; "no project.toml in {}", path.display()),
            None => log!("serve"; "no project.toml found, waiting for one to appear"),
        }
        return;
    };

    match store.read(&root) {
        Ok(descriptor) => {
            let edited = DateTimeUtc::parse(&descriptor.meta.last_modified)
                .map_or_else(|| "never".to_owned(), DateTimeUtc::to_display);
            log!(
                "serve";
                "project {} ({}) at {}, last modified {}",
                descriptor.meta.name,
                descriptor.meta.slug,
                root.display(),
                edited
            );
        }
        Err(e) => log!("serve"; "{}: {}", root.display(), e),
    }

    match store.sync_sprites(&root) {
        Ok(Some(sprites)) => debug!("serve"; "{} sprites", sprites.records.len()),
        Ok(None) => {}
        Err(e) => log!("serve"; "sprite sync failed: {}", e),
    }
}

fn run_request_loop(server: &Server, state: &Arc<ServeState>) -> Result<()> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(REQUEST_THREADS)
        .thread_name(|i| format!("http-{i}"))
        .build()?;

    for request in server.incoming_requests() {
        let state = Arc::clone(state);
        pool.spawn(move || {
            if let Err(e) = handle_request(request, &state) {
                log!("serve"; "request error: {e}");
            }
        });
    }
    Ok(())
}

/// Handle a single HTTP request
fn handle_request(request: Request, state: &ServeState) -> Result<()> {
    dispatch(request, state, crate::core::is_shutdown())
}

fn dispatch(request: Request, state: &ServeState, shutting_down: bool) -> Result<()> {
    if shutting_down {
        return response::respond_unavailable(request);
    }

    debug!("serve"; "{} {}", request.method(), request.url());

    if let Some(route) = api::ApiRoute::parse(request.url()) {
        return api::handle(request, route, state);
    }

    if let Some(dir) = &state.static_dir {
        if let Some(path) = path::resolve_static(request.url(), dir) {
            return response::respond_file(request, &path);
        }
    }

    response::respond_not_found(request)
}
