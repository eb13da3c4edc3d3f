//! Watcher Manager
//!
//! Owns the filesystem watchers of every subscribed project and turns
//! their events into client messages.
//!
//! Architecture:
//! ```text
//! notify → channel → Debouncer (pure timing) → handler → BroadcastBus
//!                                                 |
//!                                                 +→ ConfigStore (touch / sync)
//! ```
//!
//! Per slug and per [`WatchKind`] a watcher is either absent or active.
//! The first `ensure_watching` whose directory exists activates it; it
//! stays active until `shutdown`. Each watcher runs as one task and handles
//! its changes sequentially, so messages publish in observation order.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::bus::BroadcastBus;
use crate::project::category::{logical_name, slash_path};
use crate::project::{ConfigStore, ProjectError};
use crate::reload::message::ServerMessage;
use crate::utils::date::now_millis;
use crate::utils::path::{is_hidden, normalize_path};

// Pure timing and deduplication.
mod debouncer;
// Shared watch types.
mod types;


use debouncer::Debouncer;
pub use types::{ChangeKind, WatchError, WatchKind};

/// A running watcher (dropping the notify handle ends its event stream).
struct ActiveWatcher {
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

/// Registry of active watchers keyed by project slug.
pub struct WatcherManager {
    store: Arc<ConfigStore>,
    bus: Arc<BroadcastBus>,
    runtime: Handle,
    active: Mutex<FxHashMap<(String, WatchKind), ActiveWatcher>>,
}

impl WatcherManager {
    /// Watcher tasks are spawned on `runtime`, so `ensure_watching` may be
    /// called from any thread.
    pub fn new(store: Arc<ConfigStore>, bus: Arc<BroadcastBus>, runtime: Handle) -> Self {
        Self {
            store,
            bus,
            runtime,
            active: Mutex::new(FxHashMap::default()),
        }
    }

    /// Start the source and sprite watchers for `slug` unless already running.
    ///
    /// A missing directory leaves that watcher absent; a later call retries.
    pub fn ensure_watching(&self, slug: &str, root: &Path) -> Result<(), WatchError> {
        let root = normalize_path(root);
        let mut active = self.active.lock();

        for kind in WatchKind::ALL {
            let key = (slug.to_owned(), kind);
            if active.contains_key(&key) {
                continue;
            }

            let dir = root.join(kind.category().dir_name());
            if !dir.is_dir() {
                crate::debug!("watch"; "{} has no {}/, not watching", slug, kind);
                continue;
            }

            let handler = ChangeHandler {
                slug: slug.to_owned(),
                root: root.clone(),
                dir,
                kind,
                store: Arc::clone(&self.store),
                bus: Arc::clone(&self.bus),
            };
            let watcher = self.spawn(handler)?;
            active.insert(key, watcher);
        }

        Ok(())
    }

    /// Whether a watcher of `kind` is active for `slug`.
    #[cfg(test)]
    pub fn is_watching(&self, slug: &str, kind: WatchKind) -> bool {
        self.active.lock().contains_key(&(slug.to_owned(), kind))
    }

    /// Stop every watcher.
    pub fn shutdown(&self) {
        let mut active = self.active.lock();
        for ((slug, kind), watcher) in active.drain() {
            crate::debug!("watch"; "stopping {} watcher for {}", kind, slug);
            watcher.task.abort();
        }
    }

    fn spawn(&self, handler: ChangeHandler) -> Result<ActiveWatcher, WatchError> {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    // Receiver gone means the watcher is shutting down
                    let _ = tx.send(event);
                }
                Err(e) => crate::log!("watch"; "notify error: {}", e),
            }
        })
        .map_err(|source| WatchError::Notify {
            path: handler.dir.clone(),
            source,
        })?;

        watcher
            .watch(&handler.dir, RecursiveMode::Recursive)
            .map_err(|source| WatchError::Notify {
                path: handler.dir.clone(),
                source,
            })?;

        crate::log!("watch"; "watching {}/ for {}", handler.kind, handler.slug);
        let task = self.runtime.spawn(run(handler, rx));

        Ok(ActiveWatcher {
            _watcher: watcher,
            task,
        })
    }
}

impl Drop for WatcherManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Event loop of one watcher.
async fn run(handler: ChangeHandler, mut rx: mpsc::UnboundedReceiver<notify::Event>) {
    let mut debouncer = Debouncer::new();

    loop {
        tokio::select! {
            biased;
            event = rx.recv() => match event {
                Some(event) => debouncer.add_event(&event),
                None => break,
            },
            _ = tokio::time::sleep(debouncer.sleep_duration()) => {
                let Some(changes) = debouncer.take_if_ready() else {
                    continue;
                };
                for (path, kind) in changes {
                    handler.handle(&path, kind).await;
                }
            }
        }
    }
}

/// Turns one debounced change into a published message.
struct ChangeHandler {
    slug: String,
    root: PathBuf,
    /// Watched directory (`root/ms` or `root/sprites`)
    dir: PathBuf,
    kind: WatchKind,
    store: Arc<ConfigStore>,
    bus: Arc<BroadcastBus>,
}

impl ChangeHandler {
    async fn handle(&self, path: &Path, change: ChangeKind) {
        let Ok(rel) = path.strip_prefix(&self.dir) else {
            return;
        };
        if is_hidden(rel) || !self.kind.category().accepts(rel) {
            return;
        }
        let rel = rel.to_path_buf();

        match self.kind {
            WatchKind::Sources => self.source_changed(path, &rel, change).await,
            WatchKind::Sprites => self.sprite_changed(&rel, change).await,
        }
    }

    /// Push the new content, then bump `lastModified` in the background.
    async fn source_changed(&self, path: &Path, rel: &Path, change: ChangeKind) {
        if change == ChangeKind::Removed {
            return;
        }

        let code = match tokio::fs::read_to_string(path).await {
            Ok(code) => code,
            Err(e) => {
                crate::log!("watch"; "failed to read {}: {}", path.display(), e);
                return;
            }
        };

        let message = ServerMessage::update(logical_name(rel), code, now_millis());
        let sent = self.bus.publish(&self.slug, &message);
        crate::debug!("watch"; "{} {} -> {} clients", change.label(), slash_path(rel), sent);

        let store = Arc::clone(&self.store);
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || store.touch(&root));
    }

    /// Re-sync the descriptor, then push the sprite's properties.
    async fn sprite_changed(&self, rel: &Path, change: ChangeKind) {
        let id = slash_path(rel);
        let store = Arc::clone(&self.store);
        let root = self.root.clone();
        let lookup = id.clone();

        let synced = tokio::task::spawn_blocking(move || {
            store.sync_sprites(&root)?;
            Ok::<_, ProjectError>(store.cached_sprite_properties(&lookup, &root))
        })
        .await;

        let properties = match synced {
            Ok(Ok(properties)) => properties,
            Ok(Err(e)) => {
                crate::log!("sprites"; "sync failed for {}: {}", self.slug, e);
                None
            }
            Err(e) => {
                crate::log!("sprites"; "sync task failed: {}", e);
                None
            }
        };

        let message = ServerMessage::sprites(logical_name(rel), now_millis(), properties);
        let sent = self.bus.publish(&self.slug, &message);
        crate::debug!("watch"; "sprite {} {} -> {} clients", change.label(), id, sent);
    }
}
