use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

use super::types::ChangeKind;
use crate::utils::path::normalize_path;

pub(super) const DEBOUNCE_MS: u64 = 100;

/// Pure debouncer: only handles timing and event deduplication.
///
/// Changes flush in the order their paths were first observed.
pub(super) struct Debouncer {
    /// First-observation order (may hold paths discarded since)
    pub(super) order: Vec<PathBuf>,
    /// Path → ChangeKind, the current collapsed state per path
    pub(super) changes: FxHashMap<PathBuf, ChangeKind>,
    pub(super) last_event: Option<Instant>,
}

impl Debouncer {
    pub(super) fn new() -> Self {
        Self {
            order: Vec::new(),
            changes: FxHashMap::default(),
            last_event: None,
        }
    }

    /// Add a notify event, applying dedup rules:
    /// - Remove + Create/Modify → Create/Modify (file was restored)
    /// - Modify + Remove → Remove (file was deleted)
    /// - Create + Remove → nothing (file came and went)
    /// - Same type events: first event wins
    pub(super) fn add_event(&mut self, event: &notify::Event) {
        use notify::EventKind;

        let kind = match event.kind {
            EventKind::Create(_) => ChangeKind::Created,
            EventKind::Remove(_) => ChangeKind::Removed,
            EventKind::Modify(modify) => {
                // Ignore metadata-only changes (mtime/atime/chmod noise)
                if matches!(modify, notify::event::ModifyKind::Metadata(_)) {
                    return;
                }
                ChangeKind::Modified
            }
            _ => return,
        };

        for path in &event.paths {
            if is_temp_file(path) {
                continue;
            }
            self.record(normalize_path(path), kind);
        }
    }

    fn record(&mut self, path: PathBuf, kind: ChangeKind) {
        self.last_event = Some(Instant::now());

        let Some(&existing) = self.changes.get(&path) else {
            crate::debug!("watch"; "event {}: {}", kind.label(), path.display());
            if !self.order.contains(&path) {
                self.order.push(path.clone());
            }
            self.changes.insert(path, kind);
            return;
        };

        match (existing, kind) {
            (ChangeKind::Removed, ChangeKind::Created | ChangeKind::Modified) => {
                crate::debug!("watch"; "restore {}->{}: {}", existing.label(), kind.label(), path.display());
                self.changes.insert(path, kind);
            }
            (ChangeKind::Modified, ChangeKind::Removed) => {
                crate::debug!("watch"; "upgrade modified->removed: {}", path.display());
                self.changes.insert(path, ChangeKind::Removed);
            }
            (ChangeKind::Created, ChangeKind::Removed) => {
                crate::debug!("watch"; "discard created+removed: {}", path.display());
                self.changes.remove(&path);
            }
            _ => {}
        }
    }

    /// Take collapsed changes once the quiet window has elapsed.
    pub(super) fn take_if_ready(&mut self) -> Option<Vec<(PathBuf, ChangeKind)>> {
        if !self.is_ready() {
            return None;
        }

        self.last_event = None;
        let mut changes = std::mem::take(&mut self.changes);
        let ordered: Vec<_> = std::mem::take(&mut self.order)
            .into_iter()
            .filter_map(|path| {
                let kind = changes.remove(&path)?;
                Some((path, kind))
            })
            .collect();

        (!ordered.is_empty()).then_some(ordered)
    }

    pub(super) fn is_ready(&self) -> bool {
        let Some(last_event) = self.last_event else {
            return false;
        };
        last_event.elapsed() >= Duration::from_millis(DEBOUNCE_MS)
    }

    /// Precise sleep duration until next possible ready time.
    pub(super) fn sleep_duration(&self) -> Duration {
        let Some(last_event) = self.last_event else {
            return Duration::from_secs(86400);
        };

        Duration::from_millis(DEBOUNCE_MS)
            .saturating_sub(last_event.elapsed())
            .max(Duration::from_millis(1))
    }
}

/// Check if path is a temp/backup file (editor artifacts).
pub(super) fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}
