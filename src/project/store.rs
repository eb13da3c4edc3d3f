//! Config Store: owns `project.toml` on disk plus a short-TTL parse cache.
//!
//! # Concurrency
//!
//! `touch` and `sync_sprites` both read-modify-write the descriptor without
//! a lock. Overlapping calls are last-writer-wins and may lose an update.
//! Expected write concurrency is one human editing one project.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use rustc_hash::FxHashSet;

use super::category::{Category, slash_path};
use super::descriptor::{DESCRIPTOR_FILE, ProjectDescriptor, SpriteRecord, SpritesSection};
use super::error::{ProjectError, Result};
use super::frames::infer_frames;
use crate::utils::date::DateTimeUtc;

/// How long a parsed descriptor stays valid in the cache.
pub const CACHE_TTL: Duration = Duration::from_secs(30);

/// Cached descriptor for one project root.
struct CacheEntry {
    descriptor: Arc<ProjectDescriptor>,
    cached_at: Instant,
}

/// Sprite properties as served to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct SpriteProperties {
    pub frames: u32,
}

/// Reads and writes project descriptors.
///
/// Cheap to share behind an `Arc`; the cache is a concurrent map.
pub struct ConfigStore {
    cache: DashMap<PathBuf, CacheEntry>,
    ttl: Duration,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::with_ttl(CACHE_TTL)
    }

    /// Create a store with a custom cache TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            cache: DashMap::new(),
            ttl,
        }
    }

    /// Path of the descriptor file for a project root.
    pub fn descriptor_path(root: &Path) -> PathBuf {
        root.join(DESCRIPTOR_FILE)
    }

    /// Parse the on-disk descriptor. Not cached.
    pub fn read(&self, root: &Path) -> Result<ProjectDescriptor> {
        let path = Self::descriptor_path(root);
        let content = std::fs::read_to_string(&path).map_err(|e| ProjectError::io(&path, e))?;

        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(&content);
        let descriptor = serde_ignored::deserialize(deserializer, |field: serde_ignored::Path| {
            ignored.push(field.to_string());
        })
        .map_err(|source| ProjectError::Malformed {
            path: path.clone(),
            source,
        })?;

        if !ignored.is_empty() {
            crate::debug!("config"; "unknown fields in {}: {}", path.display(), ignored.join(", "));
        }

        Ok(descriptor)
    }

    /// Serialize and persist the descriptor, then invalidate its cache entry.
    pub fn write(&self, root: &Path, descriptor: &ProjectDescriptor) -> Result<()> {
        let path = Self::descriptor_path(root);
        let content = toml::to_string(descriptor)?;
        let result = std::fs::write(&path, content).map_err(|e| ProjectError::io(&path, e));

        // Invalidate even if the write failed: the file state is unknown.
        self.invalidate(root);
        result
    }

    /// Drop the cached descriptor for a project root.
    pub fn invalidate(&self, root: &Path) {
        self.cache.remove(root);
    }

    /// Set `meta.lastModified` to now.
    ///
    /// Best effort: failures are logged and swallowed.
    pub fn touch(&self, root: &Path) {
        let result = self.read(root).and_then(|mut descriptor| {
            descriptor.meta.last_modified = DateTimeUtc::now().to_rfc3339();
            self.write(root, &descriptor)
        });

        if let Err(e) = result {
            crate::log!("config"; "failed to update lastModified: {}", e);
        }
    }

    /// Sprite properties from the cached descriptor.
    ///
    /// `id` is the sprite path relative to `sprites/`; falls back to its
    /// base filename. Returns `None` when the descriptor is missing or
    /// unreadable, or the sprite has no record.
    pub fn cached_sprite_properties(&self, id: &str, root: &Path) -> Option<SpriteProperties> {
        let descriptor = self.cached(root)?;
        descriptor
            .sprites
            .lookup(id)
            .map(|record| SpriteProperties {
                frames: record.frames,
            })
    }

    /// Cached descriptor, re-read on miss or after TTL expiry.
    pub fn cached(&self, root: &Path) -> Option<Arc<ProjectDescriptor>> {
        if let Some(entry) = self.cache.get(root) {
            if entry.cached_at.elapsed() < self.ttl {
                return Some(Arc::clone(&entry.descriptor));
            }
        }

        match self.read(root) {
            Ok(descriptor) => {
                let descriptor = Arc::new(descriptor);
                self.cache.insert(
                    root.to_path_buf(),
                    CacheEntry {
                        descriptor: Arc::clone(&descriptor),
                        cached_at: Instant::now(),
                    },
                );
                Some(descriptor)
            }
            Err(e) => {
                crate::debug!("config"; "descriptor unavailable: {}", e);
                self.invalidate(root);
                None
            }
        }
    }

    /// Reconcile the sprite map with the files in `sprites/`.
    ///
    /// - new files: frames inferred with the configured direction
    /// - removed files: record deleted
    /// - existing records: kept as-is (manual overrides survive)
    ///
    /// Returns `Ok(None)` when the project has no `sprites/` directory.
    pub fn sync_sprites(&self, root: &Path) -> Result<Option<SpritesSection>> {
        let sprites_dir = root.join(Category::Sprites.dir_name());
        if !sprites_dir.is_dir() {
            return Ok(None);
        }

        let mut descriptor = self.read(root)?;
        let on_disk: Vec<String> = Category::Sprites
            .scan(root)
            .iter()
            .map(|rel| slash_path(rel))
            .collect();
        let direction = descriptor.sprites.direction;
        let records = &mut descriptor.sprites.records;

        let present: FxHashSet<&str> = on_disk.iter().map(String::as_str).collect();
        records.retain(|key, _| present.contains(key.as_str()));

        for rel in &on_disk {
            let seen = records.get(rel).is_some_and(|r| r.frames > 0);
            if !seen {
                let frames = infer_frames(&sprites_dir.join(rel), direction);
                crate::debug!("sprites"; "new sprite {} ({} frames)", rel, frames);
                records.insert(rel.clone(), SpriteRecord { frames });
            }
        }

        descriptor.meta.last_modified = DateTimeUtc::now().to_rfc3339();
        self.write(root, &descriptor)?;

        Ok(Some(descriptor.sprites))
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::descriptor::Direction;
    use crate::project::frames::png_header;
    use std::fs;
    use tempfile::TempDir;

    const DESCRIPTOR: &str = r#"
[meta]
name = "Game"
slug = "game1"
created = "2026-01-01T00:00:00Z"
lastModified = "2026-01-01T00:00:00Z"

[sprites]
direction = "vertical"
"#;

    fn make_project(descriptor: &str) -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(DESCRIPTOR_FILE), descriptor).unwrap();
        temp
    }

    fn add_sprite(root: &Path, rel: &str, width: u32, height: u32) {
        let path = root.join("sprites").join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, png_header(width, height)).unwrap();
    }

    #[test]
    fn test_read_missing_is_not_found() {
        let temp = TempDir::new().unwrap();
        let err = ConfigStore::new().read(temp.path()).unwrap_err();
        assert!(matches!(err, ProjectError::NotFound(_)));
    }

    #[test]
    fn test_read_malformed() {
        let temp = make_project("[meta\nname = ");
        let err = ConfigStore::new().read(temp.path()).unwrap_err();
        assert!(matches!(err, ProjectError::Malformed { .. }));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_read_tolerates_unknown_fields() {
        let temp = make_project(&format!("{DESCRIPTOR}\n[extra]\nkey = 1\n"));
        let descriptor = ConfigStore::new().read(temp.path()).unwrap();
        assert_eq!(descriptor.meta.slug, "game1");
    }

    #[test]
    fn test_write_invalidates_cache() {
        let temp = make_project(DESCRIPTOR);
        let store = ConfigStore::new();
        add_sprite(temp.path(), "hero.png", 16, 16);
        store.sync_sprites(temp.path()).unwrap();

        assert_eq!(
            store.cached_sprite_properties("hero.png", temp.path()),
            Some(SpriteProperties { frames: 1 })
        );

        let mut descriptor = store.read(temp.path()).unwrap();
        descriptor
            .sprites
            .records
            .insert("hero.png".into(), SpriteRecord { frames: 8 });
        store.write(temp.path(), &descriptor).unwrap();

        assert_eq!(
            store.cached_sprite_properties("hero.png", temp.path()),
            Some(SpriteProperties { frames: 8 })
        );
    }

    #[test]
    fn test_cache_serves_without_reread_within_ttl() {
        let temp = make_project(&format!("{DESCRIPTOR}\n[sprites.\"hero.png\"]\nframes = 3\n"));
        let store = ConfigStore::new();

        let first = store.cached_sprite_properties("hero.png", temp.path());
        assert_eq!(first, Some(SpriteProperties { frames: 3 }));

        // Change the file behind the store's back: cache must not notice
        fs::write(
            temp.path().join(DESCRIPTOR_FILE),
            format!("{DESCRIPTOR}\n[sprites.\"hero.png\"]\nframes = 9\n"),
        )
        .unwrap();

        let second = store.cached_sprite_properties("hero.png", temp.path());
        assert_eq!(second, first);
    }

    #[test]
    fn test_cache_rereads_after_ttl() {
        let temp = make_project(&format!("{DESCRIPTOR}\n[sprites.\"hero.png\"]\nframes = 3\n"));
        let store = ConfigStore::with_ttl(Duration::from_millis(20));

        assert_eq!(
            store.cached_sprite_properties("hero.png", temp.path()),
            Some(SpriteProperties { frames: 3 })
        );

        fs::write(
            temp.path().join(DESCRIPTOR_FILE),
            format!("{DESCRIPTOR}\n[sprites.\"hero.png\"]\nframes = 9\n"),
        )
        .unwrap();
        std::thread::sleep(Duration::from_millis(40));

        assert_eq!(
            store.cached_sprite_properties("hero.png", temp.path()),
            Some(SpriteProperties { frames: 9 })
        );
    }

    #[test]
    fn test_cached_properties_fall_back_to_basename() {
        let temp = make_project(&format!("{DESCRIPTOR}\n[sprites.\"hero.png\"]\nframes = 5\n"));
        let store = ConfigStore::new();
        assert_eq!(
            store.cached_sprite_properties("chars/hero.png", temp.path()),
            Some(SpriteProperties { frames: 5 })
        );
        assert_eq!(store.cached_sprite_properties("ghost.png", temp.path()), None);
    }

    #[test]
    fn test_cached_properties_without_descriptor() {
        let temp = TempDir::new().unwrap();
        assert_eq!(
            ConfigStore::new().cached_sprite_properties("hero.png", temp.path()),
            None
        );
    }

    #[test]
    fn test_sync_matches_disk_and_keeps_overrides() {
        let descriptor = format!(
            "{DESCRIPTOR}\n[sprites.\"hero.png\"]\nframes = 7\n\n[sprites.\"gone.png\"]\nframes = 2\n"
        );
        let temp = make_project(&descriptor);
        let root = temp.path();

        // hero would infer 4, but the recorded 7 is a manual override
        add_sprite(root, "hero.png", 64, 256);
        add_sprite(root, "chars/enemy.png", 32, 96);
        add_sprite(root, ".hidden.png", 32, 32);
        fs::write(root.join("sprites/notes.txt"), "not a sprite").unwrap();

        let store = ConfigStore::new();
        let sprites = store.sync_sprites(root).unwrap().unwrap();

        let keys: Vec<_> = sprites.records.keys().cloned().collect();
        assert_eq!(keys, vec!["chars/enemy.png", "hero.png"]);
        assert_eq!(sprites.records["hero.png"].frames, 7);
        assert_eq!(sprites.records["chars/enemy.png"].frames, 3);

        // Persisted, and lastModified moved forward
        let on_disk = store.read(root).unwrap();
        assert_eq!(on_disk.sprites, sprites);
        assert_ne!(on_disk.meta.last_modified, "2026-01-01T00:00:00Z");
    }

    #[test]
    fn test_sync_uses_configured_direction() {
        let temp = make_project(&DESCRIPTOR.replace("vertical", "horizontal"));
        add_sprite(temp.path(), "run.png", 128, 32);

        let sprites = ConfigStore::new().sync_sprites(temp.path()).unwrap().unwrap();
        assert_eq!(sprites.direction, Direction::Horizontal);
        assert_eq!(sprites.records["run.png"].frames, 4);
    }

    #[test]
    fn test_sync_reinfers_zero_frames() {
        let temp = make_project(&format!("{DESCRIPTOR}\n[sprites.\"hero.png\"]\nframes = 0\n"));
        add_sprite(temp.path(), "hero.png", 64, 256);

        let sprites = ConfigStore::new().sync_sprites(temp.path()).unwrap().unwrap();
        assert_eq!(sprites.records["hero.png"].frames, 4);
    }

    #[test]
    fn test_sync_without_sprites_dir_is_noop() {
        let temp = make_project(DESCRIPTOR);
        let before = fs::read_to_string(temp.path().join(DESCRIPTOR_FILE)).unwrap();

        assert!(ConfigStore::new().sync_sprites(temp.path()).unwrap().is_none());

        let after = fs::read_to_string(temp.path().join(DESCRIPTOR_FILE)).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_sequential_touches_keep_latest() {
        let temp = make_project(DESCRIPTOR);
        let store = ConfigStore::new();

        store.touch(temp.path());
        let first = store.read(temp.path()).unwrap().meta.last_modified;
        std::thread::sleep(Duration::from_millis(1100));
        store.touch(temp.path());
        let second = store.read(temp.path()).unwrap().meta.last_modified;

        let first = DateTimeUtc::parse(&first).unwrap();
        let second = DateTimeUtc::parse(&second).unwrap();
        assert!(second > first);
    }

    #[test]
    fn test_touch_failure_is_swallowed() {
        let temp = TempDir::new().unwrap();
        // No descriptor: must log and return, not panic
        ConfigStore::new().touch(temp.path());
        assert!(!temp.path().join(DESCRIPTOR_FILE).exists());
    }
}
