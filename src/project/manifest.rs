//! Manifest Builder: a versioned listing of every project file by category.

use std::path::Path;

use serde::Serialize;

use super::category::{Category, logical_name, slash_path};
use super::descriptor::{Direction, ProjectDescriptor};
use super::frames::infer_frames;
use super::store::ConfigStore;
use crate::utils::date::now_millis;

/// Playback rate reported for every sprite.
pub const SPRITE_FPS: u32 = 5;

/// One file in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestEntry {
    /// Category-relative path, forward slashes.
    pub file: String,
    /// Flattened identifier (`chars/hero.png` -> `chars-hero`).
    pub name: String,
    /// Scan time in milliseconds, for cache busting.
    pub version: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<SpriteMeta>,
}

/// Animation metadata attached to sprite entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SpriteMeta {
    pub frames: u32,
    pub fps: u32,
}

impl Default for SpriteMeta {
    fn default() -> Self {
        Self {
            frames: 1,
            fps: SPRITE_FPS,
        }
    }
}

/// All project files grouped by category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Manifest {
    pub sources: Vec<ManifestEntry>,
    pub sprites: Vec<ManifestEntry>,
    pub maps: Vec<ManifestEntry>,
    pub sounds: Vec<ManifestEntry>,
    pub music: Vec<ManifestEntry>,
    pub assets: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn entries(&self, category: Category) -> &[ManifestEntry] {
        match category {
            Category::Sources => &self.sources,
            Category::Sprites => &self.sprites,
            Category::Maps => &self.maps,
            Category::Sounds => &self.sounds,
            Category::Music => &self.music,
            Category::Assets => &self.assets,
        }
    }

    fn entries_mut(&mut self, category: Category) -> &mut Vec<ManifestEntry> {
        match category {
            Category::Sources => &mut self.sources,
            Category::Sprites => &mut self.sprites,
            Category::Maps => &mut self.maps,
            Category::Sounds => &mut self.sounds,
            Category::Music => &mut self.music,
            Category::Assets => &mut self.assets,
        }
    }
}

/// Scan every category directory under `root`.
///
/// Sprite frame counts come from the descriptor when recorded, otherwise
/// from the image header.
pub fn build_manifest(store: &ConfigStore, root: &Path) -> Manifest {
    let version = now_millis();
    let direction = store
        .cached(root)
        .map(|d| d.sprites.direction)
        .unwrap_or_default();

    let mut manifest = Manifest::default();
    for category in Category::ALL {
        let entries = category
            .scan(root)
            .into_iter()
            .map(|rel| {
                let file = slash_path(&rel);
                let properties = (category == Category::Sprites)
                    .then(|| sprite_meta(store, root, &file, direction));
                ManifestEntry {
                    name: logical_name(&rel),
                    file,
                    version,
                    properties,
                }
            })
            .collect();
        *manifest.entries_mut(category) = entries;
    }

    if crate::logger::is_verbose() {
        let counts: Vec<_> = Category::ALL
            .iter()
            .map(|&c| format!("{} {}", manifest.entries(c).len(), c.dir_name()))
            .collect();
        crate::debug!("manifest"; "{}", counts.join(", "));
    }

    manifest
}

fn sprite_meta(store: &ConfigStore, root: &Path, file: &str, direction: Direction) -> SpriteMeta {
    let frames = match store.cached_sprite_properties(file, root) {
        Some(props) => props.frames,
        None => {
            let path = root.join(Category::Sprites.dir_name()).join(file);
            infer_frames(&path, direction)
        }
    };

    SpriteMeta {
        frames,
        ..SpriteMeta::default()
    }
}

/// Body of `GET /api/project/{slug}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInfo {
    pub name: String,
    pub slug: String,
    pub orientation: String,
    pub aspect: String,
    pub graphics: String,
    pub sprite_direction: Direction,
    /// Port of the live-update socket.
    pub ws_port: u16,
    pub files: Manifest,
}

impl ProjectInfo {
    pub fn new(descriptor: &ProjectDescriptor, files: Manifest, ws_port: u16) -> Self {
        Self {
            name: descriptor.meta.name.clone(),
            slug: descriptor.meta.slug.clone(),
            orientation: descriptor.settings.orientation.clone(),
            aspect: descriptor.settings.aspect.clone(),
            graphics: descriptor.settings.graphics.clone(),
            sprite_direction: descriptor.sprites.direction,
            ws_port,
            files,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
