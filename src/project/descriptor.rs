//! `project.toml` descriptor types.
//!
//! # Example
//!
//! ```toml
//! microrunnerVersion = "0.1.0"
//!
//! [meta]
//! name = "My Game"
//! slug = "my-game"
//! created = "2026-01-01T10:00:00Z"
//! lastModified = "2026-01-02T10:00:00Z"
//!
//! [settings]
//! orientation = "any"
//! aspect = "free"
//! graphics = "m1"
//! language = "microscript_v2"
//!
//! [sprites]
//! direction = "vertical"
//!
//! [sprites."hero.png"]
//! frames = 4
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Descriptor file name, looked up at the project root.
pub const DESCRIPTOR_FILE: &str = "project.toml";

/// Root structure of `project.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDescriptor {
    /// Tool version that created the project.
    #[serde(
        rename = "microrunnerVersion",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub microrunner_version: Option<String>,

    pub meta: MetaSection,

    #[serde(default)]
    pub settings: SettingsSection,

    #[serde(default)]
    pub sprites: SpritesSection,
}

/// `[meta]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaSection {
    pub name: String,
    /// URL-safe project identifier.
    pub slug: String,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub last_modified: String,
}

/// `[settings]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsSection {
    pub orientation: String,
    pub aspect: String,
    pub graphics: String,
    /// Script-language version.
    pub language: String,
}

impl Default for SettingsSection {
    fn default() -> Self {
        Self {
            orientation: "any".into(),
            aspect: "free".into(),
            graphics: "m1".into(),
            language: "microscript_v2".into(),
        }
    }
}

/// `[sprites]` section: scan direction plus one record per sprite file.
///
/// Records sit next to `direction` in the same table, keyed by the
/// sprite path relative to `sprites/` (e.g. `"chars/hero.png"`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpritesSection {
    #[serde(default)]
    pub direction: Direction,

    #[serde(flatten)]
    pub records: BTreeMap<String, SpriteRecord>,
}

impl SpritesSection {
    /// Look up a record by relative path, falling back to the base filename.
    pub fn lookup(&self, id: &str) -> Option<&SpriteRecord> {
        let id = id.replace('\\', "/");
        self.records.get(&id).or_else(|| {
            let base = id.rsplit('/').next()?;
            self.records.get(base)
        })
    }
}

/// Per-sprite record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpriteRecord {
    pub frames: u32,
}

/// Axis along which sprite-sheet frames are stacked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Vertical,
    Horizontal,
}

// ============================================================================
// Tests
// ============================================================================
