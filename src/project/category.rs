//! Asset categories: directory layout and accepted extensions.

use std::path::{Path, PathBuf};

use jwalk::WalkDir;
use serde::Serialize;

use crate::utils::path::is_hidden;

/// One of the six asset directories of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Sources,
    Sprites,
    Maps,
    Sounds,
    Music,
    Assets,
}

impl Category {
    pub const ALL: [Self; 6] = [
        Self::Sources,
        Self::Sprites,
        Self::Maps,
        Self::Sounds,
        Self::Music,
        Self::Assets,
    ];

    /// Directory name under the project root.
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Sources => "ms",
            Self::Sprites => "sprites",
            Self::Maps => "maps",
            Self::Sounds => "sounds",
            Self::Music => "music",
            Self::Assets => "assets",
        }
    }

    /// Accepted file extensions (lowercase, without dot).
    pub const fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Sources => &["ms"],
            Self::Sprites => &["png", "jpg", "jpeg"],
            Self::Maps => &["json", "map"],
            Self::Sounds => &["wav", "ogg", "flac"],
            Self::Music => &["mp3", "ogg", "flac"],
            Self::Assets => &["glb", "obj", "jpg", "ttf", "wasm", "txt", "csv", "json", "md"],
        }
    }

    /// Route segment used by the file retrieval API (`/api/{segment}/...`).
    pub const fn route_segment(self) -> &'static str {
        match self {
            Self::Sources => "file",
            Self::Sprites => "sprite",
            Self::Maps => "map",
            Self::Sounds => "sound",
            Self::Music => "music",
            Self::Assets => "assets",
        }
    }

    pub fn from_route_segment(segment: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.route_segment() == segment)
    }

    /// Whether retrieval may retry other extensions when the exact file is missing.
    pub const fn has_extension_fallback(self) -> bool {
        matches!(self, Self::Sounds | Self::Music)
    }

    /// Check a path's extension against this category (case-insensitive).
    pub fn accepts(self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.has_extension(ext))
    }

    pub fn has_extension(self, ext: &str) -> bool {
        self.extensions()
            .iter()
            .any(|known| known.eq_ignore_ascii_case(ext))
    }

    /// List this category's files under a project root.
    ///
    /// Paths are relative to the category directory and sorted. Dotfiles,
    /// dot-directories and unaccepted extensions are skipped. A missing
    /// directory yields an empty list.
    pub fn scan(self, root: &Path) -> Vec<PathBuf> {
        let dir = root.join(self.dir_name());
        if !dir.is_dir() {
            return Vec::new();
        }

        let mut files: Vec<_> = WalkDir::new(&dir)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| {
                let rel = e.path().strip_prefix(&dir).ok()?.to_path_buf();
                (!is_hidden(&rel) && self.accepts(&rel)).then_some(rel)
            })
            .collect();
        files.sort();
        files
    }
}

/// Flatten a category-relative path into a logical identifier.
///
/// `chars/hero.png` -> `chars-hero`
pub fn logical_name(relative: &Path) -> String {
    let stem = relative.with_extension("");
    stem.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("-")
}

/// Category-relative path with forward slashes.
pub fn slash_path(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
