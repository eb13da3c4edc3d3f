//! Path normalization and sandboxing.
//!
//! - `normalize_path` - file system paths (canonicalize + fallback)
//! - `sandboxed_join` - join a user-supplied path under a root, lexically,
//!   rejecting anything that would escape it

use std::path::{Component, Path, PathBuf};

/// Normalize a file system path to absolute form.
///
/// Tries `canonicalize()` first (resolves symlinks, `.`, `..`).
/// Falls back to:
/// - Return as-is if already absolute
/// - Join with current directory if relative
#[inline]
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        }
    })
}

/// Join `user_path` under `root` without touching the filesystem.
///
/// Returns `None` for absolute paths, drive prefixes, or any `..` that
/// climbs above `root`. `a/../b` stays inside and is accepted.
pub fn sandboxed_join(root: &Path, user_path: &str) -> Option<PathBuf> {
    let user_path = user_path.replace('\\', "/");
    let mut parts: Vec<&str> = Vec::new();

    for component in Path::new(&user_path).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    let mut joined = root.to_path_buf();
    joined.extend(parts);
    Some(joined)
}

/// Whether any component of `relative` is a dotfile or dot-directory.
pub fn is_hidden(relative: &Path) -> bool {
    relative.components().any(|c| match c {
        Component::Normal(part) => part.to_string_lossy().starts_with('.'),
        _ => false,
    })
}
