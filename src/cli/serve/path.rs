//! URL to static file resolution.

use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;

use crate::utils::path::sandboxed_join;

/// Page served at `/`.
const INDEX_PAGE: &str = "index.html";
/// Preview page served for `/{slug}`.
const PREVIEW_PAGE: &str = "microrunner.html";

/// Resolve a URL against the static directory.
///
/// `/` maps to the index page and a bare `/{slug}` with no matching file
/// maps to the preview page. Paths escaping `static_dir` resolve to nothing.
pub fn resolve_static(url: &str, static_dir: &Path) -> Option<PathBuf> {
    let clean = normalize_url(url);

    if clean.is_empty() {
        return existing(static_dir.join(INDEX_PAGE));
    }

    let local = sandboxed_join(static_dir, &clean)?;
    if local.is_file() {
        return Some(local);
    }
    if local.is_dir() {
        if let Some(index) = existing(local.join(INDEX_PAGE)) {
            return Some(index);
        }
    }

    if is_slug(&clean) {
        return existing(static_dir.join(PREVIEW_PAGE));
    }
    None
}

/// Decode, strip query string and fragment, trim slashes.
fn normalize_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let decoded = percent_decode_str(path).decode_utf8_lossy();
    decoded.trim_matches('/').to_string()
}

/// A single path segment without an extension, like `game1`.
fn is_slug(clean: &str) -> bool {
    !clean.contains('/') && !clean.contains('.') && clean != "favicon.ico"
}

fn existing(path: PathBuf) -> Option<PathBuf> {
    path.is_file().then_some(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn static_dir() -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(INDEX_PAGE), "index").unwrap();
        fs::write(temp.path().join(PREVIEW_PAGE), "preview").unwrap();
        fs::create_dir_all(temp.path().join("js")).unwrap();
        fs::write(temp.path().join("js/runtime.js"), "js").unwrap();
        temp
    }

    #[test]
    fn test_root_serves_index() {
        let temp = static_dir();
        assert_eq!(
            resolve_static("/", temp.path()),
            Some(temp.path().join(INDEX_PAGE))
        );
        assert_eq!(
            resolve_static("/?x=1", temp.path()),
            Some(temp.path().join(INDEX_PAGE))
        );
    }

    #[test]
    fn test_slug_serves_preview_page() {
        let temp = static_dir();
        assert_eq!(
            resolve_static("/game1", temp.path()),
            Some(temp.path().join(PREVIEW_PAGE))
        );
        assert_eq!(resolve_static("/game1/extra", temp.path()), None);
        assert_eq!(resolve_static("/missing.png", temp.path()), None);
    }

    #[test]
    fn test_files_and_traversal() {
        let temp = static_dir();
        assert_eq!(
            resolve_static("/js/runtime.js", temp.path()),
            Some(temp.path().join("js/runtime.js"))
        );
        assert_eq!(resolve_static("/../secret", temp.path()), None);
        assert_eq!(resolve_static("/%2e%2e/secret", temp.path()), None);
    }
}
