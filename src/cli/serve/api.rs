//! Project API: `/api/...` routes.
//!
//! ```text
//! /api/project/{slug}             project settings + file manifest
//! /api/project/{slug}/path        project root on disk
//! /api/{segment}/{slug}/{rel}     raw file from a category directory
//! ```

use std::path::{Path, PathBuf};

use anyhow::Result;
use percent_encoding::percent_decode_str;
use serde::Serialize;
use tiny_http::Request;

use super::{ServeState, response};
use crate::project::error::Result as ProjectResult;
use crate::project::{Category, ConfigStore, ProjectError, ProjectInfo, build_manifest};
use crate::utils::path::sandboxed_join;

const API_PREFIX: &str = "/api/";

/// A recognized API request.
#[derive(Debug, PartialEq, Eq)]
pub enum ApiRoute {
    Project { slug: String },
    ProjectPath { slug: String },
    File {
        category: Category,
        slug: String,
        /// Category-relative path, percent-decoded
        rel: String,
    },
}

impl ApiRoute {
    /// Parse a request URL. Returns `None` for anything outside the API.
    pub fn parse(url: &str) -> Option<Self> {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let rest = path.strip_prefix(API_PREFIX)?;
        let (segment, rest) = rest.split_once('/')?;

        if segment == "project" {
            let rest = rest.trim_end_matches('/');
            return match rest.split_once('/') {
                None if !rest.is_empty() => Some(Self::Project {
                    slug: decode(rest),
                }),
                Some((slug, "path")) if !slug.is_empty() => Some(Self::ProjectPath {
                    slug: decode(slug),
                }),
                _ => None,
            };
        }

        let category = Category::from_route_segment(segment)?;
        let (slug, rel) = rest.split_once('/')?;
        if slug.is_empty() || rel.is_empty() {
            return None;
        }
        Some(Self::File {
            category,
            slug: decode(slug),
            rel: decode(rel),
        })
    }
}

fn decode(part: &str) -> String {
    percent_decode_str(part).decode_utf8_lossy().into_owned()
}

#[derive(Debug, Serialize)]
struct ProjectPath {
    path: String,
}

/// Answer an API request.
pub fn handle(request: Request, route: ApiRoute, state: &ServeState) -> Result<()> {
    let Some(root) = state.resolver.resolve() else {
        crate::debug!("serve"; "{}: no project found", request.url());
        return response::respond_project_not_found(request);
    };

    match route {
        ApiRoute::Project { slug } => match project_info(&state.store, &root, state.ws_port) {
            Ok(info) => response::respond_json(request, 200, &info),
            Err(e) => {
                crate::log!("serve"; "project {}: {}", slug, e);
                response::respond_project_not_found(request)
            }
        },
        ApiRoute::ProjectPath { slug } => {
            crate::debug!("serve"; "path of {}: {}", slug, root.display());
            let body = ProjectPath {
                path: root.display().to_string(),
            };
            response::respond_json(request, 200, &body)
        }
        ApiRoute::File {
            category,
            slug,
            rel,
        } => {
            match resolve_category_file(&root, category, &rel) {
                Ok(path) => response::respond_file(request, &path),
                Err(e) if e.is_not_found() => {
                    crate::debug!("serve"; "{}: {}", slug, e);
                    response::respond_not_found(request)
                }
                Err(e) => {
                    crate::log!("serve"; "{}: {}", slug, e);
                    response::respond_forbidden(request)
                }
            }
        }
    }
}

/// Project settings together with a fresh file manifest.
pub fn project_info(store: &ConfigStore, root: &Path, ws_port: u16) -> ProjectResult<ProjectInfo> {
    let descriptor = store.read(root)?;
    let files = build_manifest(store, root);
    Ok(ProjectInfo::new(&descriptor, files, ws_port))
}

/// Locate a file inside a category directory.
///
/// The path is checked lexically before the filesystem is touched. For
/// sounds and music a request without a known extension retries each
/// accepted extension in order.
pub fn resolve_category_file(root: &Path, category: Category, rel: &str) -> ProjectResult<PathBuf> {
    let dir = root.join(category.dir_name());
    let path = sandboxed_join(&dir, rel).ok_or_else(|| ProjectError::AccessDenied(rel.into()))?;

    if path.is_file() {
        return Ok(path);
    }

    if category.has_extension_fallback() && !category.accepts(&path) {
        for ext in category.extensions() {
            let mut candidate = path.clone().into_os_string();
            candidate.push(".");
            candidate.push(ext);
            let candidate = PathBuf::from(candidate);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
    }

    Err(ProjectError::NotFound(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::descriptor::DESCRIPTOR_FILE;
    use std::fs;
    use tempfile::TempDir;

    fn project() -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(DESCRIPTOR_FILE),
            "[meta]\nname = \"Game\"\nslug = \"game1\"\n",
        )
        .unwrap();
        for dir in ["ms", "sounds", "music", "sprites"] {
            fs::create_dir_all(temp.path().join(dir)).unwrap();
        }
        temp
    }

    #[test]
    fn test_parse_project_routes() {
        assert_eq!(
            ApiRoute::parse("/api/project/game1"),
            Some(ApiRoute::Project {
                slug: "game1".into()
            })
        );
        assert_eq!(
            ApiRoute::parse("/api/project/game1/path?x=1"),
            Some(ApiRoute::ProjectPath {
                slug: "game1".into()
            })
        );
        assert_eq!(ApiRoute::parse("/api/project/"), None);
        assert_eq!(ApiRoute::parse("/api/project/game1/other"), None);
    }

    #[test]
    fn test_parse_file_routes() {
        assert_eq!(
            ApiRoute::parse("/api/sprite/game1/chars/hero%20big.png"),
            Some(ApiRoute::File {
                category: Category::Sprites,
                slug: "game1".into(),
                rel: "chars/hero big.png".into(),
            })
        );
        assert_eq!(
            ApiRoute::parse("/api/file/game1/main.ms").map(|r| match r {
                ApiRoute::File { category, .. } => category,
                _ => Category::Assets,
            }),
            Some(Category::Sources)
        );
        assert_eq!(ApiRoute::parse("/api/unknown/game1/a.txt"), None);
        assert_eq!(ApiRoute::parse("/api/sound/game1/"), None);
        assert_eq!(ApiRoute::parse("/static/app.js"), None);
    }

    #[test]
    fn test_resolve_rejects_traversal_before_io() {
        let temp = project();
        for rel in ["../project.toml", "/etc/passwd", "a/../../x", "..\\project.toml"] {
            let err = resolve_category_file(temp.path(), Category::Sources, rel).unwrap_err();
            assert!(matches!(err, ProjectError::AccessDenied(_)), "{rel}");
        }
        // Staying inside is fine
        fs::write(temp.path().join("ms/main.ms"), "x").unwrap();
        assert!(resolve_category_file(temp.path(), Category::Sources, "lib/../main.ms").is_ok());
    }

    #[test]
    fn test_resolve_missing_is_not_found() {
        let temp = project();
        let err = resolve_category_file(temp.path(), Category::Sources, "nope.ms").unwrap_err();
        assert!(matches!(err, ProjectError::NotFound(_)));
    }

    #[test]
    fn test_sound_extension_fallback_in_order() {
        let temp = project();
        fs::write(temp.path().join("sounds/jump.ogg"), "ogg").unwrap();
        fs::write(temp.path().join("sounds/jump.flac"), "flac").unwrap();

        let path = resolve_category_file(temp.path(), Category::Sounds, "jump").unwrap();
        assert_eq!(path, temp.path().join("sounds/jump.ogg"));

        fs::write(temp.path().join("sounds/jump.wav"), "wav").unwrap();
        let path = resolve_category_file(temp.path(), Category::Sounds, "jump").unwrap();
        assert_eq!(path, temp.path().join("sounds/jump.wav"));
    }

    #[test]
    fn test_fallback_only_for_audio_and_unknown_extension() {
        let temp = project();
        fs::write(temp.path().join("sounds/jump.wav"), "wav").unwrap();
        fs::write(temp.path().join("ms/main.ms"), "x").unwrap();

        // Known extension that is missing does not retry
        assert!(resolve_category_file(temp.path(), Category::Sounds, "jump.ogg").is_err());
        // Other categories never retry
        assert!(resolve_category_file(temp.path(), Category::Sources, "main").is_err());

        fs::write(temp.path().join("music/theme.mp3"), "mp3").unwrap();
        let path = resolve_category_file(temp.path(), Category::Music, "theme").unwrap();
        assert_eq!(path, temp.path().join("music/theme.mp3"));
    }

    #[test]
    fn test_project_info_includes_manifest() {
        let temp = project();
        fs::write(temp.path().join("ms/main.ms"), "print(1)").unwrap();

        let store = ConfigStore::new();
        let info = project_info(&store, temp.path(), 35729).unwrap();
        assert_eq!(info.slug, "game1");
        assert_eq!(info.ws_port, 35729);
        assert_eq!(info.files.sources.len(), 1);
        assert_eq!(info.files.sources[0].file, "main.ms");
    }

    #[test]
    fn test_project_info_malformed_descriptor() {
        let temp = project();
        fs::write(temp.path().join(DESCRIPTOR_FILE), "[meta\nname=").unwrap();

        let store = ConfigStore::new();
        let err = project_info(&store, temp.path(), 35729).unwrap_err();
        assert!(err.is_not_found());
    }
}
