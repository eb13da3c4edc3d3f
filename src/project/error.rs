//! Project error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading or writing project files.
#[derive(Debug, Error)]
pub enum ProjectError {
    /// Project, descriptor or requested file is absent.
    #[error("not found: `{0}`")]
    NotFound(PathBuf),

    /// Requested path escapes its sandboxed root.
    #[error("access denied: `{0}`")]
    AccessDenied(PathBuf),

    #[error("IO error when accessing `{path}`")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Descriptor exists but cannot be parsed.
    #[error("malformed descriptor `{path}`")]
    Malformed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize descriptor")]
    Serialize(#[from] toml::ser::Error),
}

impl ProjectError {
    /// Map an IO error, turning `NotFound` into [`ProjectError::NotFound`].
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(path)
        } else {
            Self::Io { path, source }
        }
    }

    /// Whether a client should see this as "not found".
    ///
    /// A malformed descriptor counts: the server cannot operate on it.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::Malformed { .. } | Self::Io { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ProjectError>;
