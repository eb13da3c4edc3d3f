use std::fmt;

use crate::project::Category;

/// What happened to a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

impl ChangeKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Removed => "removed",
        }
    }
}

/// Which project directory a watcher observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchKind {
    /// `ms/`: content pushed as `update`
    Sources,
    /// `sprites/`: descriptor re-synced, pushed as `sprites`
    Sprites,
}

impl WatchKind {
    pub const ALL: [Self; 2] = [Self::Sources, Self::Sprites];

    pub fn category(self) -> Category {
        match self {
            Self::Sources => Category::Sources,
            Self::Sprites => Category::Sprites,
        }
    }
}

impl fmt::Display for WatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.category().dir_name())
    }
}

/// Errors installing a watcher.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("failed to watch `{path}`: {source}")]
    Notify {
        path: std::path::PathBuf,
        #[source]
        source: notify::Error,
    },
}
