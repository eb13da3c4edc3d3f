//! Locate the project root on disk.

use std::path::{Path, PathBuf};

use super::descriptor::DESCRIPTOR_FILE;

/// Directories examined above the start directory, including itself.
pub const MAX_ANCESTOR_DEPTH: usize = 5;

/// Finds the directory holding `project.toml`.
///
/// The server works on one project at a time; every slug resolves to the
/// same root. Resolution runs per call, so a descriptor created after
/// startup is picked up.
#[derive(Debug, Clone)]
pub struct ProjectResolver {
    explicit: Option<PathBuf>,
    start_dir: PathBuf,
}

impl ProjectResolver {
    pub fn new(explicit: Option<PathBuf>, start_dir: PathBuf) -> Self {
        Self {
            explicit,
            start_dir,
        }
    }

    /// Resolve from the process working directory.
    pub fn from_cwd(explicit: Option<PathBuf>) -> std::io::Result<Self> {
        Ok(Self::new(explicit, std::env::current_dir()?))
    }

    /// Project root, if one can be found.
    ///
    /// An explicit path wins when it holds a descriptor. Otherwise walk up
    /// from the start directory, at most [`MAX_ANCESTOR_DEPTH`] levels.
    pub fn resolve(&self) -> Option<PathBuf> {
        if let Some(explicit) = &self.explicit {
            if has_descriptor(explicit) {
                return Some(explicit.clone());
            }
        }

        self.start_dir
            .ancestors()
            .take(MAX_ANCESTOR_DEPTH)
            .take_while(|dir| dir.parent().is_some())
            .find(|dir| has_descriptor(dir))
            .map(Path::to_path_buf)
    }

    /// Explicit path as given, whether or not it holds a descriptor.
    pub fn explicit(&self) -> Option<&Path> {
        self.explicit.as_deref()
    }
}

fn has_descriptor(dir: &Path) -> bool {
    dir.join(DESCRIPTOR_FILE).is_file()
}
