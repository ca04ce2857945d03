//! On-disk layout of a download root.
//!
//! ```text
//! <root>/installing/<slug>/<filename>
//! <root>/installing/<slug>/installed.json
//! <root>/installed/<slug>/<filename>
//! <root>/installed/<slug>/installed.json
//! <root>/installed/installed-index.json
//! ```

use std::path::{Path, PathBuf};

use super::ensure::ensure_directory;
use super::error::PathError;

/// Subdirectory holding in-progress downloads.
pub const INSTALLING_DIR: &str = "installing";
/// Subdirectory holding finalized titles.
pub const INSTALLED_DIR: &str = "installed";
/// Per-title manifest file name.
pub const MANIFEST_FILE: &str = "installed.json";
/// Index file name, directly under the installed root.
pub const INDEX_FILE: &str = "installed-index.json";

/// Paths under one download root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    root: PathBuf,
}

impl InstallLayout {
    /// Wrap a download root. Nothing is created until [`Self::ensure`].
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The download root itself.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/installing`
    pub fn installing_root(&self) -> PathBuf {
        self.root.join(INSTALLING_DIR)
    }

    /// `<root>/installed`
    pub fn installed_root(&self) -> PathBuf {
        self.root.join(INSTALLED_DIR)
    }

    /// `<root>/installing/<slug>`
    pub fn installing_dir(&self, slug: &str) -> PathBuf {
        self.installing_root().join(slug)
    }

    /// `<root>/installed/<slug>`
    pub fn installed_dir(&self, slug: &str) -> PathBuf {
        self.installed_root().join(slug)
    }

    /// `<root>/installed/installed-index.json`
    pub fn index_path(&self) -> PathBuf {
        self.installed_root().join(INDEX_FILE)
    }

    /// Create the root and both subdirectories.
    pub fn ensure(&self) -> Result<(), PathError> {
        for dir in [self.root.clone(), self.installing_root(), self.installed_root()] {
            ensure_directory(&dir)?;
        }
        Ok(())
    }
}

/// Manifest path for a title folder.
pub fn manifest_path(title_dir: &Path) -> PathBuf {
    title_dir.join(MANIFEST_FILE)
}
