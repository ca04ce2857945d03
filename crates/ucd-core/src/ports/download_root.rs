//! Download root port.
//!
//! The user picks where titles are installed; the engine only needs to read
//! (and occasionally change) that choice.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::settings::SettingsError;

/// Port for resolving and changing the download root.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DownloadRootProvider: Send + Sync {
    /// Current download root, created if missing.
    async fn download_root(&self) -> Result<PathBuf, SettingsError>;

    /// Persist a new download root and return the resolved absolute path.
    ///
    /// Empty paths are rejected.
    async fn set_download_root(&self, path: &str) -> Result<PathBuf, SettingsError>;
}

/// A provider pinned to one directory, for tests and one-off CLI overrides.
#[derive(Debug, Clone)]
pub struct FixedDownloadRoot {
    root: PathBuf,
}

impl FixedDownloadRoot {
    /// Pin the provider to `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl DownloadRootProvider for FixedDownloadRoot {
    async fn download_root(&self) -> Result<PathBuf, SettingsError> {
        crate::paths::ensure_directory(&self.root)?;
        Ok(self.root.clone())
    }

    async fn set_download_root(&self, _path: &str) -> Result<PathBuf, SettingsError> {
        Ok(self.root.clone())
    }
}
