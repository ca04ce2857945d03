//! Disk inventory port: storage volumes and space used under a path.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Read-only snapshot of one storage volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    /// Stable identifier (the mount point).
    pub id: String,
    /// Display name (volume label, or the mount point when unlabeled).
    pub name: String,
    /// Mount point.
    pub path: PathBuf,
    /// Capacity in bytes.
    pub total_bytes: u64,
    /// Space available to the current user, in bytes.
    pub free_bytes: u64,
}

/// Errors from the disk inventory adapter itself.
///
/// Individual inaccessible volumes or entries are skipped, never reported.
#[derive(Debug, Error)]
pub enum DiskError {
    /// The background scan could not complete.
    #[error("Disk scan failed: {0}")]
    ScanFailed(String),
}

/// Port for storage queries.
#[async_trait]
pub trait DiskInventoryPort: Send + Sync {
    /// Every usable storage volume.
    async fn volumes(&self) -> Result<Vec<Volume>, DiskError>;

    /// Total size in bytes of regular files under `path` (symlinks not followed).
    async fn directory_usage(&self, path: &Path) -> Result<u64, DiskError>;
}
