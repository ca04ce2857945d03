//! Disk inventory implementation for ucd-runtime.
//!
//! `SysinfoDiskInventory` implements `DiskInventoryPort` from ucd-core. Both
//! queries touch the filesystem synchronously, so they run on the blocking
//! pool.

mod disks;
mod usage;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use ucd_core::{DiskError, DiskInventoryPort, Volume};

pub use disks::containing_volume;
pub use usage::directory_usage;

/// Default implementation of `DiskInventoryPort`.
///
/// # Example
///
/// ```ignore
/// use ucd_runtime::SysinfoDiskInventory;
/// use ucd_core::DiskInventoryPort;
///
/// let disks = SysinfoDiskInventory::new().with_fallback_root(root);
/// let volumes = disks.volumes().await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct SysinfoDiskInventory {
    fallback_root: Option<PathBuf>,
}

impl SysinfoDiskInventory {
    /// Create an inventory with no fallback entry.
    pub const fn new() -> Self {
        Self {
            fallback_root: None,
        }
    }

    /// Report `root` as a volume when the host lists none.
    #[must_use]
    pub fn with_fallback_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.fallback_root = Some(root.into());
        self
    }
}

#[async_trait]
impl DiskInventoryPort for SysinfoDiskInventory {
    async fn volumes(&self) -> Result<Vec<Volume>, DiskError> {
        let fallback = self.fallback_root.clone();
        tokio::task::spawn_blocking(move || {
            let volumes = disks::list_volumes();
            match fallback {
                Some(root) if volumes.is_empty() => {
                    tracing::debug!(root = %root.display(), "No volumes listed; using download root");
                    vec![disks::fallback_volume(&root)]
                }
                _ => volumes,
            }
        })
        .await
        .map_err(|e| DiskError::ScanFailed(e.to_string()))
    }

    async fn directory_usage(&self, path: &Path) -> Result<u64, DiskError> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || directory_usage(&path))
            .await
            .map_err(|e| DiskError::ScanFailed(e.to_string()))
    }
}
