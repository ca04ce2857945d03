//! CLI bootstrap - the composition root.
//!
//! This module is the ONLY place where infrastructure is wired together
//! for the CLI adapter:
//! - Settings store and download root (via ucd-runtime)
//! - Download manager (via ucd-download)
//! - Disk inventory (via ucd-runtime)

use std::sync::Arc;

use anyhow::Result;
use ucd_core::{
    DiskInventoryPort, DownloadManagerConfig, FixedDownloadRoot, ManifestStore,
    NoopDownloadEmitter,
};
use ucd_download::{
    DownloadManagerDeps, DownloadManagerImpl, ReqwestPreviewFetcher, build_download_manager,
};
use ucd_runtime::{DownloadRootResolution, DownloadRootSource, JsonSettingsStore, SysinfoDiskInventory};

/// Bootstrap configuration for the CLI.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// `--root` override for this invocation.
    pub root_override: Option<String>,
    /// Engine tuning.
    pub engine: DownloadManagerConfig,
}

/// Fully composed context for CLI commands.
pub struct CliContext {
    /// Persisted settings (download root).
    pub settings: Arc<JsonSettingsStore>,
    /// The download root in effect for this run.
    pub root: DownloadRootResolution,
    /// The download engine.
    pub downloads: Arc<DownloadManagerImpl>,
    /// Storage queries.
    pub disks: Arc<dyn DiskInventoryPort>,
}

impl CliContext {
    /// Manifest store for the active root, with preview caching enabled.
    ///
    /// Shares its write lock with the store the engine records installs into.
    pub fn manifests(&self) -> ManifestStore {
        let fetcher = ReqwestPreviewFetcher::new(self.downloads.client().clone());
        self.downloads
            .manifest_store(&self.root.path)
            .with_preview_fetcher(Arc::new(fetcher))
    }
}

/// Wire settings, engine and disk inventory together.
pub async fn bootstrap(config: CliConfig) -> Result<CliContext> {
    let settings = Arc::new(JsonSettingsStore::open_default()?);
    let root = settings
        .resolve_download_root(config.root_override.as_deref())
        .await?;
    tracing::debug!(root = %root.path.display(), source = ?root.source, "Resolved download root");

    let emitter = Arc::new(NoopDownloadEmitter::new());
    let downloads = if root.source == DownloadRootSource::Explicit {
        build_download_manager(DownloadManagerDeps {
            root_provider: Arc::new(FixedDownloadRoot::new(&root.path)),
            event_emitter: emitter,
            config: config.engine,
        })?
    } else {
        build_download_manager(DownloadManagerDeps {
            root_provider: Arc::clone(&settings),
            event_emitter: emitter,
            config: config.engine,
        })?
    };

    let disks = Arc::new(SysinfoDiskInventory::new().with_fallback_root(&root.path));

    Ok(CliContext {
        settings,
        root,
        downloads: Arc::new(downloads),
        disks,
    })
}
