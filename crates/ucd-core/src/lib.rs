//! Core domain for the UnionCrax.Direct download and install engine.
//!
//! - `download` - task identity, status, events and errors
//! - `install` - manifests, the installed index and catalog seeds
//! - `paths` - data root, download root layout, slugs and unique names
//! - `ports` - traits implemented by the engine and OS adapters
//! - `services` - checksums and the manifest store
//! - `settings` - persisted user settings
#![deny(unused_crate_dependencies)]

pub mod download;
pub mod install;
pub mod paths;
pub mod ports;
pub mod services;
pub mod settings;

pub use download::{
    DownloadError, DownloadEvent, DownloadResult, DownloadUpdate, TaskFailure, TaskId, TaskStatus,
};
pub use install::{
    CatalogEntry, FileRecord, IndexEntry, InstallError, InstalledIndex, InstalledManifest,
};
pub use paths::{
    InstallLayout, PathError, data_root, default_download_root, ensure_directory,
    normalize_user_path, resolve_unique_path, slugify, verify_writable,
};
pub use ports::{
    BroadcastDownloadEmitter, DiskError, DiskInventoryPort, DownloadEventEmitterPort,
    DownloadManagerConfig, DownloadManagerPort, DownloadRequest, DownloadRootProvider,
    FixedDownloadRoot, NoopDownloadEmitter, PreviewFetcher, Volume,
};
pub use services::{FinalizedFile, ManifestStore, ProvisionalSave};
pub use settings::{Settings, SettingsError, SettingsUpdate, validate_settings};
