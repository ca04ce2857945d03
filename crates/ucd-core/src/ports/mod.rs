//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces the core domain expects from infrastructure.
//! They contain no implementation details and use only domain types.

pub mod disk_inventory;
pub mod download_event_emitter;
pub mod download_manager;
pub mod download_root;
pub mod preview_fetcher;

pub use disk_inventory::{DiskError, DiskInventoryPort, Volume};
pub use download_event_emitter::{
    BroadcastDownloadEmitter, DownloadEventEmitterPort, NoopDownloadEmitter,
};
pub use download_manager::{
    DEFAULT_MAX_CONCURRENCY, DEFAULT_MIN_CHUNK_BYTES, DownloadManagerConfig, DownloadManagerPort,
    DownloadRequest,
};
pub use download_root::{DownloadRootProvider, FixedDownloadRoot};
pub use preview_fetcher::PreviewFetcher;

#[cfg(test)]
pub use download_root::MockDownloadRootProvider;
#[cfg(test)]
pub use preview_fetcher::MockPreviewFetcher;
