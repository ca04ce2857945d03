//! Segmented download engine for UnionCrax.Direct.
//!
//! - `planner` - split a file into byte-range segments
//! - `progress` - smoothed speed, ETA and event throttling
//! - `transfer` - `HEAD` probe and GET workers
//! - `manager` - the task registry implementing `DownloadManagerPort`
//! - `preview` - `PreviewFetcher` over the same HTTP stack
#![deny(unused_crate_dependencies)]

// Re-export core types for convenience
pub use ucd_core::download::{
    DownloadError, DownloadEvent, DownloadUpdate, TaskFailure, TaskId, TaskStatus,
};
pub use ucd_core::ports::{
    DownloadEventEmitterPort, DownloadManagerConfig, DownloadManagerPort, DownloadRequest,
    DownloadRootProvider,
};

pub mod planner;
pub mod progress;
pub mod transfer;

mod manager;
mod preview;

pub use manager::{
    DownloadManagerDeps, DownloadManagerImpl, ResolvedRequest, build_download_manager,
    parse_source_url,
};
pub use planner::{Segment, TransferPlan};
pub use preview::{MAX_PREVIEW_BYTES, ReqwestPreviewFetcher};
pub use progress::{ProgressThrottle, ProgressTracker};
pub use transfer::{ProbeResult, ProgressUpdate, build_client};

#[cfg(test)]
mod dev_deps {
    // Used only by the integration tests.
    use axum as _;
    use tower_http as _;
}
