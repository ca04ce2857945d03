//! HTTP transfer primitives.
//!
//! - `probe` - `HEAD` request for size and range support
//! - `worker` - ranged and whole-body GET workers
//!
//! Workers only write to a `watch::Sender<ProgressUpdate>`; turning byte
//! counts into events is the orchestrator's job.

mod probe;
mod worker;

use std::future::Future;

use reqwest::Client;
use tokio_util::sync::CancellationToken;
use ucd_core::{DownloadError, DownloadManagerConfig};

pub use probe::{ProbeResult, probe};
pub use worker::{RetryPolicy, TransferContext, fetch_segment, fetch_whole};

/// Progress record shared between workers and the progress bridge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressUpdate {
    /// Bytes persisted across all workers of the task.
    pub downloaded: u64,
    /// Total size, when known.
    pub total: Option<u64>,
    /// Bumped on every change so the bridge can skip stale values.
    pub seq: u64,
}

impl ProgressUpdate {
    /// Initial record for a task that has `downloaded` bytes already.
    pub const fn new(downloaded: u64, total: Option<u64>) -> Self {
        Self {
            downloaded,
            total,
            seq: 0,
        }
    }
}

/// Build the shared HTTP client for one manager.
pub fn build_client(config: &DownloadManagerConfig) -> Result<Client, DownloadError> {
    Client::builder()
        .connect_timeout(config.connect_timeout)
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(|e| DownloadError::invalid_config(format!("failed to build HTTP client: {e}")))
}

/// Map a reqwest failure, keeping the status when there is one.
pub(crate) fn network_error(err: &reqwest::Error) -> DownloadError {
    err.status().map_or_else(
        || DownloadError::network(err.to_string()),
        |status| DownloadError::network_with_status(err.to_string(), status.as_u16()),
    )
}

/// Run `fut` unless `cancel` fires first.
pub(crate) async fn until_cancelled<F: Future>(
    cancel: &CancellationToken,
    fut: F,
) -> Result<F::Output, DownloadError> {
    tokio::select! {
        biased;

        () = cancel.cancelled() => Err(DownloadError::Cancelled),
        output = fut => Ok(output),
    }
}
