//! Download manager port definition.
//!
//! This port defines the public interface of the download engine. It hides
//! cancellation tokens, HTTP clients and worker fleets behind a small async
//! API that speaks only core download types.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use crate::download::{DownloadError, DownloadUpdate, TaskId};

/// Default number of parallel range requests per task.
pub const DEFAULT_MAX_CONCURRENCY: usize = 6;

/// Default minimum segment size (2 MiB).
pub const DEFAULT_MIN_CHUNK_BYTES: u64 = 2 * 1024 * 1024;

/// Request to start a new download.
///
/// Only `url` is required. Everything else is derived when absent:
/// the file name from the URL path, the destination from the download root,
/// and the task identity from the catalog id or destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    /// Source URL (`http` or `https`).
    pub url: String,
    /// Explicit task identity.
    pub task_id: Option<String>,
    /// Catalog id of the title being downloaded.
    pub appid: Option<String>,
    /// Display name of the title.
    pub name: Option<String>,
    /// File name to write; defaults to the last URL path segment.
    pub filename: Option<String>,
    /// Full destination path; defaults to `<root>/installing/<slug>/<filename>`.
    pub destination: Option<PathBuf>,
    /// Per-task override of the concurrency cap.
    pub concurrency: Option<usize>,
    /// Per-task override of the minimum segment size.
    pub min_chunk_bytes: Option<u64>,
    /// Move the finished file into `installed/` and record it.
    pub finalize: bool,
}

impl DownloadRequest {
    /// Create a request for `url` with every option defaulted.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            task_id: None,
            appid: None,
            name: None,
            filename: None,
            destination: None,
            concurrency: None,
            min_chunk_bytes: None,
            finalize: true,
        }
    }

    /// Set an explicit task identity.
    #[must_use]
    pub fn with_task_id(mut self, id: impl Into<String>) -> Self {
        self.task_id = Some(id.into());
        self
    }

    /// Associate a catalog id.
    #[must_use]
    pub fn with_appid(mut self, appid: impl Into<String>) -> Self {
        self.appid = Some(appid.into());
        self
    }

    /// Associate a display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Override the file name.
    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Override the destination path.
    #[must_use]
    pub fn with_destination(mut self, destination: impl Into<PathBuf>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    /// Override the concurrency cap for this task.
    #[must_use]
    pub const fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    /// Override the minimum segment size for this task.
    #[must_use]
    pub const fn with_min_chunk_bytes(mut self, bytes: u64) -> Self {
        self.min_chunk_bytes = Some(bytes);
        self
    }

    /// Set whether the finished file is moved into `installed/`.
    #[must_use]
    pub const fn with_finalize(mut self, finalize: bool) -> Self {
        self.finalize = finalize;
        self
    }
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadManagerConfig {
    /// Maximum parallel range requests per task.
    pub max_concurrency: usize,
    /// Files at or below this size are fetched with a single stream.
    pub min_chunk_bytes: u64,
    /// Timeout for the `HEAD` probe.
    pub probe_timeout: Duration,
    /// TCP connect timeout for every request.
    pub connect_timeout: Duration,
    /// Minimum interval between progress events for one task.
    pub progress_interval: Duration,
    /// Retries per segment for transient failures (`0` disables retrying).
    pub max_segment_retries: u32,
    /// Base delay for exponential retry backoff.
    pub retry_base_delay: Duration,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
    /// Events buffered per subscriber before the oldest are dropped.
    pub event_capacity: usize,
}

impl Default for DownloadManagerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            min_chunk_bytes: DEFAULT_MIN_CHUNK_BYTES,
            probe_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(30),
            progress_interval: Duration::from_millis(250),
            max_segment_retries: 0,
            retry_base_delay: Duration::from_millis(500),
            user_agent: concat!("ucd/", env!("CARGO_PKG_VERSION")).to_string(),
            event_capacity: 256,
        }
    }
}

impl DownloadManagerConfig {
    /// Set the concurrency cap.
    #[must_use]
    pub const fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max;
        self
    }

    /// Set the minimum segment size.
    #[must_use]
    pub const fn with_min_chunk_bytes(mut self, bytes: u64) -> Self {
        self.min_chunk_bytes = bytes;
        self
    }

    /// Set the `HEAD` probe timeout.
    #[must_use]
    pub const fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Set the progress event interval.
    #[must_use]
    pub const fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Set the per-segment retry budget.
    #[must_use]
    pub const fn with_max_segment_retries(mut self, retries: u32) -> Self {
        self.max_segment_retries = retries;
        self
    }

    /// Set the base retry delay.
    #[must_use]
    pub const fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    /// Set the `User-Agent` header.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<(), DownloadError> {
        if self.max_concurrency == 0 {
            return Err(DownloadError::invalid_config("max_concurrency must be at least 1"));
        }
        if self.min_chunk_bytes == 0 {
            return Err(DownloadError::invalid_config("min_chunk_bytes must be at least 1"));
        }
        Ok(())
    }
}

/// Port for managing downloads.
///
/// # Usage
///
/// ```ignore
/// let manager: Arc<dyn DownloadManagerPort> = /* ... */;
/// let id = manager.start(DownloadRequest::new(url).with_appid("42")).await?;
/// manager.cancel(&id).await?;
/// ```
#[async_trait]
pub trait DownloadManagerPort: Send + Sync {
    /// Register and launch a task.
    ///
    /// Fails with `DuplicateTask` when the identity is already in flight.
    async fn start(&self, request: DownloadRequest) -> Result<TaskId, DownloadError>;

    /// Cancel an in-flight task and wait until all of its workers have stopped.
    async fn cancel(&self, id: &TaskId) -> Result<(), DownloadError>;

    /// Pause a running segmented task, keeping the bytes written so far.
    async fn pause(&self, id: &TaskId) -> Result<(), DownloadError>;

    /// Resume a paused task from its segment offsets.
    async fn resume(&self, id: &TaskId) -> Result<(), DownloadError>;

    /// Latest snapshot of an in-flight task.
    async fn get(&self, id: &TaskId) -> Option<DownloadUpdate>;

    /// Snapshots of every in-flight task.
    async fn list(&self) -> Vec<DownloadUpdate>;

    /// Cancel every in-flight task. Returns how many were cancelled.
    async fn cancel_all(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn request_defaults() {
        let request = DownloadRequest::new("https://host/game.zip");
        assert!(request.finalize);
        assert!(request.task_id.is_none());
        assert!(request.destination.is_none());

        let request = request.with_appid("7").with_concurrency(2).with_finalize(false);
        assert_eq!(request.appid.as_deref(), Some("7"));
        assert_eq!(request.concurrency, Some(2));
        assert!(!request.finalize);
    }

    #[test]
    fn config_defaults_and_validation() {
        let config = DownloadManagerConfig::default();
        assert_eq!(config.max_concurrency, 6);
        assert_eq!(config.min_chunk_bytes, 2 * 1024 * 1024);
        assert_eq!(config.max_segment_retries, 0);
        assert!(config.user_agent.starts_with("ucd/"));
        assert_ok!(config.validate());

        let err = assert_err!(DownloadManagerConfig::default().with_max_concurrency(0).validate());
        assert_eq!(err.reason_code(), "invalid_config");

        assert_err!(DownloadManagerConfig::default().with_min_chunk_bytes(0).validate());
    }
}
