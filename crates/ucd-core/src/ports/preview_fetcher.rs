//! Preview image fetcher port.
//!
//! Used for the best-effort placeholder image saved next to a provisional
//! manifest. Failures are swallowed by the caller.

use async_trait::async_trait;

use crate::download::DownloadError;

/// Port for fetching a small remote resource into memory.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PreviewFetcher: Send + Sync {
    /// Fetch the full body of `url`.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, DownloadError>;
}
