//! HTTP adapter for the preview image port.

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use ucd_core::{DownloadError, PreviewFetcher};

use crate::transfer::network_error;

/// Largest preview image accepted by default, in bytes.
pub const MAX_PREVIEW_BYTES: u64 = 16 * 1024 * 1024;

/// Fetches preview images with the engine's HTTP client.
///
/// Bodies are read as a stream and abandoned as soon as they exceed the
/// size cap, whether or not the server sent a `Content-Length`.
#[derive(Debug, Clone)]
pub struct ReqwestPreviewFetcher {
    client: Client,
    max_bytes: u64,
}

impl ReqwestPreviewFetcher {
    /// Wrap an existing client.
    pub const fn new(client: Client) -> Self {
        Self {
            client,
            max_bytes: MAX_PREVIEW_BYTES,
        }
    }

    /// Replace the size cap.
    #[must_use]
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    fn too_large(&self, seen: u64) -> DownloadError {
        DownloadError::other(format!(
            "preview image exceeds {} bytes (got at least {seen})",
            self.max_bytes
        ))
    }
}

#[async_trait]
impl PreviewFetcher for ReqwestPreviewFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, DownloadError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| network_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::network_with_status(
                format!("preview fetch returned {status}"),
                status.as_u16(),
            ));
        }
        if let Some(len) = response.content_length().filter(|len| *len > self.max_bytes) {
            return Err(self.too_large(len));
        }

        let capacity = response
            .content_length()
            .and_then(|len| usize::try_from(len).ok())
            .unwrap_or_default();
        let mut body = Vec::with_capacity(capacity);
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| network_error(&e))?;
            let seen = body.len() as u64 + chunk.len() as u64;
            if seen > self.max_bytes {
                return Err(self.too_large(seen));
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}
