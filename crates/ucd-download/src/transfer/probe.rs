//! `HEAD` probe.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::{ACCEPT_RANGES, CONTENT_LENGTH, HeaderMap};
use ucd_core::DownloadError;

use super::network_error;

/// What the server told us about the resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbeResult {
    /// `Content-Length`, when present and numeric.
    pub total_bytes: Option<u64>,
    /// Whether `Accept-Ranges` lists `bytes`.
    pub accepts_ranges: bool,
}

impl ProbeResult {
    /// Single-stream, unknown-length fallback.
    pub const fn unknown() -> Self {
        Self {
            total_bytes: None,
            accepts_ranges: false,
        }
    }

    fn from_headers(headers: &HeaderMap) -> Self {
        let total_bytes = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let accepts_ranges = headers
            .get(ACCEPT_RANGES)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| {
                v.split(',')
                    .any(|unit| unit.trim().eq_ignore_ascii_case("bytes"))
            });
        Self {
            total_bytes,
            accepts_ranges,
        }
    }
}

/// Send a `HEAD` request bounded by `timeout`.
///
/// The header is read directly because a `HEAD` response has no body for
/// the client to measure.
pub async fn probe(client: &Client, url: &str, timeout: Duration) -> Result<ProbeResult, DownloadError> {
    let response = tokio::time::timeout(timeout, client.head(url).send())
        .await
        .map_err(|_| DownloadError::network(format!("HEAD timed out after {timeout:?}")))?
        .map_err(|e| network_error(&e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(DownloadError::network_with_status(
            format!("HEAD returned {status}"),
            status.as_u16(),
        ));
    }

    Ok(ProbeResult::from_headers(response.headers()))
}
