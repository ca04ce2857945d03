//! Transfer workers.
//!
//! A worker owns one GET request. Ranged workers write into their own slice
//! of a pre-sized file; the whole-body worker creates the file itself.
//! Workers never emit events, they only bump the shared progress record.

use std::io::SeekFrom;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{CONTENT_RANGE, HeaderMap, RANGE};
use reqwest::{Client, StatusCode};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use ucd_core::DownloadError;

use super::{ProgressUpdate, network_error, until_cancelled};
use crate::planner::Segment;

/// Everything a worker needs, cloned per worker.
#[derive(Clone)]
pub struct TransferContext {
    /// Shared HTTP client.
    pub client: Client,
    /// Source URL.
    pub url: String,
    /// Destination file.
    pub path: PathBuf,
    /// Aggregate progress for the task.
    pub progress: watch::Sender<ProgressUpdate>,
    /// Fires when this worker must stop writing.
    pub cancel: CancellationToken,
}

impl TransferContext {
    fn record(&self, bytes: u64) {
        self.progress.send_modify(|p| {
            p.downloaded += bytes;
            p.seq += 1;
        });
    }
}

/// Retry budget for transient segment failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (`0` disables retrying).
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each further one.
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// No retries at all.
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    /// Backoff before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }
}

/// Fetch one segment, resuming after the bytes already in `written`.
///
/// `written` is the segment's persisted byte count. It survives across
/// retries and pause/resume and only ever grows.
pub async fn fetch_segment(
    ctx: &TransferContext,
    segment: Segment,
    written: &AtomicU64,
    retry: &RetryPolicy,
) -> Result<(), DownloadError> {
    let mut attempt = 0u32;
    loop {
        match fetch_segment_once(ctx, segment, written).await {
            Ok(()) => return Ok(()),
            Err(e) if e.is_transient() && attempt < retry.max_retries => {
                attempt += 1;
                let delay = retry.delay_for(attempt);
                tracing::debug!(
                    target: "ucd.download",
                    segment = segment.index,
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %e,
                    "Retrying segment"
                );
                until_cancelled(&ctx.cancel, tokio::time::sleep(delay)).await?;
            }
            Err(e) => return Err(e),
        }
    }
}

async fn fetch_segment_once(
    ctx: &TransferContext,
    segment: Segment,
    written: &AtomicU64,
) -> Result<(), DownloadError> {
    let offset = written.load(Ordering::Acquire);
    if offset >= segment.len() {
        return Ok(());
    }

    let request = ctx
        .client
        .get(&ctx.url)
        .header(RANGE, segment.range_header(offset));
    let response = until_cancelled(&ctx.cancel, request.send())
        .await?
        .map_err(|e| network_error(&e))?;

    match response.status() {
        StatusCode::PARTIAL_CONTENT => {
            // Bytes are written at the requested offset, so the reply must start there.
            let expected = segment.start + offset;
            let start = content_range_start(response.headers());
            if let Some(start) = start.filter(|start| *start != expected) {
                return Err(DownloadError::network_with_status(
                    format!(
                        "segment {} asked for byte {expected}, Content-Range starts at {start}",
                        segment.index
                    ),
                    StatusCode::PARTIAL_CONTENT.as_u16(),
                ));
            }
        }
        StatusCode::OK => {
            return Err(DownloadError::network_with_status(
                "server ignored the Range header",
                StatusCode::OK.as_u16(),
            ));
        }
        status => {
            return Err(DownloadError::network_with_status(
                format!("segment {} got {status}", segment.index),
                status.as_u16(),
            ));
        }
    }

    let mut file = OpenOptions::new().write(true).open(&ctx.path).await?;
    file.seek(SeekFrom::Start(segment.start + offset)).await?;

    let mut stream = response.bytes_stream();
    let result = loop {
        let next = tokio::select! {
            biased;

            () = ctx.cancel.cancelled() => break Err(DownloadError::Cancelled),
            next = stream.next() => next,
        };

        let chunk = match next {
            Some(Ok(chunk)) => chunk,
            Some(Err(e)) => break Err(network_error(&e)),
            None => {
                let done = written.load(Ordering::Acquire);
                break if done >= segment.len() {
                    Ok(())
                } else {
                    Err(DownloadError::network(format!(
                        "short body for segment {}: {done} of {} bytes",
                        segment.index,
                        segment.len()
                    )))
                };
            }
        };

        // Anything past the end of the range belongs to another segment.
        let room = segment.len() - written.load(Ordering::Acquire);
        let take = usize::try_from(room).map_or(chunk.len(), |room| chunk.len().min(room));
        if let Err(e) = file.write_all(&chunk[..take]).await {
            break Err(e.into());
        }
        let take = take as u64;
        written.fetch_add(take, Ordering::AcqRel);
        ctx.record(take);

        if take == room {
            break Ok(());
        }
    };

    let flushed = file.flush().await;
    result.and(flushed.map_err(DownloadError::from))
}

/// First byte position of a `Content-Range: bytes START-END/TOTAL` header.
fn content_range_start(headers: &HeaderMap) -> Option<u64> {
    let value = headers.get(CONTENT_RANGE)?.to_str().ok()?;
    let (start, _) = value.trim().strip_prefix("bytes ")?.split_once('-')?;
    start.trim().parse().ok()
}

/// Fetch the whole body with one plain GET.
///
/// Returns the number of bytes written.
pub async fn fetch_whole(ctx: &TransferContext) -> Result<u64, DownloadError> {
    let response = until_cancelled(&ctx.cancel, ctx.client.get(&ctx.url).send())
        .await?
        .map_err(|e| network_error(&e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(DownloadError::network_with_status(
            format!("GET returned {status}"),
            status.as_u16(),
        ));
    }

    let expected = response.content_length();
    if expected.is_some() {
        ctx.progress.send_if_modified(|p| {
            let unknown = p.total.is_none();
            if unknown {
                p.total = expected;
            }
            unknown
        });
    }

    let mut file = File::create(&ctx.path).await?;
    let mut received = 0u64;
    let mut stream = response.bytes_stream();

    let result = loop {
        let next = tokio::select! {
            biased;

            () = ctx.cancel.cancelled() => break Err(DownloadError::Cancelled),
            next = stream.next() => next,
        };

        match next {
            Some(Ok(chunk)) => {
                if let Err(e) = file.write_all(&chunk).await {
                    break Err(e.into());
                }
                let len = chunk.len() as u64;
                received += len;
                ctx.record(len);
            }
            Some(Err(e)) => break Err(network_error(&e)),
            None => break Ok(()),
        }
    };

    let flushed = file.flush().await;
    result.and(flushed.map_err(DownloadError::from))?;

    match expected {
        Some(expected) if received < expected => Err(DownloadError::network(format!(
            "short body: {received} of {expected} bytes"
        ))),
        _ => Ok(received),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
    }

    #[test]
    fn content_range_start_parses_bytes_unit() {
        let mut headers = HeaderMap::new();
        assert_eq!(content_range_start(&headers), None);

        headers.insert(CONTENT_RANGE, "bytes 1048576-2097151/4194304".parse().unwrap());
        assert_eq!(content_range_start(&headers), Some(1_048_576));

        headers.insert(CONTENT_RANGE, "bytes 0-99/*".parse().unwrap());
        assert_eq!(content_range_start(&headers), Some(0));

        headers.insert(CONTENT_RANGE, "bytes */4194304".parse().unwrap());
        assert_eq!(content_range_start(&headers), None);

        headers.insert(CONTENT_RANGE, "items 0-9/10".parse().unwrap());
        assert_eq!(content_range_start(&headers), None);
    }

    #[test]
    fn misaligned_partial_is_not_transient() {
        let err = DownloadError::network_with_status(
            "segment 0 asked for byte 0, Content-Range starts at 1",
            StatusCode::PARTIAL_CONTENT.as_u16(),
        );
        assert!(!err.is_transient());
    }

    #[test]
    fn no_retry_policy() {
        let policy = RetryPolicy::none();
        assert_eq!(policy.max_retries, 0);
        assert_eq!(policy.delay_for(5), Duration::ZERO);
    }

    #[tokio::test]
    async fn progress_record_accumulates() {
        let (tx, rx) = watch::channel(ProgressUpdate::new(10, Some(100)));
        let ctx = TransferContext {
            client: Client::new(),
            url: "http://127.0.0.1:9/never".to_string(),
            path: PathBuf::from("unused"),
            progress: tx,
            cancel: CancellationToken::new(),
        };

        ctx.record(5);
        ctx.record(7);
        let current = *rx.borrow();
        assert_eq!(current.downloaded, 22);
        assert_eq!(current.seq, 2);
    }

    #[tokio::test]
    async fn cancelled_context_stops_before_sending() {
        let (tx, _rx) = watch::channel(ProgressUpdate::default());
        let ctx = TransferContext {
            client: Client::new(),
            url: "http://127.0.0.1:9/never".to_string(),
            path: PathBuf::from("unused"),
            progress: tx,
            cancel: CancellationToken::new(),
        };
        ctx.cancel.cancel();

        let written = AtomicU64::new(0);
        let err = fetch_segment(&ctx, Segment::new(0, 0, 99), &written, &RetryPolicy::none())
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(written.load(Ordering::Acquire), 0);
    }
}
