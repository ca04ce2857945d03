//! Segment planning.
//!
//! Decides whether a transfer is split into parallel byte-range requests and
//! where the boundaries fall. Pure arithmetic, no I/O.

use ucd_core::DownloadError;

/// One inclusive byte range `[start, end]` of the remote file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// Position in the plan, stable across pause/resume.
    pub index: usize,
    /// First byte (inclusive).
    pub start: u64,
    /// Last byte (inclusive).
    pub end: u64,
}

impl Segment {
    /// Create a segment. `end` must not be below `start`.
    pub const fn new(index: usize, start: u64, end: u64) -> Self {
        Self { index, start, end }
    }

    /// Number of bytes covered.
    pub const fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Always `false`: a segment covers at least one byte.
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Value of the `Range` header, resuming after `written` bytes.
    pub fn range_header(&self, written: u64) -> String {
        format!("bytes={}-{}", self.start + written, self.end)
    }
}

/// How a transfer will be executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferPlan {
    /// Known zero-length body: nothing to fetch.
    Empty,
    /// One plain GET, no `Range` header.
    Single,
    /// Parallel ranged GETs covering `[0, total - 1]`.
    Segmented(Vec<Segment>),
}

impl TransferPlan {
    /// Number of workers this plan fans out to.
    pub fn worker_count(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Single => 1,
            Self::Segmented(segments) => segments.len(),
        }
    }
}

/// Plan a transfer.
///
/// Falls back to a single stream when the size is unknown, ranges are not
/// accepted, or the file fits in one chunk. Otherwise splits into
/// `min(max_concurrency, ceil(total / min_chunk_bytes))` equal segments; the
/// last one absorbs the remainder.
pub fn plan(
    total_bytes: Option<u64>,
    accepts_ranges: bool,
    min_chunk_bytes: u64,
    max_concurrency: usize,
) -> Result<TransferPlan, DownloadError> {
    if max_concurrency == 0 {
        return Err(DownloadError::invalid_config(
            "max_concurrency must be at least 1",
        ));
    }
    if min_chunk_bytes == 0 {
        return Err(DownloadError::invalid_config(
            "min_chunk_bytes must be at least 1",
        ));
    }

    let total = match total_bytes {
        Some(0) => return Ok(TransferPlan::Empty),
        Some(total) if accepts_ranges && total > min_chunk_bytes => total,
        _ => return Ok(TransferPlan::Single),
    };

    let wanted = total.div_ceil(min_chunk_bytes);
    let count = u64::try_from(max_concurrency).map_or(wanted, |max| wanted.min(max));
    let chunk = total / count;

    let segments = (0..count)
        .zip(0usize..)
        .map(|(i, index)| {
            let start = i * chunk;
            let end = if i + 1 == count {
                total - 1
            } else {
                start + chunk - 1
            };
            Segment::new(index, start, end)
        })
        .collect();

    Ok(TransferPlan::Segmented(segments))
}

/// Remaining ranges of a partially transferred segment set.
///
/// `written[i]` is how many bytes segment `i` has already persisted. Finished
/// segments are dropped; the rest keep their index so per-segment counters
/// stay attached across a resume.
pub fn remaining(segments: &[Segment], written: &[u64]) -> Vec<(Segment, u64)> {
    segments
        .iter()
        .zip(written)
        .filter(|(segment, done)| **done < segment.len())
        .map(|(segment, done)| (*segment, *done))
        .collect()
}
