//! Throughput smoothing.
//!
//! First-order exponential smoothing with `alpha = 0.3`, seeded by the first
//! sample.

use std::time::Instant;

/// Weight of the newest sample.
const SMOOTHING: f64 = 0.3;

/// Shortest interval a sample is measured over, in seconds.
const MIN_ELAPSED_SECS: f64 = 0.001;

/// Per-task speed accumulator.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    last_bytes: u64,
    last_time: Instant,
    speed_bps: f64,
}

impl ProgressTracker {
    /// Start measuring from `now` with nothing received.
    pub const fn new(now: Instant) -> Self {
        Self {
            last_bytes: 0,
            last_time: now,
            speed_bps: 0.0,
        }
    }

    /// Start measuring from an already-received byte count.
    pub const fn resume_from(received: u64, now: Instant) -> Self {
        Self {
            last_bytes: received,
            last_time: now,
            speed_bps: 0.0,
        }
    }

    /// Fold in `delta` bytes received since the previous sample.
    ///
    /// Returns the smoothed speed in bytes per second.
    pub fn record(&mut self, delta: u64, now: Instant) -> f64 {
        let elapsed = now
            .saturating_duration_since(self.last_time)
            .as_secs_f64()
            .max(MIN_ELAPSED_SECS);
        #[allow(clippy::cast_precision_loss)]
        let instant = delta as f64 / elapsed;

        self.speed_bps = if self.speed_bps > 0.0 {
            SMOOTHING.mul_add(instant, (1.0 - SMOOTHING) * self.speed_bps)
        } else {
            instant
        };
        self.last_bytes = self.last_bytes.saturating_add(delta);
        self.last_time = now;
        self.speed_bps
    }

    /// Fold in an absolute received count (the delta is derived).
    pub fn observe(&mut self, received: u64, now: Instant) -> f64 {
        let delta = received.saturating_sub(self.last_bytes);
        self.record(delta, now)
    }

    /// Current smoothed speed.
    pub const fn speed_bps(&self) -> f64 {
        self.speed_bps
    }

    /// Bytes accounted for so far.
    pub const fn last_bytes(&self) -> u64 {
        self.last_bytes
    }
}

/// Seconds until `remaining` bytes arrive at `speed_bps`.
///
/// `None` unless both are positive.
#[allow(clippy::cast_precision_loss)]
pub fn eta_seconds(remaining: u64, speed_bps: f64) -> Option<f64> {
    (speed_bps > 0.0 && remaining > 0).then(|| remaining as f64 / speed_bps)
}

/// Completion percentage, `None` when the total is unknown or zero.
#[allow(clippy::cast_precision_loss)]
pub fn percent(received: u64, total: Option<u64>) -> Option<f64> {
    total
        .filter(|t| *t > 0)
        .map(|t| (received as f64 / t as f64 * 100.0).min(100.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn first_sample_seeds_speed() {
        let start = Instant::now();
        let mut tracker = ProgressTracker::new(start);

        let speed = tracker.observe(1_000_000, start + Duration::from_secs(1));
        assert!(close(speed, 1_000_000.0));
    }

    #[test]
    fn later_samples_blend() {
        let start = Instant::now();
        let mut tracker = ProgressTracker::new(start);
        tracker.observe(1_000_000, start + Duration::from_secs(1));

        // 500 KB/s instant: 0.3 * 500_000 + 0.7 * 1_000_000
        let speed = tracker.observe(1_500_000, start + Duration::from_secs(2));
        assert!(close(speed, 850_000.0));
        assert_eq!(tracker.last_bytes(), 1_500_000);
    }

    #[test]
    fn zero_elapsed_is_clamped() {
        let start = Instant::now();
        let mut tracker = ProgressTracker::new(start);
        let speed = tracker.record(10, start);
        assert!(speed.is_finite());
        assert!(close(speed, 10_000.0));
    }

    #[test]
    fn eta_and_percent_edges() {
        assert_eq!(eta_seconds(100, 0.0), None);
        assert_eq!(eta_seconds(0, 10.0), None);
        assert!(close(eta_seconds(100, 50.0).unwrap(), 2.0));

        assert_eq!(percent(5, None), None);
        assert_eq!(percent(0, Some(0)), None);
        assert!(close(percent(25, Some(100)).unwrap(), 25.0));
    }
}
