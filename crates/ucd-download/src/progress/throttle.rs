//! Progress throttling.
//!
//! Caps how often a task publishes `progress` events. Status transitions are
//! never throttled.

use std::time::{Duration, Instant};

/// Rate limiter for progress events of one task.
#[derive(Debug, Clone)]
pub struct ProgressThrottle {
    last_emit: Option<Instant>,
    min_interval: Duration,
}

impl ProgressThrottle {
    /// Allow at most one event per `min_interval`.
    pub const fn new(min_interval: Duration) -> Self {
        Self {
            last_emit: None,
            min_interval,
        }
    }

    /// Whether an event may go out at `now`. Records the emission when it may.
    pub fn should_emit_at(&mut self, now: Instant) -> bool {
        match self.last_emit {
            Some(last) if now.saturating_duration_since(last) < self.min_interval => false,
            _ => {
                self.last_emit = Some(now);
                true
            }
        }
    }

    /// Let the next check through regardless of timing (used after a resume).
    pub const fn reset(&mut self) {
        self.last_emit = None;
    }
}
