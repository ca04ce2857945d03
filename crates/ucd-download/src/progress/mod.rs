//! Progress accounting.
//!
//! - `tracker` - smoothed throughput, ETA and percent
//! - `throttle` - rate limit for progress events

mod throttle;
mod tracker;

pub use throttle::ProgressThrottle;
pub use tracker::{ProgressTracker, eta_seconds, percent};
