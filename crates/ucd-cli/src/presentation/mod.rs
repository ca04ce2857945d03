//! Shared CLI presentation utilities.
//!
//! Keep this module format-only: no domain transforms.

pub mod progress;
pub mod tables;

pub use progress::DownloadProgress;
pub use tables::{manifest_rows, print_separator, truncate_string, volume_rows};
