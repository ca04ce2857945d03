//! Download domain types, events and errors.
//!
//! This module contains pure data types for the download engine. No I/O,
//! networking, or runtime dependencies allowed.
//!
//! # Structure
//!
//! - `types` - Task identity and lifecycle status (`TaskId`, `TaskStatus`)
//! - `events` - Published records (`DownloadUpdate`, `DownloadEvent`)
//! - `errors` - Error types for download operations

pub mod errors;
pub mod events;
pub mod types;

// Re-export commonly used types
pub use errors::{DownloadError, DownloadResult};
pub use events::{DownloadEvent, DownloadUpdate, TaskFailure};
pub use types::{TaskId, TaskStatus};
