//! Command handlers.
//!
//! Each handler takes the composed [`CliContext`](crate::bootstrap::CliContext)
//! and prints its own output.

pub mod disks;
pub mod get;
pub mod installed;
pub mod root;

pub use get::GetArgs;
