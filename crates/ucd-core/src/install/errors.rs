//! Install bookkeeping errors.

use std::path::PathBuf;

use thiserror::Error;

use crate::paths::PathError;

/// Errors from the manifest store.
///
/// Only the finalize move is fatal to an install; checksum and manifest write
/// failures are logged by the store and never reach callers as errors.
#[derive(Debug, Error)]
pub enum InstallError {
    /// Filesystem operation failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Moving the finished file into the installed root failed.
    ///
    /// The file is left in place at `from`.
    #[error("Failed to move {from} to {to}: {source}")]
    MoveFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A manifest or index could not be encoded or decoded.
    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Layout resolution failed.
    #[error(transparent)]
    Path(#[from] PathError),

    /// A blocking filesystem task panicked or was cancelled.
    #[error("Background task failed: {0}")]
    Task(String),
}

impl InstallError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
