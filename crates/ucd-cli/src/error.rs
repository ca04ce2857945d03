//! CLI-specific error types and exit codes.

use thiserror::Error;
use ucd_core::TaskFailure;

/// Errors that end a command with a specific exit code.
#[derive(Debug, Error)]
pub enum CliError {
    /// The download reached `failed`.
    #[error("Download failed ({code}): {message}")]
    DownloadFailed { code: String, message: String },

    /// The download was cancelled (Ctrl-C).
    #[error("Download cancelled")]
    Cancelled,

    /// A looked-up item does not exist.
    #[error("{0}")]
    NotFound(String),
}

impl CliError {
    /// Map error to appropriate exit code.
    ///
    /// - 1: General error
    /// - 74: I/O or transfer failure (EX_IOERR)
    /// - 130: Interrupted (128 + SIGINT)
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::DownloadFailed { .. } => 74,
            Self::Cancelled => 130,
            Self::NotFound(_) => 1,
        }
    }
}

impl From<TaskFailure> for CliError {
    fn from(failure: TaskFailure) -> Self {
        Self::DownloadFailed {
            code: failure.code,
            message: failure.message,
        }
    }
}
