//! Engine errors and their stable reason codes.
//!
//! `DownloadError` crosses task and process boundaries inside progress
//! records, so it holds plain strings: an `io::Error` is reduced to its kind
//! name and message.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for download operations.
///
/// The orchestrator is the single point that turns worker, probe and
/// filesystem failures into one of these variants, so nothing below it has to
/// know how failures are presented to the UI.
#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum DownloadError {
    /// Directory creation, pre-sizing, write or rename failed.
    #[error("I/O error ({kind}): {message}")]
    Io {
        /// `io::ErrorKind` name or the failing step (`MoveFailed`).
        kind: String,
        message: String,
    },

    /// A probe, worker or preview request failed.
    #[error("Network error: {message}")]
    Network {
        message: String,
        /// Present when the server answered at all.
        #[serde(skip_serializing_if = "Option::is_none")]
        status_code: Option<u16>,
    },

    /// A task with the same identity is already queued, running or paused.
    #[error("Task already running: {id}")]
    DuplicateTask {
        /// The task identity that is already in flight.
        id: String,
    },

    /// No in-flight task with this identity.
    #[error("No such task: {id}")]
    NotFound {
        /// The task identity that wasn't found.
        id: String,
    },

    /// Engine configuration is unusable (e.g. zero concurrency).
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// What is wrong with the configuration.
        message: String,
    },

    /// The start request itself is malformed (bad URL, empty filename).
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// What is wrong with the request.
        message: String,
    },

    /// Pause was requested for a single-stream transfer.
    #[error("Task {id} cannot be paused: server does not support byte ranges")]
    PauseUnsupported {
        /// The task identity.
        id: String,
    },

    /// Resume was requested for a task that is not paused.
    #[error("Task {id} is not paused")]
    NotPaused {
        /// The task identity.
        id: String,
    },

    /// The caller cancelled the task.
    #[error("Download cancelled")]
    Cancelled,

    /// A size or checksum did not match.
    #[error("Integrity check failed: expected {expected}, got {actual}")]
    IntegrityFailed {
        expected: String,
        actual: String,
    },

    #[error("{message}")]
    Other {
        message: String,
    },
}

impl DownloadError {
    /// Filesystem failure; `kind` names the step or the `io::ErrorKind`.
    pub fn io(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Io {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Flatten an `io::Error` into its kind name and message.
    #[must_use]
    pub fn from_io_error(err: &std::io::Error) -> Self {
        let kind = err.kind();
        Self::Io {
            kind: format!("{kind:?}"),
            message: err.to_string(),
        }
    }

    /// Transport failure with no HTTP status (connect, reset, short body).
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            status_code: None,
        }
    }

    /// Unexpected HTTP status.
    pub fn network_with_status(message: impl Into<String>, status_code: u16) -> Self {
        Self::Network {
            message: message.into(),
            status_code: Some(status_code),
        }
    }

    pub fn duplicate_task(id: impl Into<String>) -> Self {
        Self::DuplicateTask { id: id.into() }
    }

    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn pause_unsupported(id: impl Into<String>) -> Self {
        Self::PauseUnsupported { id: id.into() }
    }

    pub fn not_paused(id: impl Into<String>) -> Self {
        Self::NotPaused { id: id.into() }
    }

    pub fn integrity_failed(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::IntegrityFailed {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Anything that fits no other variant (e.g. a crashed worker task).
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Check if this error is transient and a ranged segment may be retried.
    ///
    /// Transport errors without a status and 5xx responses qualify; client
    /// errors (4xx) never do.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Network {
                status_code: None, ..
            } => true,
            Self::Network {
                status_code: Some(code),
                ..
            } => *code >= 500,
            _ => false,
        }
    }

    /// Check if this is a cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Short, stable reason code for UI consumption.
    #[must_use]
    pub const fn reason_code(&self) -> &'static str {
        match self {
            Self::Io { .. } => "io",
            Self::Network { .. } => "network",
            Self::DuplicateTask { .. } => "duplicate_task",
            Self::NotFound { .. } => "not_found",
            Self::InvalidConfig { .. } => "invalid_config",
            Self::InvalidRequest { .. } => "invalid_request",
            Self::PauseUnsupported { .. } => "pause_unsupported",
            Self::NotPaused { .. } => "not_paused",
            Self::Cancelled => "cancelled",
            Self::IntegrityFailed { .. } => "integrity",
            Self::Other { .. } => "other",
        }
    }

    /// Convert to a user-friendly message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Io { message, .. } => format!("File operation failed: {message}"),
            Self::Network {
                message,
                status_code: Some(code),
            } => format!("Network error (HTTP {code}): {message}"),
            Self::Network { message, .. } => format!("Network error: {message}"),
            Self::DuplicateTask { id } => format!("'{id}' is already downloading."),
            Self::NotFound { id } => format!("No active download named '{id}'."),
            Self::InvalidConfig { message } => format!("Downloader misconfigured: {message}"),
            Self::InvalidRequest { message } => format!("Cannot start download: {message}"),
            Self::PauseUnsupported { .. } => {
                "This host does not support resuming, so the download cannot be paused."
                    .to_string()
            }
            Self::NotPaused { id } => format!("'{id}' is not paused."),
            Self::Cancelled => "Download was cancelled.".to_string(),
            Self::IntegrityFailed { .. } => {
                "File integrity check failed. The download may be corrupted.".to_string()
            }
            Self::Other { message } => message.clone(),
        }
    }
}

impl From<std::io::Error> for DownloadError {
    fn from(err: std::io::Error) -> Self {
        Self::from_io_error(&err)
    }
}

/// Convenience result type for download operations.
pub type DownloadResult<T> = Result<T, DownloadError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = DownloadError::from_io_error(&io_err);

        match err {
            DownloadError::Io { kind, message } => {
                assert_eq!(kind, "NotFound");
                assert!(message.contains("file not found"));
            }
            _ => panic!("Expected Io variant"),
        }
    }

    #[test]
    fn test_error_serialization() {
        let err = DownloadError::network_with_status("bad gateway", 502);
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("502"));

        let parsed: DownloadError = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, err);
    }

    #[test]
    fn test_is_transient() {
        assert!(DownloadError::network("connection reset").is_transient());
        assert!(DownloadError::network_with_status("unavailable", 503).is_transient());
        assert!(!DownloadError::network_with_status("forbidden", 403).is_transient());
        assert!(!DownloadError::Cancelled.is_transient());
        assert!(!DownloadError::io("Other", "disk full").is_transient());
    }

    #[test]
    fn test_reason_codes_are_stable() {
        assert_eq!(
            DownloadError::duplicate_task("42").reason_code(),
            "duplicate_task"
        );
        assert_eq!(DownloadError::network("x").reason_code(), "network");
        assert_eq!(DownloadError::Cancelled.reason_code(), "cancelled");
    }

    #[test]
    fn test_user_messages() {
        let err = DownloadError::network_with_status("gone", 410);
        assert!(err.user_message().contains("410"));
        assert!(
            DownloadError::duplicate_task("game")
                .user_message()
                .contains("already")
        );
    }
}
