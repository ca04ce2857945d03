//! Download events - the typed records the orchestrator publishes.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::errors::DownloadError;
use super::types::{TaskId, TaskStatus};

/// Stable failure description attached to `failed` records.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFailure {
    /// Short reason code (see `DownloadError::reason_code`).
    pub code: String,
    /// Human-readable diagnostic.
    pub message: String,
}

impl From<&DownloadError> for TaskFailure {
    fn from(err: &DownloadError) -> Self {
        Self {
            code: err.reason_code().to_string(),
            message: err.to_string(),
        }
    }
}

/// Snapshot of one task as seen by subscribers.
///
/// Serialized in camelCase because the UI layer consumes it verbatim.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadUpdate {
    /// Task identity.
    pub task_id: TaskId,
    /// Current status.
    pub status: TaskStatus,
    /// Bytes received so far (monotonic until a terminal status).
    pub received_bytes: u64,
    /// Total size, `None` until known.
    pub total_bytes: Option<u64>,
    /// Smoothed throughput in bytes per second.
    pub speed_bps: f64,
    /// Estimated seconds remaining, `None` when unknown.
    pub eta_seconds: Option<f64>,
    /// Completion percentage (0-100), `None` when the total is unknown.
    pub percent: Option<f64>,
    /// File name being written.
    pub filename: String,
    /// Where the bytes are being written (or were moved to).
    pub save_path: PathBuf,
    /// Source URL.
    pub url: String,
    /// Associated catalog id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appid: Option<String>,
    /// Associated display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Failure details when status is `failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<TaskFailure>,
}

/// Single discriminated union for all download events.
///
/// ```typescript
/// type DownloadEvent =
///   | { type: "status_changed"; update: DownloadUpdate }
///   | { type: "progress"; update: DownloadUpdate }
///   | { type: "installed"; taskId: string; finalPath: string; manifestPath: string }
///   | { type: "install_failed"; taskId: string; error: TaskFailure };
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DownloadEvent {
    /// A task changed lifecycle status.
    StatusChanged {
        /// Full snapshot at the moment of the transition.
        update: DownloadUpdate,
    },

    /// Byte-level progress for a running task.
    Progress {
        /// Full snapshot including speed and ETA.
        update: DownloadUpdate,
    },

    /// The finished file was moved into the installed root.
    Installed {
        /// Task identity.
        #[serde(rename = "taskId")]
        task_id: TaskId,
        /// Associated catalog id.
        #[serde(skip_serializing_if = "Option::is_none")]
        appid: Option<String>,
        /// Final (de-duplicated) file location.
        #[serde(rename = "finalPath")]
        final_path: PathBuf,
        /// Manifest that will record the file.
        #[serde(rename = "manifestPath")]
        manifest_path: PathBuf,
    },

    /// The finished file could not be moved; it stays in `installing/`.
    InstallFailed {
        /// Task identity.
        #[serde(rename = "taskId")]
        task_id: TaskId,
        /// Why the move failed.
        error: TaskFailure,
    },
}

impl DownloadEvent {
    /// Create a status change event.
    pub const fn status(update: DownloadUpdate) -> Self {
        Self::StatusChanged { update }
    }

    /// Create a progress event.
    pub const fn progress(update: DownloadUpdate) -> Self {
        Self::Progress { update }
    }

    /// Get the task ID from any event type.
    #[must_use]
    pub const fn task_id(&self) -> &TaskId {
        match self {
            Self::StatusChanged { update } | Self::Progress { update } => &update.task_id,
            Self::Installed { task_id, .. } | Self::InstallFailed { task_id, .. } => task_id,
        }
    }

    /// The embedded snapshot, for status and progress events.
    #[must_use]
    pub const fn update(&self) -> Option<&DownloadUpdate> {
        match self {
            Self::StatusChanged { update } | Self::Progress { update } => Some(update),
            Self::Installed { .. } | Self::InstallFailed { .. } => None,
        }
    }

    /// Get the event name for wire protocols.
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::StatusChanged { .. } => "download:status",
            Self::Progress { .. } => "download:progress",
            Self::Installed { .. } => "download:installed",
            Self::InstallFailed { .. } => "download:install_failed",
        }
    }
}
