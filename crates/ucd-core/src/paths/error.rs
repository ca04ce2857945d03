//! Errors from root resolution and directory handling.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Why a data root, download root or one of its folders is unusable.
#[derive(Debug, Error)]
pub enum PathError {
    #[error("No home directory for the current user")]
    NoHomeDir,

    /// The platform has no config directory to hold the data root.
    #[error("No config directory for the data root (set UCD_DATA_DIR)")]
    NoConfigDir,

    #[error("{0} exists but is not a directory")]
    NotADirectory(PathBuf),

    #[error("Cannot create {path}: {source}")]
    CreateFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{path} is not writable: {source}")]
    NotWritable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A blank download root or user path.
    #[error("Path is empty")]
    EmptyPath,

    /// `settings.json` could not be read or replaced.
    #[error("Settings file {path}: {source}")]
    SettingsFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A relative path could not be anchored to the working directory.
    #[error("Cannot resolve {path}: {source}")]
    RelativeBase {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
