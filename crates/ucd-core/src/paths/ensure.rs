//! Directory creation and verification utilities.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use super::error::PathError;

const WRITE_MARKER: &str = ".ucd_write_test";

/// Make sure `path` is a directory, creating it and its parents when missing.
pub fn ensure_directory(path: &Path) -> Result<(), PathError> {
    if path.exists() {
        if !path.is_dir() {
            return Err(PathError::NotADirectory(path.to_path_buf()));
        }
        return Ok(());
    }

    fs::create_dir_all(path).map_err(|source| PathError::CreateFailed {
        path: path.to_path_buf(),
        source,
    })
}

/// Check that a download root accepts new files.
///
/// Writes and removes a marker file; a failure to remove it is ignored.
pub fn verify_writable(path: &Path) -> Result<(), PathError> {
    let marker = path.join(WRITE_MARKER);
    let not_writable = |source| PathError::NotWritable {
        path: path.to_path_buf(),
        source,
    };

    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&marker)
        .map_err(not_writable)?;
    file.write_all(b"ucd").map_err(not_writable)?;
    drop(file);

    let _ = fs::remove_file(&marker);
    Ok(())
}
