//! Collision-free file names.

use std::path::{Path, PathBuf};

use chrono::Utc;

/// Highest numeric suffix tried before falling back to a timestamp.
pub const MAX_NUMBERED_SUFFIX: u32 = 999;

/// Pick a path in `dir` for `file_name` that does not exist yet.
///
/// `game.zip` becomes `game-1.zip`, `game-2.zip`, … up to
/// [`MAX_NUMBERED_SUFFIX`], then `game-<unix millis>.zip`. Never returns a
/// path that currently exists, so callers never overwrite silently.
pub fn resolve_unique_path(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }

    let as_path = Path::new(file_name);
    let stem = as_path
        .file_stem()
        .map_or_else(|| file_name.to_string(), |s| s.to_string_lossy().into_owned());
    let ext = as_path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    for n in 1..=MAX_NUMBERED_SUFFIX {
        let candidate = dir.join(format!("{stem}-{n}{ext}"));
        if !candidate.exists() {
            return candidate;
        }
    }

    dir.join(format!("{stem}-{}{ext}", Utc::now().timestamp_millis()))
}
