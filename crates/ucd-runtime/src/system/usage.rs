//! Recursive directory size.

use std::fs;
use std::path::{Path, PathBuf};

/// Total size of regular files under `path`.
///
/// Symlinks are never followed and unreadable entries are skipped. A file
/// path returns its own size; a missing path returns 0.
pub fn directory_usage(path: &Path) -> u64 {
    let Ok(meta) = fs::symlink_metadata(path) else {
        return 0;
    };
    if meta.is_file() {
        return meta.len();
    }
    if !meta.is_dir() {
        return 0;
    }

    let mut total = 0u64;
    let mut pending: Vec<PathBuf> = vec![path.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let Ok(entries) = fs::read_dir(&dir) else {
            tracing::debug!(path = %dir.display(), "Skipping unreadable directory");
            continue;
        };
        for entry in entries.flatten() {
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            if file_type.is_dir() {
                pending.push(entry.path());
            } else if file_type.is_file() {
                if let Ok(meta) = entry.metadata() {
                    total = total.saturating_add(meta.len());
                }
            }
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn sums_nested_files() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a"), vec![1u8; 100]).unwrap();
        fs::create_dir_all(tmp.path().join("x/y")).unwrap();
        fs::write(tmp.path().join("x/b"), vec![1u8; 20]).unwrap();
        fs::write(tmp.path().join("x/y/c"), vec![1u8; 3]).unwrap();

        assert_eq!(directory_usage(tmp.path()), 123);
    }

    #[test]
    fn file_and_missing_paths() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("f");
        fs::write(&file, vec![0u8; 42]).unwrap();

        assert_eq!(directory_usage(&file), 42);
        assert_eq!(directory_usage(&tmp.path().join("nope")), 0);
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_not_followed() {
        let tmp = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("big"), vec![0u8; 4096]).unwrap();
        fs::write(tmp.path().join("small"), vec![0u8; 10]).unwrap();
        std::os::unix::fs::symlink(outside.path(), tmp.path().join("link")).unwrap();
        std::os::unix::fs::symlink(outside.path().join("big"), tmp.path().join("big-link"))
            .unwrap();

        assert_eq!(directory_usage(tmp.path()), 10);
    }
}
