//! Platform-specific root resolution.
//!
//! Two roots matter to the application: the data root (settings and other
//! small state) and the download root (where titles are installed). The
//! download root is user-configurable; this module only supplies its default.

use std::env;
use std::fs;
use std::path::PathBuf;

use super::error::PathError;

/// Folder name used under every platform directory.
pub const APP_DIR_NAME: &str = "UnionCrax.Direct";

/// Environment variable that overrides the data root.
pub const DATA_DIR_ENV: &str = "UCD_DATA_DIR";

/// Get the root directory for application data (settings).
///
/// Resolution order:
/// 1. `UCD_DATA_DIR` environment variable
/// 2. System config directory (e.g., `~/.config/UnionCrax.Direct`)
///
/// The directory is created when missing.
pub fn data_root() -> Result<PathBuf, PathError> {
    let root = match env::var(DATA_DIR_ENV) {
        Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
        _ => dirs::config_dir()
            .ok_or(PathError::NoConfigDir)?
            .join(APP_DIR_NAME),
    };

    if !root.exists() {
        fs::create_dir_all(&root).map_err(|source| PathError::CreateFailed {
            path: root.clone(),
            source,
        })?;
    }

    Ok(root)
}

/// Default download root used when the user has not chosen one.
///
/// `~/Downloads/UnionCrax.Direct`, falling back to the home directory and
/// finally the working directory on systems without either.
pub fn default_download_root() -> PathBuf {
    dirs::download_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

/// Normalize a user-provided path, expanding `~` and making it absolute.
pub fn normalize_user_path(raw: &str) -> Result<PathBuf, PathError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PathError::EmptyPath);
    }

    let expanded = if trimmed.starts_with("~/") || trimmed == "~" {
        let home = dirs::home_dir().ok_or(PathError::NoHomeDir)?;
        if trimmed == "~" {
            home
        } else {
            home.join(trimmed.trim_start_matches("~/"))
        }
    } else {
        PathBuf::from(trimmed)
    };

    if expanded.is_absolute() {
        Ok(expanded)
    } else {
        env::current_dir()
            .map(|cwd| cwd.join(expanded))
            .map_err(|source| PathError::RelativeBase {
                path: PathBuf::from(trimmed),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::test_utils::{ENV_LOCK, EnvVarGuard};
    use tempfile::TempDir;

    #[test]
    fn data_root_honours_env_override() {
        let _lock = ENV_LOCK.lock().unwrap();
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("data");
        let _env = EnvVarGuard::set(DATA_DIR_ENV, target.to_str().unwrap());

        let root = data_root().unwrap();
        assert_eq!(root, target);
        assert!(root.is_dir());
    }

    #[test]
    fn default_download_root_ends_with_app_dir() {
        assert!(default_download_root().ends_with(APP_DIR_NAME));
    }

    #[test]
    fn normalize_rejects_empty() {
        assert!(matches!(
            normalize_user_path("   "),
            Err(PathError::EmptyPath)
        ));
    }

    #[test]
    fn normalize_makes_relative_absolute() {
        let path = normalize_user_path("games").unwrap();
        assert!(path.is_absolute());
        assert!(path.ends_with("games"));
    }
}
