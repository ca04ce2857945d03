//! Settings domain types and validation.
//!
//! Pure domain types; persistence lives in the runtime crate.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::paths::PathError;

/// Application settings persisted as `settings.json` under the data root.
///
/// All fields are optional so partial files and older versions load cleanly.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// User-selected download root (`downloadPath`).
    pub download_path: Option<String>,
}

impl Settings {
    /// Apply a partial update; `Some` fields replace the current value.
    pub fn merge(&mut self, update: &SettingsUpdate) {
        if let Some(ref path) = update.download_path {
            self.download_path.clone_from(path);
        }
    }
}

/// Partial settings update.
///
/// The outer `Option` means "leave unchanged"; the inner one clears the value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct SettingsUpdate {
    /// New download root, or `Some(None)` to reset to the default.
    pub download_path: Option<Option<String>>,
}

/// Settings validation and persistence errors.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Download path cannot be empty")]
    EmptyDownloadPath,

    #[error(transparent)]
    Path(#[from] PathError),

    #[error("Failed to parse settings file: {0}")]
    Parse(String),
}

/// Validate settings before they are persisted.
pub fn validate_settings(settings: &Settings) -> Result<(), SettingsError> {
    if let Some(ref path) = settings.download_path {
        if path.trim().is_empty() {
            return Err(SettingsError::EmptyDownloadPath);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_download_path_key() {
        let settings = Settings {
            download_path: Some("/games".to_string()),
        };
        let json = serde_json::to_value(&settings).unwrap();
        assert_eq!(json["downloadPath"], "/games");

        let parsed: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, Settings::default());
    }

    #[test]
    fn merge_replaces_and_clears() {
        let mut settings = Settings::default();
        settings.merge(&SettingsUpdate {
            download_path: Some(Some("/a".to_string())),
        });
        assert_eq!(settings.download_path.as_deref(), Some("/a"));

        settings.merge(&SettingsUpdate::default());
        assert_eq!(settings.download_path.as_deref(), Some("/a"));

        settings.merge(&SettingsUpdate {
            download_path: Some(None),
        });
        assert_eq!(settings.download_path, None);
    }

    #[test]
    fn rejects_blank_download_path() {
        let settings = Settings {
            download_path: Some("  ".to_string()),
        };
        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::EmptyDownloadPath)
        ));
        assert!(validate_settings(&Settings::default()).is_ok());
    }
}
