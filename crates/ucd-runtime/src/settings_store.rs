//! `settings.json` persistence and download-root resolution.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use ucd_core::{
    DownloadRootProvider, PathError, Settings, SettingsError, SettingsUpdate, data_root,
    default_download_root, ensure_directory, normalize_user_path, validate_settings,
    verify_writable,
};

/// File name of the settings document under the data root.
pub const SETTINGS_FILE: &str = "settings.json";

/// How the download root was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadRootSource {
    /// The caller passed an explicit path (e.g. `--root`).
    Explicit,
    /// The path came from `downloadPath` in `settings.json`.
    Settings,
    /// Fallback default (`~/Downloads/UnionCrax.Direct`).
    Default,
}

/// Resolution result for the download root.
#[derive(Debug, Clone)]
pub struct DownloadRootResolution {
    /// The resolved absolute path.
    pub path: PathBuf,
    /// How the path was determined.
    pub source: DownloadRootSource,
}

/// Settings persisted as JSON.
///
/// Writes go through a temp file and a rename, serialized by an async lock so
/// concurrent updates never interleave.
#[derive(Debug)]
pub struct JsonSettingsStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonSettingsStore {
    /// Store backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Store at `<data root>/settings.json`.
    pub fn open_default() -> Result<Self, SettingsError> {
        Ok(Self::new(data_root()?.join(SETTINGS_FILE)))
    }

    /// Location of the settings file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file_error(&self, source: io::Error) -> SettingsError {
        SettingsError::Path(PathError::SettingsFile {
            path: self.path.clone(),
            source,
        })
    }

    /// Current settings; a missing file yields the defaults.
    pub async fn load(&self) -> Result<Settings, SettingsError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) if raw.trim().is_empty() => Ok(Settings::default()),
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| SettingsError::Parse(e.to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Settings::default()),
            Err(e) => Err(self.file_error(e)),
        }
    }

    /// Apply `update`, validate and persist; returns the saved settings.
    pub async fn update(&self, update: &SettingsUpdate) -> Result<Settings, SettingsError> {
        let _guard = self.write_lock.lock().await;
        let mut settings = self.load().await?;
        settings.merge(update);
        validate_settings(&settings)?;
        self.write(&settings).await?;
        Ok(settings)
    }

    async fn write(&self, settings: &Settings) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            ensure_directory(parent)?;
        }
        let json = serde_json::to_string_pretty(settings)
            .map_err(|e| SettingsError::Parse(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| self.file_error(e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.file_error(e))
    }

    /// Resolve the download root without creating it.
    ///
    /// Resolution order:
    /// 1. `explicit` (highest priority)
    /// 2. `downloadPath` from the settings file
    /// 3. `default_download_root()`
    pub async fn resolve_download_root(
        &self,
        explicit: Option<&str>,
    ) -> Result<DownloadRootResolution, SettingsError> {
        if let Some(raw) = explicit {
            return Ok(DownloadRootResolution {
                path: normalize_user_path(raw)?,
                source: DownloadRootSource::Explicit,
            });
        }

        if let Some(saved) = self.load().await?.download_path {
            if !saved.trim().is_empty() {
                return Ok(DownloadRootResolution {
                    path: normalize_user_path(&saved)?,
                    source: DownloadRootSource::Settings,
                });
            }
        }

        Ok(DownloadRootResolution {
            path: default_download_root(),
            source: DownloadRootSource::Default,
        })
    }
}

#[async_trait]
impl DownloadRootProvider for JsonSettingsStore {
    async fn download_root(&self) -> Result<PathBuf, SettingsError> {
        let resolved = self.resolve_download_root(None).await?;
        ensure_directory(&resolved.path)?;
        Ok(resolved.path)
    }

    async fn set_download_root(&self, path: &str) -> Result<PathBuf, SettingsError> {
        if path.trim().is_empty() {
            return Err(SettingsError::EmptyDownloadPath);
        }
        let root = normalize_user_path(path)?;
        ensure_directory(&root)?;
        verify_writable(&root)?;
        self.update(&SettingsUpdate {
            download_path: Some(Some(root.to_string_lossy().into_owned())),
        })
        .await?;
        tracing::info!(root = %root.display(), "Download root changed");
        Ok(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(tmp: &TempDir) -> JsonSettingsStore {
        JsonSettingsStore::new(tmp.path().join("data").join(SETTINGS_FILE))
    }

    #[tokio::test]
    async fn missing_file_loads_defaults() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        assert_eq!(store.load().await.unwrap(), Settings::default());

        let resolved = store.resolve_download_root(None).await.unwrap();
        assert_eq!(resolved.source, DownloadRootSource::Default);
    }

    #[tokio::test]
    async fn set_root_persists_and_creates() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("games");
        let store = store(&tmp);

        let root = store
            .set_download_root(target.to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(root, target);
        assert!(target.is_dir());

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["downloadPath"], target.to_str().unwrap());

        let reopened = JsonSettingsStore::new(store.path());
        assert_eq!(reopened.download_root().await.unwrap(), target);
        let resolved = reopened.resolve_download_root(None).await.unwrap();
        assert_eq!(resolved.source, DownloadRootSource::Settings);
    }

    #[tokio::test]
    async fn empty_root_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        assert!(matches!(
            store.set_download_root("   ").await,
            Err(SettingsError::EmptyDownloadPath)
        ));
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn explicit_root_wins() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        store
            .set_download_root(tmp.path().join("saved").to_str().unwrap())
            .await
            .unwrap();

        let explicit = tmp.path().join("override");
        let resolved = store
            .resolve_download_root(Some(explicit.to_str().unwrap()))
            .await
            .unwrap();
        assert_eq!(resolved.path, explicit);
        assert_eq!(resolved.source, DownloadRootSource::Explicit);
    }

    #[tokio::test]
    async fn corrupt_file_is_a_parse_error() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "{ not json").unwrap();

        assert!(matches!(store.load().await, Err(SettingsError::Parse(_))));
    }

    #[tokio::test]
    async fn update_can_clear_the_root() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        store
            .set_download_root(tmp.path().join("games").to_str().unwrap())
            .await
            .unwrap();

        let cleared = store
            .update(&SettingsUpdate {
                download_path: Some(None),
            })
            .await
            .unwrap();
        assert_eq!(cleared.download_path, None);
        assert_eq!(store.load().await.unwrap(), Settings::default());
    }
}
