//! Installed manifest and file records.
//!
//! One manifest per installed title, stored as `installed.json` next to the
//! title's files. File records are append-only and unique by path.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::services::checksum::metadata_hash;

/// One file belonging to an installed title.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    /// Absolute path of the file on disk.
    pub path: PathBuf,
    /// File name component.
    pub name: String,
    /// Size in bytes at the time the record was added.
    #[serde(rename = "size", default)]
    pub size_bytes: u64,
    /// Lowercase hex SHA-256, absent when hashing failed.
    #[serde(default)]
    pub checksum: Option<String>,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub added_at: i64,
}

impl FileRecord {
    /// Build a record for `path`, naming it after its last component.
    pub fn new(path: impl Into<PathBuf>, size_bytes: u64, checksum: Option<String>, added_at: i64) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path,
            name,
            size_bytes,
            checksum,
            added_at,
        }
    }
}

/// Per-title manifest.
///
/// JSON shape: `{ appid, name, metadata, metadataHash, files, installedAt }`.
/// `installedAt` is `null` while the title is still provisional.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstalledManifest {
    /// Catalog id.
    #[serde(default, deserialize_with = "string_or_number")]
    pub appid: Option<String>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Opaque author-supplied metadata.
    #[serde(default)]
    pub metadata: Option<Value>,
    /// SHA-256 of the serialized metadata.
    #[serde(default)]
    pub metadata_hash: Option<String>,
    /// Files, unique by path, in insertion order.
    #[serde(default)]
    pub files: Vec<FileRecord>,
    /// First successful install, milliseconds since the Unix epoch.
    #[serde(default)]
    pub installed_at: Option<i64>,
}

impl InstalledManifest {
    /// Merge catalog identity into the manifest.
    ///
    /// Fields already present are kept unless `overwrite` is set.
    pub fn merge_identity(&mut self, appid: Option<&str>, name: Option<&str>, overwrite: bool) {
        if let Some(appid) = appid.filter(|s| !s.is_empty()) {
            if overwrite || self.appid.is_none() {
                self.appid = Some(appid.to_string());
            }
        }
        if let Some(name) = name.filter(|s| !s.is_empty()) {
            if overwrite || self.name.is_none() {
                self.name = Some(name.to_string());
            }
        }
    }

    /// Replace the metadata object and recompute its hash.
    pub fn set_metadata(&mut self, metadata: Value) {
        self.metadata_hash = Some(metadata_hash(&metadata));
        self.metadata = Some(metadata);
    }

    /// Set one key inside the metadata object, creating the object if needed.
    ///
    /// The hash is recomputed.
    pub fn set_metadata_field(&mut self, key: &str, value: Value) {
        let mut metadata = match self.metadata.take() {
            Some(Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        };
        metadata.insert(key.to_string(), value);
        self.set_metadata(Value::Object(metadata));
    }

    /// Append a file record unless one with the same path exists.
    ///
    /// Returns `true` when the record was added.
    pub fn add_file(&mut self, record: FileRecord) -> bool {
        if self.has_file(&record.path) {
            return false;
        }
        self.files.push(record);
        true
    }

    /// Whether a record for `path` exists.
    pub fn has_file(&self, path: &Path) -> bool {
        self.files.iter().any(|f| f.path == path)
    }

    /// Stamp `installedAt` on first install only.
    pub const fn mark_installed(&mut self, now_ms: i64) {
        if self.installed_at.is_none() {
            self.installed_at = Some(now_ms);
        }
    }
}

/// Catalog ids arrive as strings or numbers depending on the source.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_identity_is_first_write_wins() {
        let mut manifest = InstalledManifest::default();
        manifest.merge_identity(Some("100"), Some("Hades"), false);
        manifest.merge_identity(Some("200"), Some("Hades II"), false);
        assert_eq!(manifest.appid.as_deref(), Some("100"));
        assert_eq!(manifest.name.as_deref(), Some("Hades"));

        manifest.merge_identity(None, Some("Hades II"), true);
        assert_eq!(manifest.appid.as_deref(), Some("100"));
        assert_eq!(manifest.name.as_deref(), Some("Hades II"));
    }

    #[test]
    fn add_file_dedupes_by_path() {
        let mut manifest = InstalledManifest::default();
        assert!(manifest.add_file(FileRecord::new("/g/a.zip", 1, None, 1)));
        assert!(!manifest.add_file(FileRecord::new("/g/a.zip", 2, Some("x".into()), 2)));
        assert!(manifest.add_file(FileRecord::new("/g/b.zip", 3, None, 3)));
        assert_eq!(manifest.files.len(), 2);
        assert_eq!(manifest.files[0].size_bytes, 1);
    }

    #[test]
    fn metadata_hash_tracks_metadata() {
        let mut manifest = InstalledManifest::default();
        manifest.set_metadata(json!({"name": "Hades"}));
        let first = manifest.metadata_hash.clone().unwrap();

        manifest.set_metadata_field("localImage", json!("/tmp/image.png"));
        let second = manifest.metadata_hash.clone().unwrap();
        assert_ne!(first, second);
        assert_eq!(manifest.metadata.as_ref().unwrap()["name"], "Hades");
    }

    #[test]
    fn installed_at_is_set_once() {
        let mut manifest = InstalledManifest::default();
        manifest.mark_installed(10);
        manifest.mark_installed(20);
        assert_eq!(manifest.installed_at, Some(10));
    }

    #[test]
    fn reads_numeric_appid_and_wire_field_names() {
        let manifest: InstalledManifest = serde_json::from_value(json!({
            "appid": 1_145_360,
            "name": "Hades",
            "files": [{"path": "/g/hades.zip", "name": "hades.zip", "size": 5, "checksum": null, "addedAt": 7}],
            "installedAt": null
        }))
        .unwrap();
        assert_eq!(manifest.appid.as_deref(), Some("1145360"));
        assert_eq!(manifest.files[0].size_bytes, 5);
        assert_eq!(manifest.installed_at, None);

        let json = serde_json::to_value(&manifest).unwrap();
        assert!(json.get("metadataHash").is_some());
        assert_eq!(json["files"][0]["size"], 5);
        assert_eq!(json["files"][0]["addedAt"], 7);
    }
}
