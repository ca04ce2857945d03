//! Installed index: the derived summary of every manifest under a root.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One title in the installed index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    /// Catalog id.
    pub appid: String,
    /// Display name (falls back to the folder name).
    pub name: String,
    /// Folder name under the installed root.
    pub folder_name: String,
    /// Absolute path of the title's manifest.
    pub manifest_path: PathBuf,
}

/// The whole index, serialized as a bare JSON array.
///
/// Always rebuilt from the manifests on disk; never patched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstalledIndex {
    /// Entries ordered by folder name.
    pub entries: Vec<IndexEntry>,
}

impl InstalledIndex {
    /// Build an index, sorting entries by folder name for stable output.
    pub fn new(mut entries: Vec<IndexEntry>) -> Self {
        entries.sort_by(|a, b| a.folder_name.cmp(&b.folder_name));
        Self { entries }
    }

    /// Find the entry for a catalog id.
    pub fn find(&self, appid: &str) -> Option<&IndexEntry> {
        self.entries.iter().find(|e| e.appid == appid)
    }

    /// Number of indexed titles.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no titles are indexed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
