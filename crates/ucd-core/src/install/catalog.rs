//! Catalog metadata supplied by the UI when a download is requested.

use serde::{Deserialize, Serialize};

/// The subset of catalog data the engine needs to seed a provisional manifest.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    /// Catalog id.
    pub appid: String,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Remote preview image.
    #[serde(default, alias = "image")]
    pub image_url: Option<String>,
}

impl CatalogEntry {
    /// Create an entry with only an id.
    pub fn new(appid: impl Into<String>) -> Self {
        Self {
            appid: appid.into(),
            ..Self::default()
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the preview image URL.
    #[must_use]
    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    /// Name used to derive the on-disk folder: display name, else the id.
    pub fn folder_source(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.appid)
    }
}
