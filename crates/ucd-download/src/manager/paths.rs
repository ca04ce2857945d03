//! Request resolution.
//!
//! Turns a caller's `DownloadRequest` into a fully specified task: validated
//! URL, file name, destination under the download root, identity and
//! effective tuning knobs.

use std::path::{Path, PathBuf};

use url::Url;

use ucd_core::{
    DownloadError, DownloadManagerConfig, DownloadRequest, InstallLayout, TaskId, slugify,
};

/// File name used when neither the request nor the URL provides one.
const FALLBACK_FILENAME: &str = "download.bin";

/// A request with every default filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRequest {
    /// Task identity.
    pub task_id: TaskId,
    /// Validated source URL.
    pub url: String,
    /// File name component of `destination`.
    pub filename: String,
    /// Where bytes are written while downloading.
    pub destination: PathBuf,
    /// Download root the task belongs to.
    pub root: PathBuf,
    /// Folder name used under `installing/` and `installed/`.
    pub slug: String,
    /// Catalog id.
    pub appid: Option<String>,
    /// Display name.
    pub name: Option<String>,
    /// Effective concurrency cap.
    pub concurrency: usize,
    /// Effective minimum segment size.
    pub min_chunk_bytes: u64,
    /// Move into `installed/` on success.
    pub finalize: bool,
}

impl ResolvedRequest {
    /// Resolve `request` against `root` and the engine defaults.
    pub fn resolve(
        request: DownloadRequest,
        root: &Path,
        config: &DownloadManagerConfig,
    ) -> Result<Self, DownloadError> {
        let url = parse_source_url(&request.url)?;
        let appid = non_blank(request.appid);
        let name = non_blank(request.name);
        let explicit_id = non_blank(request.task_id);

        let filename = match non_blank(request.filename) {
            Some(name) => Path::new(&name)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    DownloadError::invalid_request(format!("'{name}' is not a file name"))
                })?,
            None => filename_from_url(&url),
        };

        let slug_source = name
            .as_deref()
            .or(appid.as_deref())
            .or(explicit_id.as_deref())
            .unwrap_or_else(|| file_stem(&filename));
        let slug = slugify(slug_source);

        let destination = request.destination.unwrap_or_else(|| {
            InstallLayout::new(root)
                .installing_dir(&slug)
                .join(&filename)
        });
        let task_id = TaskId::derive(explicit_id.as_deref(), appid.as_deref(), &destination);

        let concurrency = request.concurrency.unwrap_or(config.max_concurrency);
        if concurrency == 0 {
            return Err(DownloadError::invalid_config("concurrency must be at least 1"));
        }
        let min_chunk_bytes = request.min_chunk_bytes.unwrap_or(config.min_chunk_bytes);
        if min_chunk_bytes == 0 {
            return Err(DownloadError::invalid_config("min_chunk_bytes must be at least 1"));
        }

        Ok(Self {
            task_id,
            url: url.into(),
            filename,
            destination,
            root: root.to_path_buf(),
            slug,
            appid,
            name,
            concurrency,
            min_chunk_bytes,
            finalize: request.finalize,
        })
    }
}

/// Parse and check that the URL is `http` or `https`.
pub fn parse_source_url(raw: &str) -> Result<Url, DownloadError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| DownloadError::invalid_request(format!("invalid URL '{raw}': {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(DownloadError::invalid_request(format!(
            "unsupported URL scheme '{other}'"
        ))),
    }
}

/// Last non-empty path segment, percent-decoded.
fn filename_from_url(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
        .map(|segment| {
            urlencoding::decode(segment).map_or_else(|_| segment.to_string(), |s| s.into_owned())
        })
        .and_then(|decoded| {
            Path::new(&decoded)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| FALLBACK_FILENAME.to_string())
}

fn file_stem(filename: &str) -> &str {
    filename.split('.').next().unwrap_or(filename)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
