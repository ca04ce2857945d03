//! Manifest store: the on-disk side of install bookkeeping.
//!
//! Owns the `installing/` and `installed/` trees under one download root.
//! Every directory scan and JSON write runs on the blocking pool, and all
//! manifest read-modify-write cycles are serialized by a lock shared between
//! clones of the store.
//! The installed index is always rebuilt from scratch, never patched, so a
//! failed rebuild heals on the next one.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::install::{
    CatalogEntry, FileRecord, IndexEntry, InstallError, InstalledIndex, InstalledManifest,
};
use crate::paths::{
    InstallLayout, MANIFEST_FILE, ensure_directory, manifest_path, resolve_unique_path, slugify,
};
use crate::ports::PreviewFetcher;

use super::checksum::{sha256_bytes, sha256_file};

/// Longest extension kept for a cached preview image.
const MAX_IMAGE_EXT_LEN: usize = 8;

/// Suffix given to an installed manifest that could not be parsed.
const CORRUPT_SUFFIX: &str = ".corrupt";

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Serializes manifest read-modify-write cycles for one download root.
#[derive(Clone, Default)]
struct ManifestLock(Arc<Mutex<()>>);

impl ManifestLock {
    fn acquire(&self) -> MutexGuard<'_, ()> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

async fn run_blocking<T, F>(f: F) -> Result<T, InstallError>
where
    F: FnOnce() -> Result<T, InstallError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| InstallError::Task(e.to_string()))?
}

/// Where a finished download ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizedFile {
    /// De-duplicated location inside the installed folder.
    pub final_path: PathBuf,
    /// `<root>/installed/<slug>`
    pub title_dir: PathBuf,
    /// `<root>/installed/<slug>/installed.json`
    pub manifest_path: PathBuf,
    /// Folder name shared by the installing and installed trees.
    pub slug: String,
}

/// Result of writing a provisional manifest.
#[derive(Debug)]
pub struct ProvisionalSave {
    /// `<root>/installing/<slug>/installed.json`
    pub manifest_path: PathBuf,
    /// The manifest as written.
    pub manifest: InstalledManifest,
    /// Background preview fetch, when an image URL and a fetcher were available.
    pub preview: Option<JoinHandle<()>>,
}

/// Reads and writes manifests and the installed index for one download root.
///
/// Clones share one manifest lock. Separate stores for the same root do not,
/// so a process should keep one store per root and clone it.
#[derive(Clone)]
pub struct ManifestStore {
    layout: InstallLayout,
    lock: ManifestLock,
    preview: Option<Arc<dyn PreviewFetcher>>,
}

impl ManifestStore {
    /// Create a store for `root`. Directories are created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            layout: InstallLayout::new(root),
            lock: ManifestLock::default(),
            preview: None,
        }
    }

    /// Whether `other` serializes its writes with this store.
    pub fn shares_lock_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.lock.0, &other.lock.0)
    }

    /// Enable preview image caching for provisional manifests.
    #[must_use]
    pub fn with_preview_fetcher(mut self, fetcher: Arc<dyn PreviewFetcher>) -> Self {
        self.preview = Some(fetcher);
        self
    }

    /// The layout this store writes into.
    pub const fn layout(&self) -> &InstallLayout {
        &self.layout
    }

    /// Move a finished file from `installing/` into `installed/<slug>/`.
    ///
    /// The target name is de-duplicated so nothing is overwritten. When the
    /// rename fails the source file is left untouched.
    pub async fn finalize(&self, source: &Path, slug: &str) -> Result<FinalizedFile, InstallError> {
        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                InstallError::io(
                    source,
                    io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
                )
            })?;
        let title_dir = self.layout.installed_dir(slug);
        let source = source.to_path_buf();
        let slug = slug.to_string();
        let lock = self.lock.clone();

        run_blocking(move || {
            ensure_directory(&title_dir)?;

            // Name resolution and rename must not interleave with another finalize.
            let _guard = lock.acquire();
            let target = resolve_unique_path(&title_dir, &file_name);
            fs::rename(&source, &target).map_err(|e| InstallError::MoveFailed {
                from: source.clone(),
                to: target.clone(),
                source: e,
            })?;

            tracing::info!(
                target: "ucd.install",
                from = %source.display(),
                to = %target.display(),
                "Moved finished download into installed root"
            );

            Ok(FinalizedFile {
                final_path: target,
                manifest_path: manifest_path(&title_dir),
                title_dir,
                slug,
            })
        })
        .await
    }

    /// Record a finalized file in its title manifest and rebuild the index.
    ///
    /// Hashing failures leave the checksum absent. Identity fields already in
    /// the manifest win over `appid`/`name`. Metadata saved provisionally under
    /// `installing/<slug>` is carried over when the installed manifest has none.
    /// Recording the same path twice never adds a second file record. A
    /// manifest that no longer parses is renamed to `installed.json.corrupt`
    /// and recording starts from an empty one.
    pub async fn record_install(
        &self,
        file: &FinalizedFile,
        appid: Option<&str>,
        name: Option<&str>,
    ) -> Result<InstalledManifest, InstallError> {
        let checksum = match sha256_file(&file.final_path).await {
            Ok(sum) => Some(sum),
            Err(e) => {
                tracing::warn!(
                    target: "ucd.install",
                    path = %file.final_path.display(),
                    error = %e,
                    "Checksum failed; recording file without one"
                );
                None
            }
        };

        let layout = self.layout.clone();
        let lock = self.lock.clone();
        let file = file.clone();
        let appid = appid.map(str::to_string);
        let name = name.map(str::to_string);

        run_blocking(move || {
            let _guard = lock.acquire();
            let size = fs::metadata(&file.final_path).map_or(0, |m| m.len());

            let mut manifest = read_or_set_aside(&file.manifest_path)?;
            manifest.merge_identity(appid.as_deref(), name.as_deref(), false);

            if manifest.metadata.is_none() {
                carry_provisional(&layout, &file.slug, &mut manifest);
            }

            let now = now_ms();
            let added = manifest.add_file(FileRecord::new(&file.final_path, size, checksum, now));
            manifest.mark_installed(now);
            write_json_atomic(&file.manifest_path, &manifest)?;

            tracing::info!(
                target: "ucd.install",
                manifest = %file.manifest_path.display(),
                added,
                "Updated installed manifest"
            );

            if let Err(e) = rebuild_index_blocking(&layout) {
                tracing::warn!(target: "ucd.install", error = %e, "Index rebuild failed");
            }
            Ok(manifest)
        })
        .await
    }

    /// Finalize and record in one step.
    pub async fn finalize_and_record(
        &self,
        source: &Path,
        slug: &str,
        appid: Option<&str>,
        name: Option<&str>,
    ) -> Result<(FinalizedFile, InstalledManifest), InstallError> {
        let file = self.finalize(source, slug).await?;
        let manifest = self.record_install(&file, appid, name).await?;
        Ok((file, manifest))
    }

    /// Persist placeholder metadata for a title that is about to download.
    ///
    /// Writes `installing/<slug>/installed.json` with `installedAt: null`,
    /// overwriting identity and metadata from earlier saves. When an image
    /// URL is known (`entry.image_url` or `metadata.image`) and a fetcher is
    /// configured, the image is cached next to the manifest in the background;
    /// fetch failures are ignored.
    pub async fn save_provisional(
        &self,
        entry: &CatalogEntry,
        metadata: Option<Value>,
    ) -> Result<ProvisionalSave, InstallError> {
        let name = entry
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .or_else(|| metadata_string(metadata.as_ref(), "name"))
            .or_else(|| metadata_string(metadata.as_ref(), "gameName"));
        let slug = slugify(name.as_deref().unwrap_or_else(|| entry.folder_source()));
        let dir = self.layout.installing_dir(&slug);
        let path = manifest_path(&dir);

        let manifest = {
            let dir = dir.clone();
            let path = path.clone();
            let appid = entry.appid.clone();
            let lock = self.lock.clone();
            run_blocking(move || {
                ensure_directory(&dir)?;
                let _guard = lock.acquire();
                let mut manifest = read_manifest(&path)
                    .unwrap_or_else(|e| {
                        tracing::warn!(target: "ucd.install", error = %e, "Replacing unreadable provisional manifest");
                        None
                    })
                    .unwrap_or_default();
                manifest.merge_identity(Some(&appid), name.as_deref(), true);
                if let Some(metadata) = metadata {
                    manifest.set_metadata(metadata);
                }
                write_json_atomic(&path, &manifest)?;
                Ok(manifest)
            })
            .await?
        };

        tracing::info!(
            target: "ucd.install",
            appid = %entry.appid,
            manifest = %path.display(),
            "Saved provisional manifest"
        );

        let image_url = entry
            .image_url
            .clone()
            .or_else(|| metadata_string(manifest.metadata.as_ref(), "image"))
            .filter(|url| url.starts_with("http://") || url.starts_with("https://"));

        let preview = match (image_url, self.preview.clone()) {
            (Some(url), Some(fetcher)) => Some(tokio::spawn(cache_preview(
                fetcher,
                self.layout.clone(),
                self.lock.clone(),
                dir,
                path.clone(),
                url,
            ))),
            _ => None,
        };

        Ok(ProvisionalSave {
            manifest_path: path,
            manifest,
            preview,
        })
    }

    /// Rebuild `installed/installed-index.json` from every title manifest.
    pub async fn rebuild_index(&self) -> Result<InstalledIndex, InstallError> {
        let layout = self.layout.clone();
        run_blocking(move || rebuild_index_blocking(&layout)).await
    }

    /// Every installed title, including folders with files but no manifest.
    pub async fn list_installed(&self) -> Result<Vec<InstalledManifest>, InstallError> {
        let root = self.layout.installed_root();
        run_blocking(move || list_titles(&root, true)).await
    }

    /// Provisional manifests of titles still downloading.
    pub async fn list_installing(&self) -> Result<Vec<InstalledManifest>, InstallError> {
        let root = self.layout.installing_root();
        run_blocking(move || list_titles(&root, false)).await
    }

    /// The installed manifest for `appid`, if any.
    pub async fn get_installed(&self, appid: &str) -> Result<Option<InstalledManifest>, InstallError> {
        let root = self.layout.installed_root();
        let appid = appid.to_string();
        run_blocking(move || {
            Ok(list_titles(&root, false)?
                .into_iter()
                .find(|m| m.appid.as_deref() == Some(appid.as_str())))
        })
        .await
    }
}

/// Read a manifest; a missing file is `Ok(None)`.
pub fn read_manifest(path: &Path) -> Result<Option<InstalledManifest>, InstallError> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(InstallError::io(path, e)),
    };
    serde_json::from_slice(&raw)
        .map(Some)
        .map_err(|source| InstallError::Json {
            path: path.to_path_buf(),
            source,
        })
}

/// Read an installed manifest for update.
///
/// A file that exists but does not parse is moved aside so the next write
/// starts clean instead of failing every later install of the title.
fn read_or_set_aside(path: &Path) -> Result<InstalledManifest, InstallError> {
    match read_manifest(path) {
        Ok(manifest) => Ok(manifest.unwrap_or_default()),
        Err(InstallError::Json { source, .. }) => {
            let mut aside = path.as_os_str().to_owned();
            aside.push(CORRUPT_SUFFIX);
            let aside = PathBuf::from(aside);
            match fs::rename(path, &aside) {
                Ok(()) => tracing::warn!(
                    target: "ucd.install",
                    manifest = %path.display(),
                    moved_to = %aside.display(),
                    error = %source,
                    "Corrupt installed manifest set aside"
                ),
                Err(e) => tracing::warn!(
                    target: "ucd.install",
                    manifest = %path.display(),
                    error = %e,
                    "Corrupt installed manifest could not be moved; overwriting"
                ),
            }
            Ok(InstalledManifest::default())
        }
        Err(e) => Err(e),
    }
}

/// Write pretty JSON through a temp file and rename, so readers never see a
/// half-written file and concurrent writers are last-write-wins.
fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), InstallError> {
    let json = serde_json::to_vec_pretty(value).map_err(|source| InstallError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let file_name = path
        .file_name()
        .map_or_else(|| "data".into(), |n| n.to_string_lossy().into_owned());
    let tmp = path.with_file_name(format!(
        ".{file_name}.{}.{}.tmp",
        std::process::id(),
        TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    fs::write(&tmp, &json).map_err(|e| InstallError::io(&tmp, e))?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(InstallError::io(path, e));
    }
    Ok(())
}

fn rebuild_index_blocking(layout: &InstallLayout) -> Result<InstalledIndex, InstallError> {
    let root = layout.installed_root();
    if !root.is_dir() {
        return Ok(InstalledIndex::default());
    }

    let mut entries = Vec::new();
    for (folder_name, dir) in title_dirs(&root)? {
        let path = manifest_path(&dir);
        match read_manifest(&path) {
            Ok(Some(manifest)) => {
                let Some(appid) = manifest.appid else {
                    tracing::debug!(target: "ucd.install", folder = %folder_name, "Manifest has no appid; not indexed");
                    continue;
                };
                entries.push(IndexEntry {
                    appid,
                    name: manifest.name.unwrap_or_else(|| folder_name.clone()),
                    folder_name,
                    manifest_path: path,
                });
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(target: "ucd.install", folder = %folder_name, error = %e, "Skipping unreadable manifest");
            }
        }
    }

    let index = InstalledIndex::new(entries);
    write_json_atomic(&layout.index_path(), &index)?;
    tracing::debug!(target: "ucd.install", titles = index.len(), "Rebuilt installed index");
    Ok(index)
}

/// Immediate subdirectories of `root` as `(folder name, path)`, sorted by name.
fn title_dirs(root: &Path) -> Result<Vec<(String, PathBuf)>, InstallError> {
    let reader = match fs::read_dir(root) {
        Ok(reader) => reader,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(InstallError::io(root, e)),
    };

    let mut dirs: Vec<(String, PathBuf)> = reader
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
        .map(|entry| (entry.file_name().to_string_lossy().into_owned(), entry.path()))
        .collect();
    dirs.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(dirs)
}

/// Manifests of every title folder under `root`.
///
/// With `infer`, folders holding files but no usable manifest yield a record
/// named after the folder.
fn list_titles(root: &Path, infer: bool) -> Result<Vec<InstalledManifest>, InstallError> {
    let mut titles = Vec::new();
    for (folder_name, dir) in title_dirs(root)? {
        match read_manifest(&manifest_path(&dir)) {
            Ok(Some(manifest)) if manifest.appid.is_some() => {
                titles.push(manifest);
                continue;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(target: "ucd.install", folder = %folder_name, error = %e, "Skipping unreadable manifest");
            }
        }

        if infer {
            if let Some(inferred) = infer_manifest(&folder_name, &dir) {
                titles.push(inferred);
            }
        }
    }
    Ok(titles)
}

fn infer_manifest(folder_name: &str, dir: &Path) -> Option<InstalledManifest> {
    let mut files: Vec<FileRecord> = fs::read_dir(dir)
        .ok()?
        .filter_map(Result::ok)
        .filter(|entry| entry.file_name() != MANIFEST_FILE)
        .map(|entry| {
            let size = entry.metadata().map_or(0, |m| if m.is_file() { m.len() } else { 0 });
            FileRecord::new(entry.path(), size, None, 0)
        })
        .collect();
    if files.is_empty() {
        return None;
    }
    files.sort_by(|a, b| a.name.cmp(&b.name));

    Some(InstalledManifest {
        appid: Some(folder_name.to_string()),
        name: Some(folder_name.to_string()),
        files,
        ..InstalledManifest::default()
    })
}

fn carry_provisional(layout: &InstallLayout, slug: &str, manifest: &mut InstalledManifest) {
    let provisional = manifest_path(&layout.installing_dir(slug));
    match read_manifest(&provisional) {
        Ok(Some(saved)) => {
            manifest.merge_identity(saved.appid.as_deref(), saved.name.as_deref(), false);
            if let Some(metadata) = saved.metadata {
                manifest.set_metadata(metadata);
            }
        }
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(target: "ucd.install", error = %e, "Ignoring unreadable provisional manifest");
        }
    }
}

fn metadata_string(metadata: Option<&Value>, key: &str) -> Option<String> {
    metadata?
        .get(key)?
        .as_str()
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

/// File extension for a cached preview: taken from the URL path, at most
/// eight alphanumeric characters, `png` otherwise.
fn preview_extension(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let last = path.rsplit('/').next().unwrap_or_default();
    last.rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map_or_else(
            || "png".to_string(),
            |ext| ext.chars().take(MAX_IMAGE_EXT_LEN).collect::<String>().to_lowercase(),
        )
}

async fn cache_preview(
    fetcher: Arc<dyn PreviewFetcher>,
    layout: InstallLayout,
    lock: ManifestLock,
    dir: PathBuf,
    manifest_path: PathBuf,
    url: String,
) {
    let bytes = match fetcher.fetch(&url).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!(target: "ucd.install", url = %url, error = %e, "Preview fetch failed");
            return;
        }
    };

    let image_path = dir.join(format!("image.{}", preview_extension(&url)));
    let checksum = sha256_bytes(&bytes);

    let result = run_blocking(move || {
        fs::write(&image_path, &bytes).map_err(|e| InstallError::io(&image_path, e))?;
        {
            let _guard = lock.acquire();
            let mut manifest = read_manifest(&manifest_path)?.unwrap_or_default();
            manifest.set_metadata_field(
                "localImage",
                Value::String(image_path.to_string_lossy().into_owned()),
            );
            manifest.set_metadata_field("imageChecksum", Value::String(checksum));
            write_json_atomic(&manifest_path, &manifest)?;
        }
        rebuild_index_blocking(&layout)?;
        Ok(())
    })
    .await;

    if let Err(e) = result {
        tracing::debug!(target: "ucd.install", error = %e, "Preview cache failed");
    }
}
