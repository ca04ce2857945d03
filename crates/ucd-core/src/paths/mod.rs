//! Path utilities: data root, download root layout and file naming.
//!
//! # Design
//!
//! - Returns `PathBuf` and `PathError` for clear error handling
//! - No interactive I/O; the disk picker lives in the UI layer
//! - Root resolution is kept in `platform`

mod ensure;
mod error;
mod layout;
mod platform;
mod slug;
mod unique;

#[cfg(test)]
mod test_utils;

pub use error::PathError;

pub use platform::{
    APP_DIR_NAME, DATA_DIR_ENV, data_root, default_download_root, normalize_user_path,
};

pub use ensure::{ensure_directory, verify_writable};

pub use layout::{
    INDEX_FILE, INSTALLED_DIR, INSTALLING_DIR, InstallLayout, MANIFEST_FILE, manifest_path,
};

pub use slug::{FALLBACK_SLUG, MAX_SLUG_LEN, slugify};

pub use unique::{MAX_NUMBERED_SUFFIX, resolve_unique_path};
