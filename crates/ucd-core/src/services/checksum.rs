//! SHA-256 digests for finalized files, preview images and metadata.
//!
//! Stateless. File hashing streams the file in 1 MiB chunks on the blocking
//! pool so large archives never stall the async runtime.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use serde_json::Value;
use sha2::{Digest, Sha256};

const HASH_BUFFER_BYTES: usize = 1024 * 1024;

/// Lowercase hex SHA-256 of a file, computed on the blocking pool.
pub async fn sha256_file(path: impl Into<PathBuf>) -> io::Result<String> {
    let path = path.into();
    tokio::task::spawn_blocking(move || sha256_file_blocking(&path))
        .await
        .map_err(|e| io::Error::other(format!("hash task failed: {e}")))?
}

/// Lowercase hex SHA-256 of a file, computed on the current thread.
pub fn sha256_file_blocking(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; HASH_BUFFER_BYTES];

    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Lowercase hex SHA-256 of an in-memory buffer.
pub fn sha256_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Content hash of a manifest's metadata object (SHA-256 of compact JSON).
pub fn metadata_hash(metadata: &Value) -> String {
    // Serializing a `Value` cannot fail.
    let json = serde_json::to_string(metadata).unwrap_or_default();
    sha256_bytes(json.as_bytes())
}
