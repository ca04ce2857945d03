//! Core services: checksums and the manifest store.
//!
//! Services here touch the filesystem but know nothing about HTTP or the
//! download engine; the orchestrator calls into them.

pub mod checksum;
pub mod manifest_store;

pub use checksum::{metadata_hash, sha256_bytes, sha256_file, sha256_file_blocking};
pub use manifest_store::{FinalizedFile, ManifestStore, ProvisionalSave, read_manifest};
