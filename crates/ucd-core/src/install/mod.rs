//! Install bookkeeping types: manifests, the installed index and catalog seeds.
//!
//! Pure data types; the filesystem side lives in
//! `services::manifest_store`.

pub mod catalog;
pub mod errors;
pub mod index;
pub mod manifest;

pub use catalog::CatalogEntry;
pub use errors::InstallError;
pub use index::{IndexEntry, InstalledIndex};
pub use manifest::{FileRecord, InstalledManifest};
