//! OS-level adapters for UnionCrax.Direct.
//!
//! - `system` - `DiskInventoryPort` backed by `sysinfo`, plus directory usage
//! - `settings_store` - `settings.json` persistence and the `DownloadRootProvider`
#![deny(unused_crate_dependencies)]

pub mod settings_store;
pub mod system;

pub use settings_store::{DownloadRootResolution, DownloadRootSource, JsonSettingsStore, SETTINGS_FILE};
pub use system::{SysinfoDiskInventory, containing_volume, directory_usage};
