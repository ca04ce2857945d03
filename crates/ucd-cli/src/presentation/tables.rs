//! Table formatting for CLI output.

use std::path::Path;

use indicatif::HumanBytes;
use ucd_core::{InstalledManifest, Volume};
use ucd_runtime::containing_volume;

/// Truncates a string to a maximum length, adding "..." if needed.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// Print a horizontal separator line.
pub fn print_separator(width: usize) {
    println!("{}", "-".repeat(width));
}

/// Rows for `ucd disks`; the volume holding `root` is starred.
pub fn volume_rows(volumes: &[Volume], root: &Path) -> Vec<String> {
    let home = containing_volume(volumes, root).map(|v| v.id.as_str());
    volumes
        .iter()
        .map(|v| {
            let marker = if Some(v.id.as_str()) == home { '*' } else { ' ' };
            format!(
                "{marker} {:<24} {:>12} {:>12}  {}",
                truncate_string(&v.name, 24),
                HumanBytes(v.free_bytes).to_string(),
                HumanBytes(v.total_bytes).to_string(),
                v.path.display()
            )
        })
        .collect()
}

/// Rows for `ucd installed list` / `ucd installing list`.
pub fn manifest_rows(manifests: &[InstalledManifest]) -> Vec<String> {
    manifests
        .iter()
        .map(|m| {
            let size: u64 = m.files.iter().map(|f| f.size_bytes).sum();
            format!(
                "{:<12} {:<32} {:>5} {:>12}",
                truncate_string(m.appid.as_deref().unwrap_or("-"), 12),
                truncate_string(m.name.as_deref().unwrap_or("-"), 32),
                m.files.len(),
                HumanBytes(size).to_string()
            )
        })
        .collect()
}
