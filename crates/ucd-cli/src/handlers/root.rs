//! `ucd root`: show or change the download root.

use anyhow::Result;
use ucd_core::DownloadRootProvider;
use ucd_runtime::DownloadRootSource;

use crate::bootstrap::CliContext;

const fn source_label(source: DownloadRootSource) -> &'static str {
    match source {
        DownloadRootSource::Explicit => "--root / UCD_DOWNLOAD_ROOT",
        DownloadRootSource::Settings => "settings.json",
        DownloadRootSource::Default => "default",
    }
}

/// Print the active download root and where it came from.
pub fn get(ctx: &CliContext) {
    println!(
        "{} ({})",
        ctx.root.path.display(),
        source_label(ctx.root.source)
    );
}

/// Persist a new download root.
pub async fn set(ctx: &CliContext, path: &str) -> Result<()> {
    let resolved = ctx.settings.set_download_root(path).await?;
    println!("Download root set to {}", resolved.display());
    if ctx.root.source == DownloadRootSource::Explicit {
        println!("Note: --root / UCD_DOWNLOAD_ROOT still overrides it for this shell.");
    }
    Ok(())
}
