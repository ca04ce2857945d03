//! `ucd disks` and `ucd usage`.

use anyhow::Result;
use indicatif::HumanBytes;
use ucd_core::normalize_user_path;

use crate::bootstrap::CliContext;
use crate::presentation::{print_separator, volume_rows};

/// List mounted volumes, starring the one holding the download root.
pub async fn list(ctx: &CliContext) -> Result<()> {
    let volumes = ctx.disks.volumes().await?;
    println!("  {:<24} {:>12} {:>12}  MOUNT", "NAME", "FREE", "TOTAL");
    print_separator(72);
    for row in volume_rows(&volumes, &ctx.root.path) {
        println!("{row}");
    }
    Ok(())
}

/// Print the bytes used under `path`, or under the download root.
pub async fn usage(ctx: &CliContext, path: Option<&str>) -> Result<()> {
    let target = match path {
        Some(raw) => normalize_user_path(raw)?,
        None => ctx.root.path.clone(),
    };
    let bytes = ctx.disks.directory_usage(&target).await?;
    println!("{}\t{}", HumanBytes(bytes), target.display());
    Ok(())
}
