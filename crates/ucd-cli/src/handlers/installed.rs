//! `ucd installed` and `ucd installing`.

use anyhow::Result;
use ucd_core::InstalledManifest;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::{manifest_rows, print_separator};

const TABLE_WIDTH: usize = 64;

/// List installed titles.
pub async fn list(ctx: &CliContext, json: bool) -> Result<()> {
    let manifests = ctx.manifests().list_installed().await?;
    print_manifests(&manifests, json, "No installed titles.")
}

/// List titles still downloading or awaiting finalize.
pub async fn list_installing(ctx: &CliContext, json: bool) -> Result<()> {
    let manifests = ctx.manifests().list_installing().await?;
    print_manifests(&manifests, json, "Nothing is installing.")
}

/// Print one installed manifest as JSON.
pub async fn get(ctx: &CliContext, appid: &str) -> Result<()> {
    let manifest = ctx
        .manifests()
        .get_installed(appid)
        .await?
        .ok_or_else(|| CliError::NotFound(format!("No installed title with appid {appid}")))?;
    println!("{}", serde_json::to_string_pretty(&manifest)?);
    Ok(())
}

/// Rebuild the installed index from the manifests on disk.
pub async fn reindex(ctx: &CliContext) -> Result<()> {
    let index = ctx.manifests().rebuild_index().await?;
    println!(
        "Indexed {} title(s) under {}",
        index.entries.len(),
        ctx.root.path.display()
    );
    Ok(())
}

fn print_manifests(manifests: &[InstalledManifest], json: bool, empty: &str) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(manifests)?);
        return Ok(());
    }
    if manifests.is_empty() {
        println!("{empty}");
        return Ok(());
    }
    println!("{:<12} {:<32} {:>5} {:>12}", "APPID", "NAME", "FILES", "SIZE");
    print_separator(TABLE_WIDTH);
    for row in manifest_rows(manifests) {
        println!("{row}");
    }
    Ok(())
}
