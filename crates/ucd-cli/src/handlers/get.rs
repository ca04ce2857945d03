//! `ucd get`: download one file and follow it to the end.

use anyhow::{Result, anyhow};
use tokio::sync::broadcast::error::RecvError;
use ucd_core::{CatalogEntry, DownloadEvent, DownloadManagerPort, DownloadRequest, TaskStatus};

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::DownloadProgress;

/// Arguments for a single download.
#[derive(Debug, Clone, Default)]
pub struct GetArgs {
    pub url: String,
    pub appid: Option<String>,
    pub name: Option<String>,
    pub filename: Option<String>,
    pub image_url: Option<String>,
    pub concurrency: Option<usize>,
    pub min_chunk: Option<u64>,
    pub install: bool,
}

impl GetArgs {
    fn request(&self) -> DownloadRequest {
        let mut request = DownloadRequest::new(&self.url).with_finalize(self.install);
        if let Some(appid) = &self.appid {
            request = request.with_appid(appid);
        }
        if let Some(name) = &self.name {
            request = request.with_name(name);
        }
        if let Some(filename) = &self.filename {
            request = request.with_filename(filename);
        }
        if let Some(concurrency) = self.concurrency {
            request = request.with_concurrency(concurrency);
        }
        if let Some(bytes) = self.min_chunk {
            request = request.with_min_chunk_bytes(bytes);
        }
        request
    }
}

/// Execute the get command.
pub async fn execute(ctx: &CliContext, args: GetArgs) -> Result<()> {
    // Seed the manifest so the title shows up under `installing` right away.
    let mut preview = None;
    if args.install {
        if let Some(appid) = &args.appid {
            let mut entry = CatalogEntry::new(appid.clone());
            if let Some(name) = &args.name {
                entry = entry.with_name(name.clone());
            }
            if let Some(url) = &args.image_url {
                entry = entry.with_image_url(url.clone());
            }
            let saved = ctx.manifests().save_provisional(&entry, None).await?;
            tracing::debug!(path = %saved.manifest_path.display(), "Saved provisional manifest");
            preview = saved.preview;
        }
    }

    let mut rx = ctx.downloads.subscribe();
    let task_id = ctx.downloads.start(args.request()).await?;
    let label = ctx
        .downloads
        .get(&task_id)
        .await
        .map_or_else(|| args.url.clone(), |u| u.filename);
    let mut progress = DownloadProgress::new(&label);

    let mut interrupted = false;
    let outcome = loop {
        let event = tokio::select! {
            biased;
            result = tokio::signal::ctrl_c(), if !interrupted => {
                interrupted = true;
                if let Err(e) = result {
                    tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
                    continue;
                }
                tracing::info!("Interrupted, cancelling download");
                if let Err(e) = ctx.downloads.cancel(&task_id).await {
                    tracing::debug!(error = %e, "Cancel after Ctrl-C");
                }
                continue;
            }
            event = rx.recv() => event,
        };

        let event = match event {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "Progress receiver lagged");
                continue;
            }
            Err(RecvError::Closed) => break Err(anyhow!("Download engine stopped")),
        };
        if event.task_id() != &task_id {
            continue;
        }

        match event {
            DownloadEvent::Progress { update } => progress.update(&update),
            DownloadEvent::StatusChanged { update } => match update.status {
                TaskStatus::Finished => {
                    progress.finish();
                    println!("Saved {}", update.save_path.display());
                    if !args.install {
                        break Ok(());
                    }
                }
                TaskStatus::Failed => {
                    progress.finish();
                    let failure = update.error.unwrap_or_else(|| ucd_core::TaskFailure {
                        code: "unknown".into(),
                        message: "download failed".into(),
                    });
                    break Err(CliError::from(failure).into());
                }
                TaskStatus::Cancelled => {
                    progress.finish();
                    break Err(CliError::Cancelled.into());
                }
                status => {
                    progress.update(&update);
                    progress.status(status);
                }
            },
            DownloadEvent::Installed {
                final_path,
                manifest_path,
                ..
            } => {
                println!("Installed {}", final_path.display());
                tracing::debug!(manifest = %manifest_path.display(), "Manifest updated");
                break Ok(());
            }
            DownloadEvent::InstallFailed { error, .. } => {
                break Err(CliError::from(error).into());
            }
        }
    };

    ctx.downloads.wait_for_background().await;
    if let Some(handle) = preview {
        if let Err(e) = handle.await {
            tracing::debug!(error = %e, "Preview task ended abnormally");
        }
    }
    outcome
}
