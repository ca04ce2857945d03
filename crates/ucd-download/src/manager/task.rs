//! One task's run: probe, plan, fan out, conclude.
//!
//! The run is the only writer of status transitions after `queued`. It
//! releases the task's identity only once every worker and the progress
//! bridge have stopped, and publishes the terminal record after that.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::fs::File;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use ucd_core::{DownloadError, DownloadEvent, DownloadUpdate, TaskFailure, TaskStatus};

use super::Shared;
use super::bridge::{BridgeState, ProgressBridge};
use super::paths::ResolvedRequest;
use super::registry::{LeaseId, TaskControl};
use crate::planner::{self, Segment, TransferPlan};
use crate::progress::percent;
use crate::transfer::{
    ProbeResult, ProgressUpdate, RetryPolicy, TransferContext, fetch_segment, fetch_whole, probe,
    until_cancelled,
};

/// How a run ended.
enum Outcome {
    Finished { received: u64 },
    Failed(DownloadError),
    Cancelled,
}

/// Value-type job handed to the spawned run.
pub(super) struct TaskRun {
    pub(super) shared: Arc<Shared>,
    pub(super) control: Arc<TaskControl>,
    pub(super) lease: LeaseId,
    pub(super) request: ResolvedRequest,
}

impl TaskRun {
    pub(super) async fn run(self) {
        let outcome = self.execute().await;
        self.conclude(outcome).await;
    }

    async fn execute(&self) -> Outcome {
        if self.control.cancel.is_cancelled() {
            return Outcome::Cancelled;
        }

        self.publish_status(TaskStatus::Running);
        tracing::info!(
            target: "ucd.download",
            task_id = %self.request.task_id,
            url = %self.request.url,
            "Download started"
        );

        match self.transfer().await {
            Ok(received) => Outcome::Finished { received },
            Err(_) if self.control.cancel.is_cancelled() => Outcome::Cancelled,
            Err(e) if e.is_cancelled() => Outcome::Cancelled,
            Err(e) => Outcome::Failed(e),
        }
    }

    async fn transfer(&self) -> Result<u64, DownloadError> {
        let path = &self.request.destination;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let probe = self.probe().await?;
        let plan = planner::plan(
            probe.total_bytes,
            probe.accepts_ranges,
            self.request.min_chunk_bytes,
            self.request.concurrency,
        )?;

        tracing::debug!(
            target: "ucd.download",
            task_id = %self.request.task_id,
            total = ?probe.total_bytes,
            accepts_ranges = probe.accepts_ranges,
            workers = plan.worker_count(),
            "Planned transfer"
        );

        if probe.total_bytes.is_some() {
            self.control.publish(|u| {
                u.total_bytes = probe.total_bytes;
                u.percent = percent(0, probe.total_bytes);
            });
        }

        let (progress, _) = watch::channel(ProgressUpdate::new(0, probe.total_bytes));
        match plan {
            TransferPlan::Empty => {
                File::create(path).await?;
                Ok(0)
            }
            TransferPlan::Single => self.single(progress).await,
            TransferPlan::Segmented(segments) => self.segmented(&segments, &progress).await,
        }
    }

    /// `HEAD` the source; any failure degrades to the single-stream fallback.
    async fn probe(&self) -> Result<ProbeResult, DownloadError> {
        let result = until_cancelled(
            &self.control.cancel,
            probe(
                &self.shared.client,
                &self.request.url,
                self.shared.config.probe_timeout,
            ),
        )
        .await?;

        Ok(result.unwrap_or_else(|e| {
            tracing::warn!(
                target: "ucd.download",
                task_id = %self.request.task_id,
                error = %e,
                "Probe failed; using a single stream"
            );
            ProbeResult::unknown()
        }))
    }

    async fn single(&self, progress: watch::Sender<ProgressUpdate>) -> Result<u64, DownloadError> {
        let bridge = self.spawn_bridge(
            progress.subscribe(),
            BridgeState::new(self.shared.config.progress_interval),
        );
        let ctx = self.context(progress, self.control.cancel.clone());
        let result = fetch_whole(&ctx).await;
        bridge.stop().await;
        result
    }

    async fn segmented(
        &self,
        segments: &[Segment],
        progress: &watch::Sender<ProgressUpdate>,
    ) -> Result<u64, DownloadError> {
        let total = segments.last().map_or(0, |s| s.end + 1);

        // Pre-size so workers never race on file growth.
        File::create(&self.request.destination)
            .await?
            .set_len(total)
            .await?;
        self.control.set_pausable(true);

        let written: Arc<Vec<AtomicU64>> =
            Arc::new(segments.iter().map(|_| AtomicU64::new(0)).collect());
        let mut state = BridgeState::new(self.shared.config.progress_interval);

        loop {
            let fleet = self.control.new_fleet();
            let bridge = self.spawn_bridge(progress.subscribe(), state);
            let result = self.run_fleet(segments, &written, progress, &fleet).await;
            state = bridge.stop().await;
            result?;

            if planner::remaining(segments, &load_all(&written)).is_empty() {
                return Ok(total);
            }
            if self.control.cancel.is_cancelled() {
                return Err(DownloadError::Cancelled);
            }

            let received = progress.borrow().downloaded;
            self.wait_while_paused(received).await?;
            state.resume_from(received);
        }
    }

    /// Fan out one worker per unfinished segment and join them all.
    ///
    /// The first real failure cancels the siblings; cancellations are not
    /// failures.
    async fn run_fleet(
        &self,
        segments: &[Segment],
        written: &Arc<Vec<AtomicU64>>,
        progress: &watch::Sender<ProgressUpdate>,
        fleet: &CancellationToken,
    ) -> Result<(), DownloadError> {
        let retry = RetryPolicy {
            max_retries: self.shared.config.max_segment_retries,
            base_delay: self.shared.config.retry_base_delay,
        };

        let mut workers = JoinSet::new();
        for (segment, offset) in planner::remaining(segments, &load_all(written)) {
            tracing::debug!(
                target: "ucd.download",
                task_id = %self.request.task_id,
                segment = segment.index,
                from = segment.start + offset,
                to = segment.end,
                "Starting segment"
            );
            let ctx = self.context(progress.clone(), fleet.clone());
            let written = Arc::clone(written);
            workers.spawn(async move {
                fetch_segment(&ctx, segment, &written[segment.index], &retry).await
            });
        }

        let mut failure = None;
        while let Some(joined) = workers.join_next().await {
            let result = joined.unwrap_or_else(|e| {
                Err(DownloadError::other(format!("segment worker crashed: {e}")))
            });
            match result {
                Err(e) if !e.is_cancelled() && failure.is_none() => {
                    tracing::warn!(
                        target: "ucd.download",
                        task_id = %self.request.task_id,
                        error = %e,
                        "Segment failed; stopping sibling workers"
                    );
                    fleet.cancel();
                    failure = Some(e);
                }
                _ => {}
            }
        }

        failure.map_or(Ok(()), Err)
    }

    /// Park a paused task until it is resumed or cancelled.
    async fn wait_while_paused(&self, received: u64) -> Result<(), DownloadError> {
        if !self.control.pause_requested() {
            return Ok(());
        }

        let update = self.control.publish(|u| {
            u.status = TaskStatus::Paused;
            u.received_bytes = received;
            u.percent = percent(received, u.total_bytes);
            u.speed_bps = 0.0;
            u.eta_seconds = None;
        });
        self.shared.emit(DownloadEvent::status(update));
        tracing::info!(
            target: "ucd.download",
            task_id = %self.request.task_id,
            received,
            "Download paused"
        );

        while self.control.pause_requested() {
            tokio::select! {
                biased;

                () = self.control.cancel.cancelled() => return Err(DownloadError::Cancelled),
                () = self.control.resume.notified() => {}
            }
        }

        self.publish_status(TaskStatus::Running);
        tracing::info!(
            target: "ucd.download",
            task_id = %self.request.task_id,
            "Download resumed"
        );
        Ok(())
    }

    async fn conclude(self, outcome: Outcome) {
        match outcome {
            Outcome::Finished { received } => self.finish(received).await,
            Outcome::Failed(error) => {
                self.release().await;
                tracing::warn!(
                    target: "ucd.download",
                    task_id = %self.request.task_id,
                    code = error.reason_code(),
                    error = %error,
                    path = %self.request.destination.display(),
                    "Download failed; partial file kept"
                );
                let failure = TaskFailure::from(&error);
                self.publish_terminal(|u| {
                    u.status = TaskStatus::Failed;
                    u.error = Some(failure);
                });
            }
            Outcome::Cancelled => {
                self.release().await;
                tracing::info!(
                    target: "ucd.download",
                    task_id = %self.request.task_id,
                    "Download cancelled"
                );
                self.publish_terminal(|u| u.status = TaskStatus::Cancelled);
            }
        }
    }

    async fn finish(self, received: u64) {
        let store = self.shared.manifests_for(&self.request.root);
        let moved = if self.request.finalize {
            Some(
                store
                    .finalize(&self.request.destination, &self.request.slug)
                    .await,
            )
        } else {
            None
        };
        self.release().await;

        let save_path = match &moved {
            Some(Ok(file)) => file.final_path.clone(),
            _ => self.request.destination.clone(),
        };
        tracing::info!(
            target: "ucd.download",
            task_id = %self.request.task_id,
            bytes = received,
            path = %save_path.display(),
            "Download finished"
        );
        self.publish_terminal(|u| {
            u.status = TaskStatus::Finished;
            u.received_bytes = received;
            u.total_bytes = Some(u.total_bytes.unwrap_or(received));
            u.percent = Some(100.0);
            u.save_path = save_path;
        });

        match moved {
            Some(Ok(file)) => {
                let installed = DownloadEvent::Installed {
                    task_id: self.request.task_id.clone(),
                    appid: self.request.appid.clone(),
                    final_path: file.final_path.clone(),
                    manifest_path: file.manifest_path.clone(),
                };

                // Checksum and manifest bookkeeping never hold up `finished`.
                let appid = self.request.appid.clone();
                let name = self.request.name.clone();
                self.shared.background.spawn(async move {
                    if let Err(e) = store
                        .record_install(&file, appid.as_deref(), name.as_deref())
                        .await
                    {
                        tracing::warn!(
                            target: "ucd.download",
                            path = %file.final_path.display(),
                            error = %e,
                            "Recording install failed"
                        );
                    }
                });
                self.shared.emit(installed);
            }
            Some(Err(e)) => {
                tracing::warn!(
                    target: "ucd.download",
                    task_id = %self.request.task_id,
                    error = %e,
                    "Finalize move failed; file left in installing"
                );
                let error = DownloadError::io("MoveFailed", e.to_string());
                self.shared.emit(DownloadEvent::InstallFailed {
                    task_id: self.request.task_id.clone(),
                    error: TaskFailure::from(&error),
                });
            }
            None => {}
        }
    }

    fn publish_status(&self, status: TaskStatus) {
        let update = self.control.publish(|u| u.status = status);
        self.shared.emit(DownloadEvent::status(update));
    }

    fn publish_terminal(&self, modify: impl FnOnce(&mut DownloadUpdate)) {
        let update = self.control.publish(|u| {
            modify(u);
            u.speed_bps = 0.0;
            u.eta_seconds = None;
        });
        self.shared.emit(DownloadEvent::status(update));
    }

    async fn release(&self) {
        if !self
            .shared
            .verify_and_remove_lease(&self.request.task_id, self.lease)
            .await
        {
            tracing::debug!(
                target: "ucd.download",
                task_id = %self.request.task_id,
                "Ignoring stale release (lease mismatch)"
            );
        }
    }

    fn spawn_bridge(
        &self,
        rx: watch::Receiver<ProgressUpdate>,
        state: BridgeState,
    ) -> ProgressBridge {
        ProgressBridge::spawn(
            Arc::clone(&self.shared),
            Arc::clone(&self.control),
            rx,
            state,
        )
    }

    fn context(
        &self,
        progress: watch::Sender<ProgressUpdate>,
        cancel: CancellationToken,
    ) -> TransferContext {
        TransferContext {
            client: self.shared.client.clone(),
            url: self.request.url.clone(),
            path: self.request.destination.clone(),
            progress,
            cancel,
        }
    }
}

fn load_all(written: &[AtomicU64]) -> Vec<u64> {
    written.iter().map(|w| w.load(Ordering::Acquire)).collect()
}
