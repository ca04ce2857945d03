//! Progress bridge: turns the workers' byte counter into progress events.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use ucd_core::{DownloadEvent, DownloadUpdate};

use super::Shared;
use super::registry::TaskControl;
use crate::progress::{ProgressThrottle, ProgressTracker, eta_seconds, percent};
use crate::transfer::ProgressUpdate;

/// Speed and throttle state, carried across pause/resume.
#[derive(Debug, Clone)]
pub(super) struct BridgeState {
    tracker: ProgressTracker,
    throttle: ProgressThrottle,
}

impl BridgeState {
    pub(super) fn new(interval: Duration) -> Self {
        Self {
            tracker: ProgressTracker::new(Instant::now()),
            throttle: ProgressThrottle::new(interval),
        }
    }

    /// Restart speed measurement after a pause.
    pub(super) fn resume_from(&mut self, received: u64) {
        self.tracker = ProgressTracker::resume_from(received, Instant::now());
        self.throttle.reset();
    }
}

/// A running bridge task.
pub(super) struct ProgressBridge {
    stop: CancellationToken,
    handle: JoinHandle<BridgeState>,
    interval: Duration,
}

impl ProgressBridge {
    /// Spawn a bridge for one worker fleet.
    ///
    /// Stops on its own when the task is cancelled, so a cancelled task emits
    /// no progress after the cancel.
    pub(super) fn spawn(
        shared: Arc<Shared>,
        control: Arc<TaskControl>,
        mut rx: watch::Receiver<ProgressUpdate>,
        mut state: BridgeState,
    ) -> Self {
        let interval = shared.config.progress_interval;
        let stop = control.cancel.child_token();
        let token = stop.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;

                    () = token.cancelled() => break,

                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let current = *rx.borrow_and_update();
                        let now = Instant::now();
                        if !state.throttle.should_emit_at(now) {
                            continue;
                        }
                        let speed = state.tracker.observe(current.downloaded, now);
                        let update = control.publish(|u| apply_progress(u, current, speed));
                        shared.emit(DownloadEvent::progress(update));
                    }
                }
            }
            state
        });

        Self {
            stop,
            handle,
            interval,
        }
    }

    /// Stop the bridge and wait for it, so nothing is emitted afterwards.
    pub(super) async fn stop(self) -> BridgeState {
        self.stop.cancel();
        match self.handle.await {
            Ok(state) => state,
            Err(e) => {
                tracing::error!(target: "ucd.download", error = %e, "Progress bridge crashed");
                BridgeState::new(self.interval)
            }
        }
    }
}

/// Fold a progress sample into a record.
pub(super) fn apply_progress(update: &mut DownloadUpdate, current: ProgressUpdate, speed_bps: f64) {
    let total = current.total.or(update.total_bytes);
    update.received_bytes = current.downloaded;
    update.total_bytes = total;
    update.speed_bps = speed_bps;
    update.eta_seconds =
        total.and_then(|t| eta_seconds(t.saturating_sub(current.downloaded), speed_bps));
    update.percent = percent(current.downloaded, total);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use ucd_core::{TaskId, TaskStatus};

    fn update() -> DownloadUpdate {
        DownloadUpdate {
            task_id: TaskId::new("t"),
            status: TaskStatus::Running,
            received_bytes: 0,
            total_bytes: None,
            speed_bps: 0.0,
            eta_seconds: None,
            percent: None,
            filename: "f.bin".into(),
            save_path: PathBuf::from("/tmp/f.bin"),
            url: "http://host/f.bin".into(),
            appid: None,
            name: None,
            error: None,
        }
    }

    #[test]
    fn known_total_yields_percent_and_eta() {
        let mut u = update();
        apply_progress(
            &mut u,
            ProgressUpdate {
                downloaded: 400,
                total: Some(1000),
                seq: 3,
            },
            200.0,
        );
        assert_eq!(u.received_bytes, 400);
        assert_eq!(u.percent, Some(40.0));
        assert_eq!(u.eta_seconds, Some(3.0));
    }

    #[test]
    fn unknown_total_keeps_percent_null() {
        let mut u = update();
        apply_progress(
            &mut u,
            ProgressUpdate {
                downloaded: 400,
                total: None,
                seq: 1,
            },
            200.0,
        );
        assert_eq!(u.percent, None);
        assert_eq!(u.eta_seconds, None);
        assert!((u.speed_bps - 200.0).abs() < f64::EPSILON);
    }
}
