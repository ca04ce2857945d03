//! Per-task control block and registry entries.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{Notify, watch};
use tokio_util::sync::CancellationToken;

use ucd_core::{DownloadUpdate, TaskStatus};

/// Lease ID for tracking in-flight tasks.
///
/// Only the run that minted a lease may remove its registry entry, so a
/// late conclusion can never evict a newer task with the same identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) struct LeaseId(pub(super) u64);

/// Registry entry for an in-flight task.
pub(super) struct ActiveTask {
    pub(super) lease: LeaseId,
    pub(super) control: Arc<TaskControl>,
}

/// Shared handle between the manager's control calls and the task's run.
pub(super) struct TaskControl {
    /// Cancels the whole task.
    pub(super) cancel: CancellationToken,
    /// Token of the current worker fleet (child of `cancel`).
    fleet: Mutex<CancellationToken>,
    pause_requested: AtomicBool,
    pausable: AtomicBool,
    /// Wakes a paused run.
    pub(super) resume: Notify,
    /// Latest published record.
    snapshot: watch::Sender<DownloadUpdate>,
}

impl TaskControl {
    pub(super) fn new(initial: DownloadUpdate) -> Self {
        let cancel = CancellationToken::new();
        let fleet = cancel.child_token();
        let (snapshot, _) = watch::channel(initial);
        Self {
            cancel,
            fleet: Mutex::new(fleet),
            pause_requested: AtomicBool::new(false),
            pausable: AtomicBool::new(false),
            resume: Notify::new(),
            snapshot,
        }
    }

    fn lock_fleet(&self) -> MutexGuard<'_, CancellationToken> {
        self.fleet.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mint the token for a new worker fleet.
    ///
    /// Born cancelled when a pause is pending, so a pause can never slip
    /// between two fleets.
    pub(super) fn new_fleet(&self) -> CancellationToken {
        let mut current = self.lock_fleet();
        let token = self.cancel.child_token();
        if self.pause_requested.load(Ordering::Acquire) {
            token.cancel();
        }
        *current = token.clone();
        token
    }

    /// Flag a pause and stop the current fleet.
    pub(super) fn request_pause(&self) {
        let current = self.lock_fleet();
        self.pause_requested.store(true, Ordering::Release);
        current.cancel();
    }

    pub(super) fn clear_pause(&self) {
        self.pause_requested.store(false, Ordering::Release);
    }

    pub(super) fn pause_requested(&self) -> bool {
        self.pause_requested.load(Ordering::Acquire)
    }

    pub(super) fn set_pausable(&self, pausable: bool) {
        self.pausable.store(pausable, Ordering::Release);
    }

    pub(super) fn is_pausable(&self) -> bool {
        self.pausable.load(Ordering::Acquire)
    }

    /// Current record.
    pub(super) fn snapshot(&self) -> DownloadUpdate {
        self.snapshot.borrow().clone()
    }

    pub(super) fn status(&self) -> TaskStatus {
        self.snapshot.borrow().status
    }

    /// Update the record and return the new value.
    pub(super) fn publish(&self, modify: impl FnOnce(&mut DownloadUpdate)) -> DownloadUpdate {
        self.snapshot.send_modify(modify);
        self.snapshot()
    }

    /// Wait until the status satisfies `done`, returning the matching record.
    pub(super) async fn wait_for_status(
        &self,
        mut done: impl FnMut(&DownloadUpdate) -> bool,
    ) -> DownloadUpdate {
        let mut rx = self.snapshot.subscribe();
        // The sender lives in `self`, so this cannot observe a closed channel.
        match rx.wait_for(|u| done(u)).await {
            Ok(update) => update.clone(),
            Err(_) => self.snapshot(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use ucd_core::TaskId;

    fn control() -> TaskControl {
        TaskControl::new(DownloadUpdate {
            task_id: TaskId::new("t"),
            status: TaskStatus::Queued,
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
        })
    }

    #[test]
    fn lease_id_equality() {
        assert_eq!(LeaseId(1), LeaseId(1));
        assert_ne!(LeaseId(1), LeaseId(2));
    }

    #[test]
    fn pause_cancels_current_and_future_fleets() {
        let control = control();
        let first = control.new_fleet();
        assert!(!first.is_cancelled());

        control.request_pause();
        assert!(first.is_cancelled());
        assert!(control.new_fleet().is_cancelled());
        assert!(!control.cancel.is_cancelled());

        control.clear_pause();
        assert!(!control.new_fleet().is_cancelled());
    }

    #[test]
    fn task_cancel_reaches_fleet() {
        let control = control();
        let fleet = control.new_fleet();
        control.cancel.cancel();
        assert!(fleet.is_cancelled());
    }

    #[tokio::test]
    async fn wait_for_status_sees_later_publish() {
        let control = Arc::new(control());
        let waiter = {
            let control = Arc::clone(&control);
            tokio::spawn(async move {
                control
                    .wait_for_status(|u| u.status.is_terminal())
                    .await
                    .status
            })
        };

        control.publish(|u| u.status = TaskStatus::Running);
        control.publish(|u| u.status = TaskStatus::Cancelled);
        assert_eq!(waiter.await.unwrap(), TaskStatus::Cancelled);
        assert_eq!(control.status(), TaskStatus::Cancelled);
    }
}
