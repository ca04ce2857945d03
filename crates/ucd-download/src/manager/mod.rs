//! Download manager implementation.
//!
//! Concrete `DownloadManagerPort`: a registry of in-flight tasks keyed by
//! identity, one spawned run per task, and a progress bridge per worker fleet.
//!
//! # Architecture
//!
//! - **Manager**: validates requests, owns the registry and leases
//! - **Run** (`task`): probe, plan, fan out workers, conclude
//! - **Workers** (`crate::transfer`): write bytes, bump a `watch` counter
//! - **Bridge**: subscribes to the counter and emits throttled progress events
//!
//! # Concurrency Model
//!
//! - Registration is a single check-and-insert under the registry lock
//! - Lease tokens prevent a stale run from removing a newer registration
//! - A run releases its identity only after every worker has stopped
//! - Control calls (`cancel`, `pause`, `resume`) wait on the task's status
//!   record instead of polling

mod bridge;
mod paths;
mod registry;
mod task;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError};

use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::{Mutex, broadcast};
use tokio_util::task::TaskTracker;

use ucd_core::{
    BroadcastDownloadEmitter, DownloadError, DownloadEvent, DownloadEventEmitterPort,
    DownloadManagerConfig, DownloadManagerPort, DownloadRequest, DownloadRootProvider,
    DownloadUpdate, ManifestStore, TaskId, TaskStatus,
};

use crate::transfer::build_client;

use registry::{ActiveTask, LeaseId, TaskControl};
use task::TaskRun;

pub use paths::{ResolvedRequest, parse_source_url};

/// Dependencies for creating a download manager.
pub struct DownloadManagerDeps<R, E>
where
    R: DownloadRootProvider + 'static,
    E: DownloadEventEmitterPort + 'static,
{
    /// Resolves the download root for default destinations.
    pub root_provider: Arc<R>,
    /// Port for emitting download events.
    pub event_emitter: Arc<E>,
    /// Engine configuration.
    pub config: DownloadManagerConfig,
}

/// Build a download manager from its dependencies.
///
/// Fails when the configuration is unusable or the HTTP client cannot be
/// built. The result can be stored as `Arc<dyn DownloadManagerPort>`.
pub fn build_download_manager<R, E>(
    deps: DownloadManagerDeps<R, E>,
) -> Result<DownloadManagerImpl, DownloadError>
where
    R: DownloadRootProvider + 'static,
    E: DownloadEventEmitterPort + 'static,
{
    deps.config.validate()?;
    let client = build_client(&deps.config)?;
    Ok(DownloadManagerImpl::new(
        deps.root_provider,
        deps.event_emitter,
        deps.config,
        client,
    ))
}

/// State shared between the manager and its spawned runs.
struct Shared {
    config: DownloadManagerConfig,
    client: Client,
    root_provider: Arc<dyn DownloadRootProvider>,
    event_emitter: Arc<dyn DownloadEventEmitterPort>,
    /// In-process fan-out for `subscribe()`.
    events: BroadcastDownloadEmitter,
    /// In-flight tasks keyed by identity.
    active: Mutex<HashMap<TaskId, ActiveTask>>,
    lease_counter: AtomicU64,
    /// Post-finish bookkeeping (checksums, manifests) still running.
    background: TaskTracker,
    /// One store per download root, so manifest writes share a lock.
    manifests: std::sync::Mutex<HashMap<PathBuf, ManifestStore>>,
}

impl Shared {
    fn emit(&self, event: DownloadEvent) {
        self.events.emit(event.clone());
        self.event_emitter.emit(event);
    }

    /// Atomically claim `id`, minting a lease.
    async fn register(
        &self,
        id: &TaskId,
        control: &Arc<TaskControl>,
    ) -> Result<LeaseId, DownloadError> {
        let mut active = self.active.lock().await;
        if active.contains_key(id) {
            return Err(DownloadError::duplicate_task(id.as_str()));
        }
        let lease = LeaseId(self.lease_counter.fetch_add(1, Ordering::Relaxed));
        active.insert(
            id.clone(),
            ActiveTask {
                lease,
                control: Arc::clone(control),
            },
        );
        Ok(lease)
    }

    /// Verify lease matches and remove from the registry.
    async fn verify_and_remove_lease(&self, id: &TaskId, lease: LeaseId) -> bool {
        let mut active = self.active.lock().await;
        active
            .get(id)
            .is_some_and(|task| task.lease == lease)
            .then(|| active.remove(id))
            .is_some()
    }

    fn manifests_for(&self, root: &Path) -> ManifestStore {
        self.manifests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(root.to_path_buf())
            .or_insert_with(|| ManifestStore::new(root))
            .clone()
    }

    async fn lookup(&self, id: &TaskId) -> Result<Arc<TaskControl>, DownloadError> {
        self.active
            .lock()
            .await
            .get(id)
            .map(|task| Arc::clone(&task.control))
            .ok_or_else(|| DownloadError::not_found(id.as_str()))
    }
}

/// Concrete implementation of the download manager.
///
/// Adapters should typically hold `Arc<dyn DownloadManagerPort>` instead of
/// depending on this type directly.
pub struct DownloadManagerImpl {
    shared: Arc<Shared>,
}

impl DownloadManagerImpl {
    fn new(
        root_provider: Arc<dyn DownloadRootProvider>,
        event_emitter: Arc<dyn DownloadEventEmitterPort>,
        config: DownloadManagerConfig,
        client: Client,
    ) -> Self {
        let events = BroadcastDownloadEmitter::new(config.event_capacity);
        Self {
            shared: Arc::new(Shared {
                config,
                client,
                root_provider,
                event_emitter,
                events,
                active: Mutex::new(HashMap::new()),
                lease_counter: AtomicU64::new(0),
                background: TaskTracker::new(),
                manifests: std::sync::Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Subscribe to every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<DownloadEvent> {
        self.shared.events.subscribe()
    }

    /// The engine configuration.
    pub fn config(&self) -> &DownloadManagerConfig {
        &self.shared.config
    }

    /// The HTTP client shared by every worker.
    pub fn client(&self) -> &Client {
        &self.shared.client
    }

    /// The manifest store finished tasks under `root` record into.
    ///
    /// Repeated calls for one root return clones sharing a write lock.
    pub fn manifest_store(&self, root: &Path) -> ManifestStore {
        self.shared.manifests_for(root)
    }

    /// Wait until install bookkeeping spawned by finished tasks is done.
    ///
    /// Call before exiting a short-lived process.
    pub async fn wait_for_background(&self) {
        let background = &self.shared.background;
        background.close();
        background.wait().await;
        background.reopen();
    }

    /// Cancel every task without waiting, for process exit.
    ///
    /// Returns how many tokens were cancelled.
    pub fn shutdown_cleanup(&self) -> usize {
        // Can't block on tokio::sync::Mutex here, so use try_lock
        self.shared.active.try_lock().map_or_else(
            |_| {
                tracing::warn!(target: "ucd.download", "Shutdown cleanup: couldn't acquire lock");
                0
            },
            |active| {
                let count = active.len();
                for task in active.values() {
                    task.control.cancel.cancel();
                }
                tracing::info!(target: "ucd.download", count, "Shutdown cleanup: cancelled tasks");
                count
            },
        )
    }
}

fn initial_update(request: &ResolvedRequest) -> DownloadUpdate {
    DownloadUpdate {
        task_id: request.task_id.clone(),
        status: TaskStatus::Queued,
        received_bytes: 0,
        total_bytes: None,
        speed_bps: 0.0,
        eta_seconds: None,
        percent: None,
        filename: request.filename.clone(),
        save_path: request.destination.clone(),
        url: request.url.clone(),
        appid: request.appid.clone(),
        name: request.name.clone(),
        error: None,
    }
}

#[async_trait]
impl DownloadManagerPort for DownloadManagerImpl {
    async fn start(&self, request: DownloadRequest) -> Result<TaskId, DownloadError> {
        parse_source_url(&request.url)?;
        let root = self
            .shared
            .root_provider
            .download_root()
            .await
            .map_err(|e| DownloadError::io("DownloadRoot", e.to_string()))?;
        let resolved = ResolvedRequest::resolve(request, &root, &self.shared.config)?;

        let control = Arc::new(TaskControl::new(initial_update(&resolved)));
        let lease = self.shared.register(&resolved.task_id, &control).await?;
        let id = resolved.task_id.clone();

        tracing::info!(
            target: "ucd.download",
            task_id = %id,
            path = %resolved.destination.display(),
            "Download queued"
        );
        self.shared.emit(DownloadEvent::status(control.snapshot()));

        let run = TaskRun {
            shared: Arc::clone(&self.shared),
            control,
            lease,
            request: resolved,
        };
        tokio::spawn(run.run());
        Ok(id)
    }

    async fn cancel(&self, id: &TaskId) -> Result<(), DownloadError> {
        let control = self.shared.lookup(id).await?;
        tracing::debug!(target: "ucd.download", task_id = %id, "Cancel requested");
        control.cancel.cancel();
        control.wait_for_status(|u| u.status.is_terminal()).await;
        Ok(())
    }

    async fn pause(&self, id: &TaskId) -> Result<(), DownloadError> {
        let control = self.shared.lookup(id).await?;
        match control.status() {
            TaskStatus::Paused => return Ok(()),
            status if status.is_terminal() => return Err(DownloadError::not_found(id.as_str())),
            _ => {}
        }
        if !control.is_pausable() {
            return Err(DownloadError::pause_unsupported(id.as_str()));
        }

        control.request_pause();
        let update = control
            .wait_for_status(|u| u.status != TaskStatus::Running)
            .await;
        if update.status == TaskStatus::Paused {
            Ok(())
        } else {
            Err(DownloadError::not_found(id.as_str()))
        }
    }

    async fn resume(&self, id: &TaskId) -> Result<(), DownloadError> {
        let control = self.shared.lookup(id).await?;
        if control.status() != TaskStatus::Paused {
            return Err(DownloadError::not_paused(id.as_str()));
        }

        control.clear_pause();
        control.resume.notify_one();
        control
            .wait_for_status(|u| u.status != TaskStatus::Paused)
            .await;
        Ok(())
    }

    async fn get(&self, id: &TaskId) -> Option<DownloadUpdate> {
        self.shared
            .active
            .lock()
            .await
            .get(id)
            .map(|task| task.control.snapshot())
    }

    async fn list(&self) -> Vec<DownloadUpdate> {
        let mut updates: Vec<DownloadUpdate> = self
            .shared
            .active
            .lock()
            .await
            .values()
            .map(|task| task.control.snapshot())
            .collect();
        updates.sort_by(|a, b| a.task_id.cmp(&b.task_id));
        updates
    }

    async fn cancel_all(&self) -> usize {
        let controls: Vec<Arc<TaskControl>> = self
            .shared
            .active
            .lock()
            .await
            .values()
            .map(|task| Arc::clone(&task.control))
            .collect();

        for control in &controls {
            control.cancel.cancel();
        }
        for control in &controls {
            control.wait_for_status(|u| u.status.is_terminal()).await;
        }

        tracing::info!(target: "ucd.download", count = controls.len(), "Cancelled all tasks");
        controls.len()
    }
}
