//! Download event emitter port.
//!
//! This port abstracts download event emission, allowing the orchestrator
//! to publish events without coupling to the transport (IPC, terminal, etc.).

use tokio::sync::broadcast;

use crate::download::DownloadEvent;

/// Port for emitting download events.
///
/// Implementations must not block: the orchestrator calls `emit` from its
/// progress bridge and run tasks.
pub trait DownloadEventEmitterPort: Send + Sync {
    /// Emit a download event.
    fn emit(&self, event: DownloadEvent);

    /// Clone this emitter into a boxed trait object.
    fn clone_box(&self) -> Box<dyn DownloadEventEmitterPort>;
}

/// A no-op download event emitter for tests and headless contexts.
#[derive(Debug, Clone, Default)]
pub struct NoopDownloadEmitter;

impl NoopDownloadEmitter {
    /// Create a new no-op download emitter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl DownloadEventEmitterPort for NoopDownloadEmitter {
    fn emit(&self, _event: DownloadEvent) {}

    fn clone_box(&self) -> Box<dyn DownloadEventEmitterPort> {
        Box::new(self.clone())
    }
}

/// Fan-out emitter backed by a `tokio::sync::broadcast` channel.
///
/// Each subscriber gets every event sent after it subscribed. Slow
/// subscribers lose the oldest events (`RecvError::Lagged`) rather than
/// stalling the engine.
#[derive(Debug, Clone)]
pub struct BroadcastDownloadEmitter {
    tx: broadcast::Sender<DownloadEvent>,
}

impl BroadcastDownloadEmitter {
    /// Create an emitter buffering up to `capacity` events per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to events emitted from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DownloadEvent> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl DownloadEventEmitterPort for BroadcastDownloadEmitter {
    fn emit(&self, event: DownloadEvent) {
        // No subscribers is not an error.
        let _ = self.tx.send(event);
    }

    fn clone_box(&self) -> Box<dyn DownloadEventEmitterPort> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::{DownloadUpdate, TaskId, TaskStatus};
    use std::path::PathBuf;
    use std::sync::Arc;

    fn queued(id: &str) -> DownloadEvent {
        DownloadEvent::status(DownloadUpdate {
            task_id: TaskId::new(id),
            status: TaskStatus::Queued,
            received_bytes: 0,
            total_bytes: None,
            speed_bps: 0.0,
            eta_seconds: None,
            percent: None,
            filename: "a.zip".to_string(),
            save_path: PathBuf::from("/tmp/a.zip"),
            url: "http://localhost/a.zip".to_string(),
            appid: None,
            name: None,
            error: None,
        })
    }

    #[test]
    fn test_noop_emitter() {
        let emitter: Arc<dyn DownloadEventEmitterPort> = Arc::new(NoopDownloadEmitter::new());
        emitter.emit(queued("a"));
        let _boxed = emitter.clone_box();
    }

    #[test]
    fn test_broadcast_without_subscribers_does_not_panic() {
        let emitter = BroadcastDownloadEmitter::new(4);
        emitter.emit(queued("a"));
        assert_eq!(emitter.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_broadcast_fans_out() {
        let emitter = BroadcastDownloadEmitter::new(4);
        let mut first = emitter.subscribe();
        let mut second = emitter.subscribe();

        emitter.clone_box().emit(queued("a"));

        assert_eq!(first.recv().await.unwrap().task_id().as_str(), "a");
        assert_eq!(second.recv().await.unwrap().task_id().as_str(), "a");
    }
}
