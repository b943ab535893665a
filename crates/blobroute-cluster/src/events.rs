use tokio::sync::broadcast;

/// Signals emitted by the cluster client.
///
/// Cheap to clone; delivered on a broadcast channel so any number of
/// subscribers can observe lifecycle transitions and health diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterEvent {
    /// The first availability check completed; fired exactly once.
    Ready,
    /// The periodic availability check found unreachable nodes.
    AvailabilityCheckFailed {
        down_count: usize,
        /// Diagnostic probe URLs of the nodes that failed every attempt.
        status_urls: Vec<String>,
    },
    /// The asynchronous initialization path failed.
    InitFailed { message: String },
}

/// Broadcast bus for [`ClusterEvent`]s.
pub struct EventBus {
    tx: broadcast::Sender<ClusterEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClusterEvent> {
        self.tx.subscribe()
    }

    /// Send an event; a send with no subscribers is not an error.
    pub fn emit(&self, event: ClusterEvent) {
        let _ = self.tx.send(event);
    }
}
