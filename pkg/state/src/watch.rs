use tokio::sync::broadcast;

/// Type of change recorded in the watch log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    Put,
    Delete,
}

/// A single watch event naming the mutated key.
///
/// Carries no value: watchers are level-triggered and re-read the store,
/// so a stale or dropped event never leads to acting on stale data.
#[derive(Debug, Clone)]
pub struct WatchEvent {
    pub event_type: EventType,
    pub key: String,
}

/// Broadcast fan-out of store mutations.
///
/// A lagging subscriber loses the oldest events (broadcast semantics); the
/// controllers' periodic resync covers any gap, so overall delivery of
/// "this key may have changed" stays at-least-once.
#[derive(Clone)]
pub struct EventLog {
    sender: broadcast::Sender<WatchEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1024);
        Self { sender }
    }

    /// Record a mutation. Called by the store on every put/delete.
    pub fn emit(&self, event_type: EventType, key: String) {
        // No receivers is fine: nobody is watching yet.
        let _ = self.sender.send(WatchEvent { event_type, key });
    }

    /// Subscribe to receive new events as they are emitted.
    pub fn subscribe(&self) -> broadcast::Receiver<WatchEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}
