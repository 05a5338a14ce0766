use tokio::sync::broadcast;

use super::SyncEvent;

/// Broadcaster for sync lifecycle events.
#[derive(Debug, Clone)]
pub struct SyncEvents {
    sender: broadcast::Sender<SyncEvent>,
}

impl SyncEvents {
    /// Create a new broadcaster with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn emit(&self, event: SyncEvent) {
        // No subscribers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.sender.subscribe()
    }
}

impl Default for SyncEvents {
    fn default() -> Self {
        Self::new(64)
    }
}
