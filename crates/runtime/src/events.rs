//! Broadcast fan-out of combat events.

use combat_core::OutboundEvent;
use tokio::sync::broadcast;

/// Cloneable handle on the shared outbound event channel.
///
/// Session gateways, logging, and tools subscribe here; partitions publish
/// after every drained outbox. A lagging subscriber loses its oldest
/// events per broadcast semantics, so combat never blocks on a slow reader.
#[derive(Clone, Debug)]
pub struct EventBus {
    tx: broadcast::Sender<OutboundEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OutboundEvent> {
        self.tx.subscribe()
    }

    /// Publishes one event, returning how many subscribers will see it.
    /// Zero subscribers is not an error.
    pub fn publish(&self, event: OutboundEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
