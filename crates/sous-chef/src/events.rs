//! Event bus.
//!
//! Every state change publishes a [`ChefEvent`] wrapped in an
//! [`EventRecord`] on a broadcast channel. Publishing with no subscribers is
//! fine; lagging subscribers lose the oldest records.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use sous_types::events::{ChefEvent, EventRecord};
use sous_types::BlockNumber;
use tokio::sync::broadcast;

/// Default number of records buffered per subscriber.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Broadcasts events to subscribers.
#[derive(Clone, Debug)]
pub struct EventBus {
    sender: broadcast::Sender<EventRecord>,
    sequence: Arc<AtomicU64>,
}

impl EventBus {
    /// Create a bus buffering `capacity` records per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Publish an event that happened in `block`.
    pub fn emit(&self, block: BlockNumber, event: ChefEvent) -> EventRecord {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let record = EventRecord {
            sequence,
            block,
            event,
        };
        // No subscribers is not an error.
        let _ = self.sender.send(record.clone());
        record
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.sender.subscribe()
    }

    /// Number of events published so far.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
