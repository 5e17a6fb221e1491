//! Single-process pub/sub for state-change events: each subscriber gets
//! its own bounded channel, and a broadcaster that can't keep up with a
//! slow subscriber drops that subscriber rather than blocking everyone
//! else.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

use recall_types::BusEvent;

/// Per-subscriber channel capacity. A subscriber whose receiver can't keep
/// up within this many buffered events is evicted on the next broadcast.
const SUBSCRIBER_CAPACITY: usize = 256;

pub type SubscriberId = u64;

struct Subscriber {
    id: SubscriberId,
    tx: mpsc::Sender<BusEvent>,
}

/// Fan-out bus. Cheaply `Clone`d (an `Arc` around the subscriber list), so
/// it is handed to every component that needs to publish or the protocol
/// layer that needs to subscribe on behalf of a viewer connection.
#[derive(Clone)]
pub struct EventBus {
    subscribers: Arc<RwLock<Vec<Subscriber>>>,
    next_id: Arc<AtomicU64>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(Vec::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Registers a new viewer connection. The returned receiver yields
    /// events from the moment of subscription onward; no replay.
    pub async fn subscribe(&self) -> (SubscriberId, mpsc::Receiver<BusEvent>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CAPACITY);
        self.subscribers.write().await.push(Subscriber { id, tx });
        (id, rx)
    }

    /// Removes a subscriber explicitly, e.g. on SSE connection close.
    pub async fn unsubscribe(&self, id: SubscriberId) {
        self.subscribers.write().await.retain(|s| s.id != id);
    }

    /// Broadcasts `event` to every live subscriber. A subscriber whose
    /// channel is full is evicted rather than awaited on; slow viewers
    /// never back-pressure ingestion.
    pub async fn publish(&self, event: BusEvent) {
        // Snapshot-clone the sender list so the publish loop never holds
        // the subscribers lock across a potentially-blocking send
        // (concurrency model: "broadcasting does not hold the subscribe
        // mutex").
        let snapshot: Vec<(SubscriberId, mpsc::Sender<BusEvent>)> = {
            let subs = self.subscribers.read().await;
            subs.iter().map(|s| (s.id, s.tx.clone())).collect()
        };

        let mut evicted = Vec::new();
        for (id, tx) in snapshot {
            if tx.try_send(event.clone()).is_err() {
                evicted.push(id);
            }
        }

        if !evicted.is_empty() {
            let mut subs = self.subscribers.write().await;
            subs.retain(|s| !evicted.contains(&s.id));
            tracing::debug!(count = evicted.len(), "evicted slow event bus subscribers");
        }
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let bus = EventBus::new();
        let (_id, mut rx) = bus.subscribe().await;
        bus.publish(BusEvent::SessionStarted {
            session_db_id: 1,
            project: "demo".to_string(),
        })
        .await;
        let received = rx.recv().await.unwrap();
        match received {
            BusEvent::SessionStarted { session_db_id, project } => {
                assert_eq!(session_db_id, 1);
                assert_eq!(project, "demo");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn disconnected_subscriber_does_not_affect_others() {
        let bus = EventBus::new();
        let (id_a, rx_a) = bus.subscribe().await;
        let (_id_b, mut rx_b) = bus.subscribe().await;
        drop(rx_a);
        bus.unsubscribe(id_a).await;

        bus.publish(BusEvent::ProcessingStatus {
            is_processing: true,
            queue_depth: 3,
        })
        .await;

        let received = rx_b.recv().await.unwrap();
        assert!(matches!(received, BusEvent::ProcessingStatus { queue_depth: 3, .. }));
        assert_eq!(bus.subscriber_count().await, 1);
    }

    #[tokio::test]
    async fn full_channel_evicts_subscriber_without_blocking() {
        let bus = EventBus::new();
        let (id, _rx) = bus.subscribe().await; // receiver never polled

        for _ in 0..(SUBSCRIBER_CAPACITY + 5) {
            bus.publish(BusEvent::ObservationQueued { session_db_id: 1 }).await;
        }

        assert_eq!(bus.subscriber_count().await, 0);
        let _ = id;
    }
}
