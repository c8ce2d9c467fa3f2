//! QueuedEventPublisher - bounded, non-blocking front for a slower publisher.
//!
//! Handlers hand events to a tokio mpsc queue and return immediately. One
//! worker task drains the queue into the inner publisher.
//!
//! | Situation | Behavior |
//! |-----------|----------|
//! | queue has room | event enqueued, `Ok(())` |
//! | queue full | event dropped, drop counter bumped, `warn!`, `Ok(())` |
//! | worker gone | `Err(InternalError)` |
//! | inner publish fails | worker logs `warn!` and moves on |
//!
//! The worker stops once every publisher clone is dropped and the queue is
//! drained; await [`EventWorker::join`] to flush on shutdown.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::domain::foundation::{DomainError, ErrorCode, EventEnvelope};
use crate::ports::EventPublisher;

#[derive(Clone)]
pub struct QueuedEventPublisher {
    sender: mpsc::Sender<EventEnvelope>,
    dropped: Arc<AtomicU64>,
}

/// Owns the worker task draining the queue.
#[derive(Debug)]
pub struct EventWorker {
    handle: JoinHandle<u64>,
}

impl EventWorker {
    /// Waits until the queue is closed and drained. Returns how many events
    /// the inner publisher accepted.
    pub async fn join(self) -> Result<u64, DomainError> {
        self.handle.await.map_err(|e| {
            DomainError::new(ErrorCode::InternalError, format!("event worker failed: {}", e))
        })
    }
}

impl QueuedEventPublisher {
    /// Starts the worker on the current tokio runtime.
    pub fn spawn(inner: Arc<dyn EventPublisher>, capacity: usize) -> (Self, EventWorker) {
        let (sender, mut receiver) = mpsc::channel::<EventEnvelope>(capacity.max(1));

        let handle = tokio::spawn(async move {
            let mut delivered = 0u64;
            while let Some(event) = receiver.recv().await {
                let event_type = event.event_type.clone();
                let event_id = event.event_id.clone();
                match inner.publish(event).await {
                    Ok(()) => delivered += 1,
                    Err(e) => tracing::warn!(
                        event_type = %event_type,
                        event_id = %event_id,
                        error = %e,
                        "Failed to publish event"
                    ),
                }
            }
            tracing::debug!(delivered, "Event worker stopped");
            delivered
        });

        let publisher = Self {
            sender,
            dropped: Arc::new(AtomicU64::new(0)),
        };
        (publisher, EventWorker { handle })
    }

    /// Events discarded because the queue was full.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl EventPublisher for QueuedEventPublisher {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
        match self.sender.try_send(event) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(event)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::warn!(
                    event_type = %event.event_type,
                    event_id = %event.event_id,
                    dropped,
                    "Event queue full, dropping event"
                );
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(event)) => Err(DomainError::new(
                ErrorCode::InternalError,
                format!("event queue closed, lost {}", event.event_type),
            )),
        }
    }
}

impl std::fmt::Debug for QueuedEventPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuedEventPublisher")
            .field("capacity", &self.sender.max_capacity())
            .field("dropped", &self.dropped_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::events::in_memory::test_envelopes::envelope;
    use crate::adapters::events::InMemoryEventBus;
    use tokio::sync::Notify;

    /// Blocks every publish until released, so the queue can be filled.
    struct GatedPublisher {
        gate: Arc<Notify>,
        inner: Arc<InMemoryEventBus>,
    }

    #[async_trait]
    impl EventPublisher for GatedPublisher {
        async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
            self.gate.notified().await;
            self.inner.publish(event).await
        }
    }

    #[tokio::test]
    async fn forwards_events_to_inner_publisher() {
        let bus = Arc::new(InMemoryEventBus::new());
        let (publisher, worker) = QueuedEventPublisher::spawn(bus.clone(), 8);

        publisher.publish(envelope("wizard.started", "s-1")).await.unwrap();
        publisher.publish(envelope("wizard.completed", "s-1")).await.unwrap();
        drop(publisher);

        assert_eq!(worker.join().await.unwrap(), 2);
        assert_eq!(bus.event_count(), 2);
    }

    #[tokio::test]
    async fn full_queue_drops_and_counts() {
        let bus = Arc::new(InMemoryEventBus::new());
        let gate = Arc::new(Notify::new());
        let gated = Arc::new(GatedPublisher {
            gate: gate.clone(),
            inner: bus.clone(),
        });
        let (publisher, worker) = QueuedEventPublisher::spawn(gated, 1);

        // The worker takes the first event and blocks on the gate; the
        // second fills the queue; the rest overflow.
        for i in 0..5 {
            publisher
                .publish(envelope("wizard.decision_recorded", &format!("s-{}", i)))
                .await
                .unwrap();
            tokio::task::yield_now().await;
        }
        let dropped = publisher.dropped_count();
        assert!(dropped >= 3, "expected at least 3 drops, got {}", dropped);

        drop(publisher);
        for _ in 0..5 {
            gate.notify_one();
            tokio::task::yield_now().await;
        }
        let delivered = worker.join().await.unwrap();
        assert_eq!(delivered + dropped, 5);
    }

    #[tokio::test]
    async fn inner_failures_do_not_stop_the_worker() {
        let bus = Arc::new(InMemoryEventBus::new());
        bus.set_failing(true);
        let (publisher, worker) = QueuedEventPublisher::spawn(bus.clone(), 4);

        publisher.publish(envelope("wizard.started", "s-1")).await.unwrap();
        drop(publisher);

        assert_eq!(worker.join().await.unwrap(), 0);
    }
}
