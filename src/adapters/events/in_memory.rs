//! Event publisher that keeps everything it receives.
//!
//! Used in tests and for single-process runs without a broker. It can be
//! told to reject publishes to exercise the best-effort paths.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::domain::foundation::{DomainError, ErrorCode, EventEnvelope};
use crate::ports::EventPublisher;

#[derive(Debug, Default)]
pub struct InMemoryEventBus {
    received: Mutex<Vec<EventEnvelope>>,
    reject: AtomicBool,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every publish fails and nothing is kept.
    pub fn set_failing(&self, failing: bool) {
        self.reject.store(failing, Ordering::SeqCst);
    }

    pub fn event_count(&self) -> usize {
        self.received().len()
    }

    pub fn has_event(&self, event_type: &str) -> bool {
        self.received().iter().any(|e| e.event_type == event_type)
    }

    /// Event types in publish order.
    pub fn event_types(&self) -> Vec<String> {
        self.received().iter().map(|e| e.event_type.clone()).collect()
    }

    pub fn events_of_type(&self, event_type: &str) -> Vec<EventEnvelope> {
        self.matching(|e| e.event_type == event_type)
    }

    /// Everything published for one wizard session, in order.
    pub fn events_for_aggregate(&self, aggregate_id: &str) -> Vec<EventEnvelope> {
        self.matching(|e| e.aggregate_id == aggregate_id)
    }

    fn matching(&self, pred: impl Fn(&EventEnvelope) -> bool) -> Vec<EventEnvelope> {
        self.received().iter().filter(|e| pred(e)).cloned().collect()
    }

    // Poisoning only means another test thread panicked mid-push.
    fn received(&self) -> MutexGuard<'_, Vec<EventEnvelope>> {
        self.received
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(DomainError::new(
                ErrorCode::InternalError,
                format!("event bus rejected {}", event.event_type),
            )
            .with_detail("eventId", event.event_id.to_string()));
        }
        self.received().push(event);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_envelopes {
    use crate::domain::foundation::{EventEnvelope, EventId, EventMetadata, Timestamp};

    /// A bare envelope with an empty payload.
    pub(crate) fn envelope(event_type: &str, session: &str) -> EventEnvelope {
        EventEnvelope {
            event_id: EventId::new(),
            event_type: event_type.to_string(),
            aggregate_id: session.to_string(),
            occurred_at: Timestamp::now(),
            payload: serde_json::Value::Object(Default::default()),
            metadata: EventMetadata::default(),
        }
    }
}
