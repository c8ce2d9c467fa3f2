//! EventPublisher port - where wizard events leave the service.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, EventEnvelope};

/// Delivers envelopes to whatever transport sits behind it.
///
/// Handlers publish best effort: an `Err` here is logged by the caller and
/// never undoes the state change that produced the event.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError>;

    /// Publishes in order, stopping at the first failure.
    async fn publish_all(&self, events: Vec<EventEnvelope>) -> Result<(), DomainError> {
        for event in events {
            self.publish(event).await?;
        }
        Ok(())
    }
}
