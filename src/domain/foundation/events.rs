//! Domain events and the envelope they travel in.
//!
//! Events are plain serde structs. `domain_event!` wires one up as a
//! `DomainEvent`; `EventEnvelope::from_event` turns it into the JSON-carrying
//! shape publishers deal with.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use uuid::Uuid;

use super::Timestamp;

/// Identity and routing data every event exposes.
pub trait DomainEvent: Send + Sync {
    /// Dotted routing name, e.g. `wizard.completed`.
    fn event_type(&self) -> &'static str;

    /// Session (or other aggregate) the event belongs to.
    fn aggregate_id(&self) -> String;

    fn occurred_at(&self) -> Timestamp;

    fn event_id(&self) -> EventId;
}

/// Implements `DomainEvent` for a struct with an `event_id: EventId` field.
///
/// ```ignore
/// domain_event!(WizardStarted, "wizard.started", session_id, started_at);
/// ```
#[macro_export]
macro_rules! domain_event {
    ($event:ident, $event_type:literal, $aggregate:ident, $occurred:ident) => {
        impl $crate::domain::foundation::DomainEvent for $event {
            fn event_type(&self) -> &'static str {
                $event_type
            }

            fn aggregate_id(&self) -> String {
                self.$aggregate.to_string()
            }

            fn occurred_at(&self) -> $crate::domain::foundation::Timestamp {
                self.$occurred
            }

            fn event_id(&self) -> $crate::domain::foundation::EventId {
                self.event_id.clone()
            }
        }
    };
}

pub use domain_event;

/// Unique per event instance; consumers deduplicate on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Request context copied from the command that caused the event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// What publishers receive: routing fields plus the event as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event_id: EventId,
    pub event_type: String,
    pub aggregate_id: String,
    pub occurred_at: Timestamp,
    pub payload: JsonValue,
    pub metadata: EventMetadata,
}

impl EventEnvelope {
    pub fn from_event<T>(event: &T) -> Result<Self, serde_json::Error>
    where
        T: DomainEvent + Serialize,
    {
        Ok(Self {
            event_id: event.event_id(),
            event_type: event.event_type().to_string(),
            aggregate_id: event.aggregate_id(),
            occurred_at: event.occurred_at(),
            payload: serde_json::to_value(event)?,
            metadata: EventMetadata::default(),
        })
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.metadata.correlation_id = Some(id.into());
        self
    }

    pub fn with_user_id(mut self, id: impl Into<String>) -> Self {
        self.metadata.user_id = Some(id.into());
        self
    }

    /// Decodes the payload back into the concrete event.
    pub fn payload_as<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct ListTouched {
        event_id: EventId,
        list: String,
        at: Timestamp,
    }

    domain_event!(ListTouched, "list.touched", list, at);

    fn touched() -> ListTouched {
        ListTouched {
            event_id: EventId::from_string("evt-1"),
            list: "list-9".to_string(),
            at: Timestamp::from_unix_secs(100),
        }
    }

    #[test]
    fn event_ids_are_unique() {
        assert_ne!(EventId::new(), EventId::new());
    }

    #[test]
    fn envelope_carries_identity_and_context() {
        let envelope = EventEnvelope::from_event(&touched())
            .unwrap()
            .with_correlation_id("corr")
            .with_user_id("user-1");

        assert_eq!(envelope.event_id.as_str(), "evt-1");
        assert_eq!(envelope.event_type, "list.touched");
        assert_eq!(envelope.aggregate_id, "list-9");
        assert_eq!(envelope.occurred_at, Timestamp::from_unix_secs(100));
        assert_eq!(envelope.metadata.correlation_id.as_deref(), Some("corr"));
        assert_eq!(envelope.metadata.user_id.as_deref(), Some("user-1"));
    }

    #[test]
    fn payload_decodes_to_the_original_event() {
        let envelope = EventEnvelope::from_event(&touched()).unwrap();

        let restored: ListTouched = envelope.payload_as().unwrap();

        assert_eq!(restored.list, "list-9");
    }

    #[test]
    fn unset_metadata_is_omitted_from_json() {
        let json = serde_json::to_value(EventEnvelope::from_event(&touched()).unwrap()).unwrap();
        assert_eq!(json["metadata"], serde_json::json!({}));
    }
}
