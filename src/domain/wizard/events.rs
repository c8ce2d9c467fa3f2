//! Wizard domain events.
//!
//! - `WizardStarted` - session created and list locked
//! - `WizardDecisionRecorded` - a decision was stored (user or bulk)
//! - `WizardCompleted` - decisions applied to the list
//! - `WizardCancelled` - session abandoned by the user
//! - `WizardExpired` - session found past its TTL

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    domain_event, EventId, ItemId, ShoppingListId, Timestamp, UserId, WizardSessionId,
};

use super::decision::{DecisionAction, DecisionSource};
use super::summary::MigrationSummary;

// ════════════════════════════════════════════════════════════════════════════
// WizardStarted
// ════════════════════════════════════════════════════════════════════════════

/// Published when a wizard session is created for a list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WizardStarted {
    pub event_id: EventId,
    pub session_id: WizardSessionId,
    pub user_id: UserId,
    pub list_id: ShoppingListId,
    /// Number of expired items in the snapshot.
    pub item_count: usize,
    pub started_at: Timestamp,
}

domain_event!(WizardStarted, "wizard.started", session_id, started_at);

// ════════════════════════════════════════════════════════════════════════════
// WizardDecisionRecorded
// ════════════════════════════════════════════════════════════════════════════

/// Published once per stored decision; replays publish nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WizardDecisionRecorded {
    pub event_id: EventId,
    pub session_id: WizardSessionId,
    pub user_id: UserId,
    pub item_id: ItemId,
    pub action: DecisionAction,
    pub source: DecisionSource,
    pub decided_at: Timestamp,
}

domain_event!(WizardDecisionRecorded, "wizard.decision_recorded", session_id, decided_at);

// ════════════════════════════════════════════════════════════════════════════
// WizardCompleted
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WizardCompleted {
    pub event_id: EventId,
    pub session_id: WizardSessionId,
    pub user_id: UserId,
    pub list_id: ShoppingListId,
    pub summary: MigrationSummary,
    pub completed_at: Timestamp,
}

domain_event!(WizardCompleted, "wizard.completed", session_id, completed_at);

// ════════════════════════════════════════════════════════════════════════════
// WizardCancelled
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WizardCancelled {
    pub event_id: EventId,
    pub session_id: WizardSessionId,
    pub user_id: UserId,
    pub list_id: ShoppingListId,
    /// Decisions discarded by the cancellation.
    pub discarded_decisions: usize,
    pub cancelled_at: Timestamp,
}

domain_event!(WizardCancelled, "wizard.cancelled", session_id, cancelled_at);

// ════════════════════════════════════════════════════════════════════════════
// WizardExpired
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WizardExpired {
    pub event_id: EventId,
    pub session_id: WizardSessionId,
    pub user_id: UserId,
    pub list_id: ShoppingListId,
    /// The deadline that passed.
    pub expires_at: Timestamp,
    pub expired_at: Timestamp,
}

domain_event!(WizardExpired, "wizard.expired", session_id, expired_at);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{DomainEvent, EventEnvelope};

    #[test]
    fn started_event_wraps_into_envelope() {
        let session_id = WizardSessionId::new();
        let event = WizardStarted {
            event_id: EventId::new(),
            session_id,
            user_id: UserId::new("user-1").unwrap(),
            list_id: ShoppingListId::new(42),
            item_count: 3,
            started_at: Timestamp::from_unix_secs(1_700_000_000),
        };

        assert_eq!(event.event_type(), "wizard.started");
        let envelope = EventEnvelope::from_event(&event).unwrap();
        assert_eq!(envelope.aggregate_id, session_id.to_string());
        assert_eq!(envelope.payload["item_count"], 3);
    }

    #[test]
    fn decision_event_round_trips_payload() {
        let event = WizardDecisionRecorded {
            event_id: EventId::new(),
            session_id: WizardSessionId::new(),
            user_id: UserId::new("user-1").unwrap(),
            item_id: ItemId::new(7),
            action: DecisionAction::Skip,
            source: DecisionSource::BulkAccept,
            decided_at: Timestamp::from_unix_secs(1),
        };

        let envelope = EventEnvelope::from_event(&event).unwrap();
        let restored: WizardDecisionRecorded = envelope.payload_as().unwrap();
        assert_eq!(restored.item_id, ItemId::new(7));
        assert_eq!(restored.source, DecisionSource::BulkAccept);
    }
}
