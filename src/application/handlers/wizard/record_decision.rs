//! RecordDecisionHandler - Stores the user's decision for one expired item.

use crate::domain::foundation::{
    CommandMetadata, EventId, IdempotencyKey, ItemId, OfferId, Timestamp, WizardSessionId,
};
use crate::domain::wizard::{
    DecisionAction, DecisionSource, RecordOutcome, WizardDecisionRecorded, WizardError,
    WizardSession,
};

use super::services::WizardServices;

/// Command to decide one item.
#[derive(Debug, Clone)]
pub struct RecordDecisionCommand {
    /// Active session owned by the caller.
    pub session_id: WizardSessionId,
    /// One of the session's expired items.
    pub item_id: ItemId,
    /// `replace`, `skip` or `remove`
    pub action: String,
    /// Required for `replace`, rejected otherwise.
    pub suggestion_id: Option<OfferId>,
    /// Derived from the request contents when omitted.
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RecordDecisionResult {
    /// Session as stored after this call.
    pub session: WizardSession,
    /// True if the decision was already recorded and nothing changed.
    pub replayed: bool,
}

pub struct RecordDecisionHandler {
    services: WizardServices,
}

impl RecordDecisionHandler {
    pub fn new(services: WizardServices) -> Self {
        Self { services }
    }

    pub async fn handle(
        &self,
        cmd: RecordDecisionCommand,
        metadata: CommandMetadata,
    ) -> Result<RecordDecisionResult, WizardError> {
        let now = Timestamp::now();
        let action = DecisionAction::parse(cmd.item_id, &cmd.action, cmd.suggestion_id)?;
        let key = match cmd.idempotency_key {
            Some(key) => IdempotencyKey::new(key)?,
            None => derived_key(cmd.session_id, cmd.item_id, action),
        };

        let mut session = self
            .services
            .load_active(cmd.session_id, &metadata, now)
            .await?;

        let decision = match session.record_decision(
            cmd.item_id,
            action,
            key,
            DecisionSource::User,
            now,
        )? {
            RecordOutcome::Replayed => {
                tracing::debug!(
                    session_id = %session.id(),
                    item_id = %cmd.item_id,
                    "Decision already recorded"
                );
                return Ok(RecordDecisionResult {
                    session,
                    replayed: true,
                });
            }
            RecordOutcome::KeyBound => {
                self.services.save(&mut session, now).await?;
                tracing::debug!(
                    session_id = %session.id(),
                    item_id = %cmd.item_id,
                    "Decision unchanged, key bound to it"
                );
                return Ok(RecordDecisionResult {
                    session,
                    replayed: true,
                });
            }
            RecordOutcome::Recorded(decision) => decision,
        };

        self.services.save(&mut session, now).await?;

        tracing::info!(
            session_id = %session.id(),
            item_id = %decision.item_id,
            action = %decision.action,
            progress = session.progress().percent_complete,
            "Decision recorded"
        );

        let event = WizardDecisionRecorded {
            event_id: EventId::new(),
            session_id: session.id(),
            user_id: session.user_id().clone(),
            item_id: decision.item_id,
            action: decision.action,
            source: decision.source,
            decided_at: decision.decided_at,
        };
        self.services.publish(&event, &metadata).await;

        Ok(RecordDecisionResult {
            session,
            replayed: false,
        })
    }
}

/// Key for a request that came without one: the same decision on the same
/// item of the same session always maps to the same key.
fn derived_key(session_id: WizardSessionId, item_id: ItemId, action: DecisionAction) -> IdempotencyKey {
    let suggestion = action
        .suggestion_id()
        .map(|id| id.to_string())
        .unwrap_or_default();
    IdempotencyKey::derive(&[
        "record_decision",
        &session_id.to_string(),
        &item_id.to_string(),
        action.name(),
        &suggestion,
    ])
}
