//! BulkAcceptSuggestionsHandler - Accepts top suggestions for every
//! undecided item, keeping the number of destination stores capped.

use crate::domain::foundation::{CommandMetadata, EventId, Timestamp, WizardSessionId};
use crate::domain::wizard::{WizardDecisionRecorded, WizardError, WizardSession};

use super::services::WizardServices;

/// Accepts suggestions for every item still undecided.
#[derive(Debug, Clone)]
pub struct BulkAcceptSuggestionsCommand {
    /// Session whose undecided items get decided.
    pub session_id: WizardSessionId,
}

#[derive(Debug, Clone)]
pub struct BulkAcceptSuggestionsResult {
    /// Session after the accepted decisions were stored.
    pub session: WizardSession,
    /// Decisions added by this call; zero on a repeated call.
    pub accepted: usize,
}

pub struct BulkAcceptSuggestionsHandler {
    services: WizardServices,
}

impl BulkAcceptSuggestionsHandler {
    pub fn new(services: WizardServices) -> Self {
        Self { services }
    }

    pub async fn handle(
        &self,
        cmd: BulkAcceptSuggestionsCommand,
        metadata: CommandMetadata,
    ) -> Result<BulkAcceptSuggestionsResult, WizardError> {
        let now = Timestamp::now();
        let mut session = self
            .services
            .load_active(cmd.session_id, &metadata, now)
            .await?;

        let added = session.bulk_accept(self.services.config.max_stores, now)?;
        if added.is_empty() {
            tracing::debug!(session_id = %session.id(), "Bulk accept found nothing to decide");
            return Ok(BulkAcceptSuggestionsResult {
                session,
                accepted: 0,
            });
        }

        self.services.save(&mut session, now).await?;

        tracing::info!(
            session_id = %session.id(),
            accepted = added.len(),
            stores = session.selected_stores().len(),
            "Bulk accepted suggestions"
        );

        for decision in &added {
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
        }

        Ok(BulkAcceptSuggestionsResult {
            session,
            accepted: added.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::wizard::test_support::Harness;
    use crate::domain::foundation::ItemId;
    use crate::domain::wizard::DecisionSource;

    fn bulk(session_id: WizardSessionId) -> BulkAcceptSuggestionsCommand {
        BulkAcceptSuggestionsCommand { session_id }
    }

    #[tokio::test]
    async fn decides_every_item_within_store_cap() {
        let h = Harness::new().await;
        let session = h.start().await;

        let result = h
            .bulk_handler()
            .handle(bulk(session.id()), h.owner())
            .await
            .unwrap();

        assert_eq!(result.accepted, 3);
        assert!(result.session.selected_stores().len() <= 2);
        assert!(result
            .session
            .decisions()
            .iter()
            .all(|d| d.source == DecisionSource::BulkAccept));
        assert_eq!(h.stored(session.id()).await.decisions().len(), 3);
        assert_eq!(h.events.events_of_type("wizard.decision_recorded").len(), 3);
    }

    #[tokio::test]
    async fn repeated_bulk_accept_changes_nothing() {
        let h = Harness::new().await;
        let session = h.start().await;
        let first = h
            .bulk_handler()
            .handle(bulk(session.id()), h.owner())
            .await
            .unwrap();

        let second = h
            .bulk_handler()
            .handle(bulk(session.id()), h.owner())
            .await
            .unwrap();

        assert_eq!(second.accepted, 0);
        assert_eq!(second.session.decisions(), first.session.decisions());
        assert_eq!(second.session.revision(), first.session.revision());
    }

    #[tokio::test]
    async fn keeps_user_decisions() {
        let h = Harness::new().await;
        let session = h.start().await;
        h.skip(session.id(), 1).await;

        let result = h
            .bulk_handler()
            .handle(bulk(session.id()), h.owner())
            .await
            .unwrap();

        assert_eq!(result.accepted, 2);
        let first = result.session.decision_for(ItemId::new(1)).unwrap();
        assert_eq!(first.source, DecisionSource::User);
    }

    #[tokio::test]
    async fn stranger_cannot_bulk_accept() {
        let h = Harness::new().await;
        let session = h.start().await;

        let err = h
            .bulk_handler()
            .handle(bulk(session.id()), h.stranger())
            .await
            .unwrap_err();

        assert_eq!(err, WizardError::Unauthorized);
    }
}
