//! CompleteWizardHandler - Applies the recorded decisions to the list.
//!
//! Steps, each re-checked against the freshly loaded session:
//!
//! 1. Replay: a completed session returns the result stored under the
//!    same key.
//! 2. Revalidate chosen offers if the catalog moved on since the start.
//! 3. Freeze the decisions with a conditional save, so nothing recorded
//!    after this point can miss the list.
//! 4. Apply all item changes in one all-or-nothing call. On failure the
//!    session stays `Active` and frozen, and the call can be retried.
//! 5. Mark the session `Completed`, then release the list lock.

use std::collections::HashSet;

use crate::domain::foundation::{
    CommandMetadata, EventId, IdempotencyKey, ItemId, OfferId, Timestamp, WizardSessionId,
};
use crate::domain::wizard::{
    DecisionAction, WizardCompleted, WizardError, WizardResult, WizardSession,
};
use crate::ports::ApplyOutcome;

use super::services::{logged, WizardServices};

#[derive(Debug, Clone)]
pub struct CompleteWizardCommand {
    /// Session to finalize.
    pub session_id: WizardSessionId,
    /// Defaults to one key per session, so any retry replays.
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CompleteWizardResult {
    /// Summary and store selections, identical on every replay.
    pub result: WizardResult,
    /// True if an earlier call already completed the session.
    pub replayed: bool,
}

pub struct CompleteWizardHandler {
    services: WizardServices,
}

impl CompleteWizardHandler {
    pub fn new(services: WizardServices) -> Self {
        Self { services }
    }

    pub async fn handle(
        &self,
        cmd: CompleteWizardCommand,
        metadata: CommandMetadata,
    ) -> Result<CompleteWizardResult, WizardError> {
        let now = Timestamp::now();
        let key = match cmd.idempotency_key {
            Some(key) => IdempotencyKey::new(key)?,
            None => IdempotencyKey::derive(&["complete_wizard", &cmd.session_id.to_string()]),
        };

        let mut session = self
            .services
            .load_owned(cmd.session_id, &metadata, now)
            .await?;

        // 1. Replay
        if let Some(result) = session.completed_result(&key) {
            tracing::debug!(session_id = %session.id(), "Replaying CompleteWizard");
            return Ok(CompleteWizardResult {
                result: result.clone(),
                replayed: true,
            });
        }
        session.ensure_active()?;

        // 2. Revalidate
        self.revalidate(&session, now).await?;

        // 3. Freeze
        if session.begin_finalizing(now)? {
            self.services.save(&mut session, now).await?;
        }

        // 4. Apply
        let changes = session.planned_changes();
        let outcome = self
            .services
            .lists
            .apply_migration(session.list_id(), session.id(), &changes)
            .await
            .map_err(logged("lists.apply_migration"))?;
        if outcome == ApplyOutcome::AlreadyApplied {
            tracing::info!(
                session_id = %session.id(),
                "Changes were applied by an earlier attempt"
            );
        }

        // 5. Complete and unlock
        let result = session.complete(key, now)?;
        self.services.save(&mut session, now).await?;
        self.services
            .release_list_lock(session.list_id(), session.id())
            .await;

        tracing::info!(
            session_id = %session.id(),
            list_id = %session.list_id(),
            migrated = result.summary.items_migrated,
            skipped = result.summary.items_skipped,
            removed = result.summary.items_removed,
            undecided = result.summary.items_undecided,
            "Wizard completed"
        );

        let event = WizardCompleted {
            event_id: EventId::new(),
            session_id: session.id(),
            user_id: session.user_id().clone(),
            list_id: session.list_id(),
            summary: result.summary.clone(),
            completed_at: now,
        };
        self.services.publish(&event, &metadata).await;

        Ok(CompleteWizardResult {
            result,
            replayed: false,
        })
    }

    /// Nothing to check while the catalog still serves the snapshot the
    /// suggestions came from.
    ///
    /// # Errors
    ///
    /// - `StaleData` on any version change in strict mode
    /// - `RevalidationFailed` for the first chosen offer that is no
    ///   longer active
    async fn revalidate(&self, session: &WizardSession, now: Timestamp) -> Result<(), WizardError> {
        let current = self
            .services
            .catalog
            .current_dataset_version()
            .await
            .map_err(logged("catalog.current_dataset_version"))?;
        if &current == session.dataset_version() {
            return Ok(());
        }

        if self.services.config.strict_dataset_version {
            return Err(WizardError::StaleData {
                expected: session.dataset_version().clone(),
                actual: current,
            });
        }

        let chosen: Vec<(ItemId, OfferId)> = session
            .decisions()
            .iter()
            .filter_map(|d| match d.action {
                DecisionAction::Replace { suggestion_id } => Some((d.item_id, suggestion_id)),
                DecisionAction::Skip | DecisionAction::Remove => None,
            })
            .collect();
        if chosen.is_empty() {
            return Ok(());
        }

        let offer_ids: Vec<OfferId> = chosen.iter().map(|(_, offer)| *offer).collect();
        let active: HashSet<OfferId> = self
            .services
            .catalog
            .active_offers(&offer_ids, now)
            .await
            .map_err(logged("catalog.active_offers"))?;

        if let Some((item_id, offer_id)) = chosen.into_iter().find(|(_, o)| !active.contains(o)) {
            tracing::info!(
                session_id = %session.id(),
                item_id = %item_id,
                offer_id = %offer_id,
                "Chosen offer is no longer active"
            );
            return Err(WizardError::revalidation_failed(
                item_id,
                Some(offer_id),
                "the chosen offer is no longer active",
            ));
        }
        Ok(())
    }
}
