//! StartWizardHandler - Opens a migration wizard for a shopping list.

use crate::domain::foundation::{
    CommandMetadata, EventId, IdempotencyKey, ShoppingListId, Timestamp, UserId,
};
use crate::domain::wizard::{
    ExpiredItem, NewWizardSession, SuggestionEngine, WizardError, WizardSession, WizardStarted,
};
use crate::ports::{RateLimitKey, RateLimitQuota, RateLimitResult, ShoppingList};

use super::services::{logged, WizardServices};

/// Rate-limit resource name for session creation.
const START_RESOURCE: &str = "wizard_start";

/// Command to start a wizard on a list owned by the caller.
#[derive(Debug, Clone)]
pub struct StartWizardCommand {
    /// List to migrate; the caller must own it.
    pub list_id: ShoppingListId,
    /// Client key; resending it while the session is active returns the
    /// same session.
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StartWizardResult {
    /// Active session holding the list lock.
    pub session: WizardSession,
    /// True if an earlier call with the same key created the session.
    pub replayed: bool,
}

/// Handler for starting wizard sessions.
pub struct StartWizardHandler {
    services: WizardServices,
    engine: SuggestionEngine,
}

impl StartWizardHandler {
    pub fn new(services: WizardServices) -> Self {
        let engine = SuggestionEngine::new(
            services.config.max_suggestions_per_item,
            services.config.min_candidate_similarity,
        );
        Self { services, engine }
    }

    pub async fn handle(
        &self,
        cmd: StartWizardCommand,
        metadata: CommandMetadata,
    ) -> Result<StartWizardResult, WizardError> {
        let now = Timestamp::now();
        let user_id = &metadata.user_id;
        let start_key = cmd.idempotency_key.map(IdempotencyKey::new).transpose()?;

        // 1. Load the list and check ownership
        let list = self
            .services
            .lists
            .get_by_id(cmd.list_id)
            .await
            .map_err(logged("lists.get_by_id"))?
            .ok_or_else(|| WizardError::list_not_found(cmd.list_id))?;
        if !list.is_owned_by(user_id) {
            return Err(WizardError::Unauthorized);
        }

        // 2. Replay a start that already went through
        if let Some(key) = &start_key {
            if let Some(session) = self.replayable(&list, user_id, key, now).await? {
                tracing::debug!(
                    session_id = %session.id(),
                    list_id = %list.id,
                    "Replaying StartWizard"
                );
                return Ok(StartWizardResult {
                    session,
                    replayed: true,
                });
            }
        }

        // 3. Throttle session creation
        self.check_rate_limit(user_id).await?;

        // 4. Snapshot expired items with their suggestions
        let dataset_version = self
            .services
            .catalog
            .current_dataset_version()
            .await
            .map_err(logged("catalog.current_dataset_version"))?;
        let expired_items = self.snapshot_items(list.id, now).await?;

        // 5. Persist the new session
        let session = WizardSession::start(
            NewWizardSession {
                user_id: user_id.clone(),
                list_id: list.id,
                expired_items,
                dataset_version: dataset_version.clone(),
                start_key,
                ttl_secs: self.services.config.session_ttl_secs,
            },
            now,
        );
        let ttl = session.storage_ttl_secs(now, self.services.config.terminal_retention_secs);
        self.services
            .sessions
            .set(&session, ttl)
            .await
            .map_err(logged("sessions.set"))?;

        // 6. Lock the list; the session must not outlive a failed lock
        if let Err(err) = self
            .services
            .acquire_list_lock(&list, session.id(), now)
            .await
        {
            self.discard(&session).await;
            if let WizardError::ListLocked { locked_by, .. } = &err {
                tracing::debug!(
                    list_id = %list.id,
                    locked_by = ?locked_by,
                    "List already has an active wizard"
                );
            }
            return Err(err);
        }

        tracing::info!(
            session_id = %session.id(),
            list_id = %list.id,
            user_id = %user_id,
            items = session.expired_items().len(),
            dataset_version = %dataset_version,
            "Wizard started"
        );

        let event = WizardStarted {
            event_id: EventId::new(),
            session_id: session.id(),
            user_id: user_id.clone(),
            list_id: list.id,
            item_count: session.expired_items().len(),
            started_at: now,
        };
        self.services.publish(&event, &metadata).await;

        Ok(StartWizardResult {
            session,
            replayed: false,
        })
    }

    /// The active session holding the list's lock, if this user started it
    /// with `key`.
    async fn replayable(
        &self,
        list: &ShoppingList,
        user_id: &UserId,
        key: &IdempotencyKey,
        now: Timestamp,
    ) -> Result<Option<WizardSession>, WizardError> {
        let Some(owner) = list.locked_by else {
            return Ok(None);
        };
        let session = self
            .services
            .sessions
            .get(owner)
            .await
            .map_err(logged("sessions.get"))?;
        Ok(session.filter(|s| {
            s.is_owner(user_id)
                && s.start_key() == Some(key)
                && s.status().is_active()
                && !s.is_expired_at(now)
        }))
    }

    /// Only an explicit denial blocks; limiter failures are logged and ignored.
    async fn check_rate_limit(&self, user_id: &UserId) -> Result<(), WizardError> {
        let key = RateLimitKey::for_user(user_id, START_RESOURCE);
        let quota = RateLimitQuota::new(
            self.services.config.max_sessions_per_window,
            self.services.config.rate_limit_window_secs,
        );

        match self.services.rate_limiter.check(&key, quota).await {
            Ok(RateLimitResult::Allowed(status)) => {
                tracing::debug!(user_id = %user_id, remaining = status.remaining, "Wizard start allowed");
                Ok(())
            }
            Ok(RateLimitResult::Denied(denied)) => {
                tracing::info!(
                    user_id = %user_id,
                    limit = denied.limit,
                    retry_after_secs = denied.retry_after_secs,
                    "Wizard start rate limited"
                );
                Err(denied.into())
            }
            Err(err) => {
                tracing::warn!(user_id = %user_id, error = %err, "Rate limiter failed, allowing request");
                Ok(())
            }
        }
    }

    async fn snapshot_items(
        &self,
        list_id: ShoppingListId,
        now: Timestamp,
    ) -> Result<Vec<ExpiredItem>, WizardError> {
        let mut items = self
            .services
            .expired_items
            .get_expired_items_for_list(list_id, now)
            .await
            .map_err(logged("expired_items.get_expired_items_for_list"))?;

        for item in &mut items {
            let candidates = self
                .services
                .catalog
                .candidates_for(item, now)
                .await
                .map_err(logged("catalog.candidates_for"))?;
            let suggestions = self.engine.suggest(item, candidates);
            item.suggestions = suggestions;
        }
        Ok(items)
    }

    async fn discard(&self, session: &WizardSession) {
        if let Err(err) = self.services.sessions.delete(session.id()).await {
            tracing::error!(
                session_id = %session.id(),
                error = %err,
                "Failed to discard session after lock failure"
            );
        }
    }
}
