//! Loading, expiring, saving, and announcing wizard sessions.
//!
//! Every mutating handler goes through the same cycle: load the session
//! fresh from the store, check ownership and status against that copy,
//! mutate, then write back conditionally on the revision it loaded.

use serde::Serialize;

use super::services::{logged, WizardServices};
use crate::domain::foundation::{
    CommandMetadata, DomainEvent, EventEnvelope, EventId, Timestamp, WizardSessionId,
};
use crate::domain::wizard::{WizardError, WizardExpired, WizardSession};

impl WizardServices {
    /// Loads a session for its owner. A session past its deadline is
    /// expired on the spot and returned with status `Expired`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the store has no such session
    /// - `Unauthorized` if the calling user does not own it
    pub(crate) async fn load_owned(
        &self,
        session_id: WizardSessionId,
        metadata: &CommandMetadata,
        now: Timestamp,
    ) -> Result<WizardSession, WizardError> {
        let mut session = self
            .sessions
            .get(session_id)
            .await
            .map_err(logged("sessions.get"))?
            .ok_or_else(|| WizardError::session_not_found(session_id))?;

        session.authorize(&metadata.user_id)?;

        if session.is_expired_at(now) {
            self.expire(&mut session, metadata, now).await;
        }
        Ok(session)
    }

    /// Like [`load_owned`](Self::load_owned) but also requires `Active`.
    ///
    /// # Errors
    ///
    /// - `SessionExpired` for any terminal session, including one that
    ///   just ran out
    pub(crate) async fn load_active(
        &self,
        session_id: WizardSessionId,
        metadata: &CommandMetadata,
        now: Timestamp,
    ) -> Result<WizardSession, WizardError> {
        let session = self.load_owned(session_id, metadata, now).await?;
        session.ensure_active()?;
        Ok(session)
    }

    /// Writes the session back if nobody else wrote it since it was loaded.
    ///
    /// # Errors
    ///
    /// - `Conflict` if the stored revision moved on
    pub(crate) async fn save(
        &self,
        session: &mut WizardSession,
        now: Timestamp,
    ) -> Result<(), WizardError> {
        let ttl = session.storage_ttl_secs(now, self.config.terminal_retention_secs);
        let expected = session.advance_revision();
        self.sessions
            .set_if_revision(session, expected, ttl)
            .await
            .map_err(logged("sessions.set_if_revision"))
    }

    /// Expires an active session: stores it as `Expired` for the terminal
    /// retention period, frees its list, and publishes `wizard.expired`.
    /// Cleanup failures are logged only.
    ///
    /// Keeping the terminal copy lets a later cancel or read see `Expired`
    /// instead of `NotFound`.
    pub(crate) async fn expire(
        &self,
        session: &mut WizardSession,
        metadata: &CommandMetadata,
        now: Timestamp,
    ) {
        if !session.expire(now) {
            return;
        }

        if let Err(err) = self.save(session, now).await {
            tracing::warn!(
                session_id = %session.id(),
                error = %err,
                "Failed to store expired session"
            );
        }
        self.release_list_lock(session.list_id(), session.id()).await;

        tracing::info!(
            session_id = %session.id(),
            list_id = %session.list_id(),
            expires_at = %session.expires_at(),
            "Wizard session expired"
        );

        let event = WizardExpired {
            event_id: EventId::new(),
            session_id: session.id(),
            user_id: session.user_id().clone(),
            list_id: session.list_id(),
            expires_at: session.expires_at(),
            expired_at: now,
        };
        self.publish(&event, metadata).await;
    }

    /// Publishes a wizard event. Failures are logged and never fail the
    /// operation that produced the event.
    pub(crate) async fn publish<E>(&self, event: &E, metadata: &CommandMetadata)
    where
        E: DomainEvent + Serialize,
    {
        let envelope = match EventEnvelope::from_event(event) {
            Ok(envelope) => envelope
                .with_correlation_id(metadata.correlation_id())
                .with_user_id(metadata.user_id.to_string()),
            Err(err) => {
                tracing::warn!(
                    event_type = event.event_type(),
                    error = %err,
                    "Failed to serialize wizard event"
                );
                return;
            }
        };

        if let Err(err) = self.events.publish(envelope).await {
            tracing::warn!(
                event_type = event.event_type(),
                aggregate_id = %event.aggregate_id(),
                error = %err,
                "Failed to publish wizard event"
            );
        }
    }
}
