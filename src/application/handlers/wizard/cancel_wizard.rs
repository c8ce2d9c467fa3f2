//! CancelWizardHandler - Abandons a wizard without touching the list.

use crate::domain::foundation::{CommandMetadata, EventId, Timestamp, WizardSessionId};
use crate::domain::wizard::{WizardCancelled, WizardError};

use super::services::WizardServices;

/// Abandons a wizard. Safe to resend.
#[derive(Debug, Clone)]
pub struct CancelWizardCommand {
    /// Session to cancel.
    pub session_id: WizardSessionId,
}

pub struct CancelWizardHandler {
    services: WizardServices,
}

impl CancelWizardHandler {
    pub fn new(services: WizardServices) -> Self {
        Self { services }
    }

    /// Returns true if this call cancelled the session, false if it was
    /// already terminal.
    ///
    /// # Errors
    ///
    /// - `Conflict` while CompleteWizard is applying the session
    pub async fn handle(
        &self,
        cmd: CancelWizardCommand,
        metadata: CommandMetadata,
    ) -> Result<bool, WizardError> {
        let now = Timestamp::now();
        let mut session = self
            .services
            .load_owned(cmd.session_id, &metadata, now)
            .await?;

        if session.status().is_active() && session.is_finalizing() {
            return Err(WizardError::Conflict {
                session_id: session.id(),
            });
        }

        let Some(discarded) = session.cancel(now) else {
            tracing::debug!(
                session_id = %session.id(),
                status = %session.status(),
                "Cancel on terminal session ignored"
            );
            return Ok(false);
        };

        self.services.save(&mut session, now).await?;
        self.services
            .release_list_lock(session.list_id(), session.id())
            .await;

        tracing::info!(
            session_id = %session.id(),
            list_id = %session.list_id(),
            discarded,
            "Wizard cancelled"
        );

        let event = WizardCancelled {
            event_id: EventId::new(),
            session_id: session.id(),
            user_id: session.user_id().clone(),
            list_id: session.list_id(),
            discarded_decisions: discarded,
            cancelled_at: now,
        };
        self.services.publish(&event, &metadata).await;

        Ok(true)
    }
}
