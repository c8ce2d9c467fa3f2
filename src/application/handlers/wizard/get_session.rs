//! GetSessionHandler - Query handler for reading a wizard session.

use crate::domain::foundation::{CommandMetadata, Timestamp, WizardSessionId};
use crate::domain::wizard::{WizardError, WizardSession};

use super::services::WizardServices;

#[derive(Debug, Clone)]
pub struct GetSessionQuery {
    /// Session to read; only its owner may.
    pub session_id: WizardSessionId,
}

/// Returns the session as stored. A session past its deadline comes back
/// with status `Expired` and stays stored that way for the retention
/// period.
pub struct GetSessionHandler {
    services: WizardServices,
}

impl GetSessionHandler {
    pub fn new(services: WizardServices) -> Self {
        Self { services }
    }

    pub async fn handle(
        &self,
        query: GetSessionQuery,
        metadata: CommandMetadata,
    ) -> Result<WizardSession, WizardError> {
        self.services
            .load_owned(query.session_id, &metadata, Timestamp::now())
            .await
    }
}
