//! WizardSessionStore port - TTL-bound persistence for wizard sessions.
//!
//! The store is the only source of truth for in-progress wizards. Every
//! mutation reloads the session, validates it, and writes it back with
//! [`WizardSessionStore::set_if_revision`] so concurrent writers cannot
//! silently overwrite each other.

use async_trait::async_trait;

use crate::domain::foundation::WizardSessionId;
use crate::domain::wizard::{WizardError, WizardSession};

/// Errors from session store operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    /// The stored revision differs from the expected one, or the session is gone.
    #[error("session {session_id} changed since revision {expected}")]
    RevisionMismatch {
        session_id: WizardSessionId,
        expected: u64,
    },

    #[error("failed to (de)serialize session: {0}")]
    Serialization(String),

    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

/// Port for storing wizard sessions with a time-to-live.
#[async_trait]
pub trait WizardSessionStore: Send + Sync {
    /// Loads a session; `None` if it never existed or its TTL ran out.
    async fn get(&self, id: WizardSessionId) -> Result<Option<WizardSession>, SessionStoreError>;

    /// Unconditionally stores a session for `ttl_secs`.
    async fn set(&self, session: &WizardSession, ttl_secs: u64) -> Result<(), SessionStoreError>;

    /// Stores the session only if the stored copy is at revision `expected`.
    ///
    /// # Errors
    ///
    /// - `RevisionMismatch` if another writer got there first or the
    ///   session no longer exists
    async fn set_if_revision(
        &self,
        session: &WizardSession,
        expected: u64,
        ttl_secs: u64,
    ) -> Result<(), SessionStoreError>;

    /// Removes a session. Deleting a missing session is not an error.
    async fn delete(&self, id: WizardSessionId) -> Result<(), SessionStoreError>;
}

impl From<SessionStoreError> for WizardError {
    fn from(err: SessionStoreError) -> Self {
        match err {
            SessionStoreError::RevisionMismatch { session_id, .. } => {
                WizardError::Conflict { session_id }
            }
            other => WizardError::internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ErrorCode;

    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn WizardSessionStore) {}

    #[test]
    fn revision_mismatch_maps_to_conflict() {
        let err: WizardError = SessionStoreError::RevisionMismatch {
            session_id: WizardSessionId::new(),
            expected: 3,
        }
        .into();
        assert_eq!(err.code(), ErrorCode::Conflict);
    }

    #[test]
    fn unavailable_maps_to_internal() {
        let err: WizardError = SessionStoreError::Unavailable("timeout".into()).into();
        assert_eq!(err.code(), ErrorCode::InternalError);
    }
}
