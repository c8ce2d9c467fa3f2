//! Advisory list lock held by the active wizard session.
//!
//! The lock is the list's `is_locked` flag plus the owning session ID and
//! is only changed through `compare_and_set_lock`. A lock whose owner is
//! gone, terminal, or past its deadline is stale and may be taken over.

use super::services::{logged, WizardServices};
use crate::domain::foundation::{ShoppingListId, Timestamp, WizardSessionId};
use crate::domain::wizard::WizardError;
use crate::ports::ShoppingList;

impl WizardServices {
    /// Locks `list` for `session_id`.
    ///
    /// # Errors
    ///
    /// - `ListLocked` if another live session holds the lock, or the lock
    ///   has no known owner
    pub(crate) async fn acquire_list_lock(
        &self,
        list: &ShoppingList,
        session_id: WizardSessionId,
        now: Timestamp,
    ) -> Result<(), WizardError> {
        let expected = if list.is_locked {
            let Some(owner) = list.locked_by else {
                return Err(WizardError::ListLocked {
                    list_id: list.id,
                    locked_by: None,
                });
            };
            if !self.lock_owner_is_stale(owner, now).await? {
                return Err(WizardError::ListLocked {
                    list_id: list.id,
                    locked_by: Some(owner),
                });
            }
            tracing::info!(
                list_id = %list.id,
                stale_owner = %owner,
                session_id = %session_id,
                "Taking over stale list lock"
            );
            Some(owner)
        } else {
            None
        };

        if self
            .lists
            .compare_and_set_lock(list.id, expected, Some(session_id))
            .await
            .map_err(logged("lists.compare_and_set_lock"))?
        {
            return Ok(());
        }

        // Lost the race; report whoever holds the lock now.
        let locked_by = self
            .lists
            .get_by_id(list.id)
            .await
            .map_err(logged("lists.get_by_id"))?
            .and_then(|l| l.locked_by);
        Err(WizardError::ListLocked {
            list_id: list.id,
            locked_by,
        })
    }

    async fn lock_owner_is_stale(
        &self,
        owner: WizardSessionId,
        now: Timestamp,
    ) -> Result<bool, WizardError> {
        let stale = match self
            .sessions
            .get(owner)
            .await
            .map_err(logged("sessions.get"))?
        {
            None => true,
            Some(session) => !session.status().is_active() || session.is_expired_at(now),
        };
        Ok(stale)
    }

    /// Unlocks the list if `session_id` still holds it.
    ///
    /// Never fails the caller: a lock left behind belongs to a terminal
    /// session and is taken over by the next StartWizard.
    pub(crate) async fn release_list_lock(
        &self,
        list_id: ShoppingListId,
        session_id: WizardSessionId,
    ) {
        match self
            .lists
            .compare_and_set_lock(list_id, Some(session_id), None)
            .await
        {
            Ok(true) => {
                tracing::debug!(list_id = %list_id, session_id = %session_id, "List unlocked")
            }
            Ok(false) => tracing::debug!(
                list_id = %list_id,
                session_id = %session_id,
                "List lock already released or taken over"
            ),
            Err(err) => tracing::warn!(
                list_id = %list_id,
                session_id = %session_id,
                error = %err,
                "Failed to release list lock"
            ),
        }
    }
}
