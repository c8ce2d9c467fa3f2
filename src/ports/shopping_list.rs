//! ShoppingListService port - the slice of the shopping-list store the
//! wizard reads and writes.
//!
//! The wizard only needs ownership, the advisory lock, and a way to apply
//! its item changes. The lock is a flag on the list plus the ID of the
//! session holding it; the list never embeds the session itself. The lock
//! is only ever changed through a compare-and-set so two wizards cannot
//! both observe an unlocked list and lock it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ItemId, ShoppingListId, Timestamp, UserId, WizardSessionId};
use crate::domain::wizard::{ItemChange, WizardError};

/// A shopping list as seen by the wizard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoppingList {
    pub id: ShoppingListId,
    pub owner_id: UserId,
    pub name: String,
    pub is_locked: bool,
    /// Session holding the lock, when known.
    pub locked_by: Option<WizardSessionId>,
    pub updated_at: Timestamp,
}

impl ShoppingList {
    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.owner_id == user_id
    }
}

/// Outcome of applying a wizard's changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied { changed_items: usize },
    /// Changes for this session were applied by an earlier call.
    AlreadyApplied,
}

/// Errors from shopping-list operations.
#[derive(Debug, thiserror::Error)]
pub enum ShoppingListError {
    #[error("shopping list not found: {0}")]
    NotFound(ShoppingListId),

    /// A change could not be applied; nothing was written.
    #[error("migration rejected: {0}")]
    Rejected(String),

    /// The session already applied a different set of changes.
    #[error("session {session_id} already applied other changes, first at item {item_id}")]
    Diverged {
        session_id: WizardSessionId,
        item_id: ItemId,
    },

    #[error("shopping list store unavailable: {0}")]
    Unavailable(String),
}

/// Port for reading and mutating shopping lists.
#[async_trait]
pub trait ShoppingListService: Send + Sync {
    async fn get_by_id(&self, id: ShoppingListId)
        -> Result<Option<ShoppingList>, ShoppingListError>;

    /// Sets the lock owner to `new` only if it currently is `expected`.
    ///
    /// `expected = None` means "currently unlocked"; `new = None` unlocks.
    /// Returns false when the lock was not in the expected state.
    async fn compare_and_set_lock(
        &self,
        id: ShoppingListId,
        expected: Option<WizardSessionId>,
        new: Option<WizardSessionId>,
    ) -> Result<bool, ShoppingListError>;

    /// Applies all changes or none of them.
    ///
    /// Idempotent per `session_id`: repeating the same changes reports
    /// `AlreadyApplied` and changes nothing.
    ///
    /// # Errors
    ///
    /// - `Diverged` if the session already applied a different change set
    /// - `Rejected` if a change names an item missing from the list
    async fn apply_migration(
        &self,
        id: ShoppingListId,
        session_id: WizardSessionId,
        changes: &[ItemChange],
    ) -> Result<ApplyOutcome, ShoppingListError>;
}

impl From<ShoppingListError> for WizardError {
    fn from(err: ShoppingListError) -> Self {
        match err {
            ShoppingListError::NotFound(id) => WizardError::list_not_found(id),
            ShoppingListError::Diverged { item_id, .. } => WizardError::revalidation_failed(
                item_id,
                None,
                "the list already holds different changes from an earlier attempt",
            ),
            other => WizardError::internal(other.to_string()),
        }
    }
}
