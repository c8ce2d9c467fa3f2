//! ExpiredItemsProvider port - finds list items whose linked offer expired.

use async_trait::async_trait;

use crate::domain::foundation::{ShoppingListId, Timestamp};
use crate::domain::wizard::{ExpiredItem, WizardError};

#[derive(Debug, thiserror::Error)]
pub enum ExpiredItemsError {
    #[error("expired items unavailable: {0}")]
    Unavailable(String),
}

/// Port for looking up expired items.
///
/// Returned items carry no suggestions; the wizard attaches them.
#[async_trait]
pub trait ExpiredItemsProvider: Send + Sync {
    /// Items of the list whose offer stopped being valid before `now`,
    /// in list order.
    async fn get_expired_items_for_list(
        &self,
        list_id: ShoppingListId,
        now: Timestamp,
    ) -> Result<Vec<ExpiredItem>, ExpiredItemsError>;

    async fn has_expired_items(
        &self,
        list_id: ShoppingListId,
        now: Timestamp,
    ) -> Result<bool, ExpiredItemsError> {
        Ok(!self
            .get_expired_items_for_list(list_id, now)
            .await?
            .is_empty())
    }
}

impl From<ExpiredItemsError> for WizardError {
    fn from(err: ExpiredItemsError) -> Self {
        WizardError::internal(err.to_string())
    }
}
