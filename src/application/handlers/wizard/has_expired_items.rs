//! HasExpiredItemsHandler - Whether a list needs the migration wizard.

use crate::domain::foundation::{CommandMetadata, ShoppingListId, Timestamp};
use crate::domain::wizard::WizardError;

use super::services::{logged, WizardServices};

#[derive(Debug, Clone)]
pub struct HasExpiredItemsQuery {
    /// List to check; only its owner may.
    pub list_id: ShoppingListId,
}

pub struct HasExpiredItemsHandler {
    services: WizardServices,
}

impl HasExpiredItemsHandler {
    pub fn new(services: WizardServices) -> Self {
        Self { services }
    }

    pub async fn handle(
        &self,
        query: HasExpiredItemsQuery,
        metadata: CommandMetadata,
    ) -> Result<bool, WizardError> {
        let list = self
            .services
            .lists
            .get_by_id(query.list_id)
            .await
            .map_err(logged("lists.get_by_id"))?
            .ok_or_else(|| WizardError::list_not_found(query.list_id))?;
        if !list.is_owned_by(&metadata.user_id) {
            return Err(WizardError::Unauthorized);
        }

        self.services
            .expired_items
            .has_expired_items(list.id, Timestamp::now())
            .await
            .map_err(logged("expired_items.has_expired_items"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::wizard::test_support::{Harness, LIST_ID};

    fn query() -> HasExpiredItemsQuery {
        HasExpiredItemsQuery { list_id: LIST_ID }
    }

    #[tokio::test]
    async fn reports_expired_items() {
        let h = Harness::new().await;
        assert!(h.has_expired_handler().handle(query(), h.owner()).await.unwrap());
    }

    #[tokio::test]
    async fn list_without_expired_items() {
        let h = Harness::empty().await;
        assert!(!h.has_expired_handler().handle(query(), h.owner()).await.unwrap());
    }

    #[tokio::test]
    async fn stranger_is_unauthorized() {
        let h = Harness::new().await;
        let err = h
            .has_expired_handler()
            .handle(query(), h.stranger())
            .await
            .unwrap_err();
        assert_eq!(err, WizardError::Unauthorized);
    }
}
