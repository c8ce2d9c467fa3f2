//! In-memory shopping lists for testing and local runs.
//!
//! Serves both the list port and the expired-items lookup from one map so
//! applied migrations are immediately visible to later lookups.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{
    ItemId, OfferId, ShoppingListId, Timestamp, WizardSessionId,
};
use crate::domain::wizard::{ExpiredItem, ItemChange, StoreRef};
use crate::ports::{
    ApplyOutcome, ExpiredItemsError, ExpiredItemsProvider, ShoppingList, ShoppingListError,
    ShoppingListService,
};

/// One line of a shopping list.
#[derive(Debug, Clone, PartialEq)]
pub struct ListItem {
    pub id: ItemId,
    pub product_name: String,
    pub brand: Option<String>,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub size: Option<String>,
    pub store: StoreRef,
    pub offer_id: Option<OfferId>,
    /// End of validity of the linked offer.
    pub offer_valid_until: Option<Timestamp>,
    pub reviewed_at: Option<Timestamp>,
}

impl ListItem {
    pub fn new(
        id: ItemId,
        product_name: impl Into<String>,
        unit_price: Decimal,
        store: StoreRef,
    ) -> Self {
        Self {
            id,
            product_name: product_name.into(),
            brand: None,
            unit_price,
            quantity: 1,
            size: None,
            store,
            offer_id: None,
            offer_valid_until: None,
            reviewed_at: None,
        }
    }

    pub fn with_offer(mut self, offer_id: OfferId, valid_until: Timestamp) -> Self {
        self.offer_id = Some(offer_id);
        self.offer_valid_until = Some(valid_until);
        self
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    /// Expired and not yet acknowledged since the offer ran out.
    fn is_expired_at(&self, now: Timestamp) -> bool {
        match self.offer_valid_until {
            Some(until) if !until.is_after(&now) => {
                !self.reviewed_at.is_some_and(|r| !r.is_before(&until))
            }
            _ => false,
        }
    }

    fn to_expired(&self) -> Option<ExpiredItem> {
        let expired_at = self.offer_valid_until?;
        Some(ExpiredItem {
            item_id: self.id,
            product_name: self.product_name.clone(),
            brand: self.brand.clone(),
            original_price: self.unit_price,
            quantity: self.quantity,
            size: self.size.clone(),
            expired_at,
            original_store: self.store.clone(),
            original_offer_id: self.offer_id,
            suggestions: Vec::new(),
        })
    }
}

/// Applied change sets remembered per list, oldest dropped first.
const APPLIED_HISTORY: usize = 64;

#[derive(Debug, Clone)]
struct ListRecord {
    list: ShoppingList,
    items: Vec<ListItem>,
    applied: VecDeque<(WizardSessionId, Vec<ItemChange>)>,
}

impl ListRecord {
    fn applied_by(&self, session_id: WizardSessionId) -> Option<&[ItemChange]> {
        self.applied
            .iter()
            .find(|(id, _)| *id == session_id)
            .map(|(_, changes)| changes.as_slice())
    }

    fn remember(&mut self, session_id: WizardSessionId, changes: &[ItemChange]) {
        if self.applied.len() == APPLIED_HISTORY {
            self.applied.pop_front();
        }
        self.applied.push_back((session_id, changes.to_vec()));
    }
}

/// First item whose change differs between two change sets.
fn first_difference(applied: &[ItemChange], requested: &[ItemChange]) -> Option<ItemId> {
    requested
        .iter()
        .find(|c| !applied.contains(c))
        .or_else(|| applied.iter().find(|c| !requested.contains(c)))
        .map(ItemChange::item_id)
}

/// Shopping lists kept in a `HashMap` behind a tokio `RwLock`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryShoppingLists {
    lists: Arc<RwLock<HashMap<ShoppingListId, ListRecord>>>,
    fail_next_apply: Arc<AtomicBool>,
    fail_next_unlock: Arc<AtomicBool>,
}

impl InMemoryShoppingLists {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_list(&self, list: ShoppingList, items: Vec<ListItem>) {
        self.lists.write().await.insert(
            list.id,
            ListRecord {
                list,
                items,
                applied: VecDeque::new(),
            },
        );
    }

    /// Adds or replaces one item of an existing list. Returns false if the
    /// list is unknown.
    pub async fn upsert_item(&self, list_id: ShoppingListId, item: ListItem) -> bool {
        let mut lists = self.lists.write().await;
        let Some(record) = lists.get_mut(&list_id) else {
            return false;
        };
        match record.items.iter_mut().find(|i| i.id == item.id) {
            Some(existing) => *existing = item,
            None => record.items.push(item),
        }
        true
    }

    // === Test Helpers ===

    pub async fn list(&self, id: ShoppingListId) -> Option<ShoppingList> {
        self.lists.read().await.get(&id).map(|r| r.list.clone())
    }

    pub async fn items(&self, id: ShoppingListId) -> Vec<ListItem> {
        self.lists
            .read()
            .await
            .get(&id)
            .map(|r| r.items.clone())
            .unwrap_or_default()
    }

    pub async fn item(&self, id: ShoppingListId, item_id: ItemId) -> Option<ListItem> {
        self.items(id).await.into_iter().find(|i| i.id == item_id)
    }

    /// The next `apply_migration` fails without touching the list.
    pub fn fail_next_apply(&self) {
        self.fail_next_apply.store(true, Ordering::SeqCst);
    }

    /// The next unlocking `compare_and_set_lock` fails.
    pub fn fail_next_unlock(&self) {
        self.fail_next_unlock.store(true, Ordering::SeqCst);
    }
}

fn apply_change(items: &mut Vec<ListItem>, change: &ItemChange, now: Timestamp) {
    match change {
        ItemChange::Replace {
            item_id,
            offer_id,
            store,
            unit_price,
            product_name,
            valid_until,
        } => {
            if let Some(item) = items.iter_mut().find(|i| i.id == *item_id) {
                item.offer_id = Some(*offer_id);
                item.offer_valid_until = Some(*valid_until);
                item.store = store.clone();
                item.unit_price = *unit_price;
                item.product_name = product_name.clone();
                item.reviewed_at = Some(now);
            }
        }
        ItemChange::MarkReviewed { item_id } => {
            if let Some(item) = items.iter_mut().find(|i| i.id == *item_id) {
                item.reviewed_at = Some(now);
            }
        }
        ItemChange::Remove { item_id } => items.retain(|i| i.id != *item_id),
    }
}

#[async_trait]
impl ShoppingListService for InMemoryShoppingLists {
    async fn get_by_id(
        &self,
        id: ShoppingListId,
    ) -> Result<Option<ShoppingList>, ShoppingListError> {
        Ok(self.list(id).await)
    }

    async fn compare_and_set_lock(
        &self,
        id: ShoppingListId,
        expected: Option<WizardSessionId>,
        new: Option<WizardSessionId>,
    ) -> Result<bool, ShoppingListError> {
        if new.is_none() && self.fail_next_unlock.swap(false, Ordering::SeqCst) {
            return Err(ShoppingListError::Unavailable(
                "injected unlock failure".to_string(),
            ));
        }

        let mut lists = self.lists.write().await;
        let record = lists.get_mut(&id).ok_or(ShoppingListError::NotFound(id))?;
        let list = &mut record.list;

        let matches = match expected {
            None => !list.is_locked,
            Some(owner) => list.is_locked && list.locked_by == Some(owner),
        };
        if !matches {
            return Ok(false);
        }

        list.is_locked = new.is_some();
        list.locked_by = new;
        list.updated_at = Timestamp::now();
        Ok(true)
    }

    async fn apply_migration(
        &self,
        id: ShoppingListId,
        session_id: WizardSessionId,
        changes: &[ItemChange],
    ) -> Result<ApplyOutcome, ShoppingListError> {
        if self.fail_next_apply.swap(false, Ordering::SeqCst) {
            return Err(ShoppingListError::Unavailable(
                "injected apply failure".to_string(),
            ));
        }

        let mut lists = self.lists.write().await;
        let record = lists.get_mut(&id).ok_or(ShoppingListError::NotFound(id))?;

        if let Some(applied) = record.applied_by(session_id) {
            return match first_difference(applied, changes) {
                None => Ok(ApplyOutcome::AlreadyApplied),
                Some(item_id) => Err(ShoppingListError::Diverged {
                    session_id,
                    item_id,
                }),
            };
        }

        if let Some(missing) = changes
            .iter()
            .map(ItemChange::item_id)
            .find(|item_id| !record.items.iter().any(|i| i.id == *item_id))
        {
            return Err(ShoppingListError::Rejected(format!(
                "item {} is not on list {}",
                missing, id
            )));
        }

        let now = Timestamp::now();
        let mut items = record.items.clone();
        for change in changes {
            apply_change(&mut items, change, now);
        }

        record.items = items;
        record.remember(session_id, changes);
        record.list.updated_at = now;

        tracing::debug!(
            list_id = %id,
            session_id = %session_id,
            changed_items = changes.len(),
            "Applied migration"
        );
        Ok(ApplyOutcome::Applied {
            changed_items: changes.len(),
        })
    }
}

#[async_trait]
impl ExpiredItemsProvider for InMemoryShoppingLists {
    async fn get_expired_items_for_list(
        &self,
        list_id: ShoppingListId,
        now: Timestamp,
    ) -> Result<Vec<ExpiredItem>, ExpiredItemsError> {
        let lists = self.lists.read().await;
        Ok(lists
            .get(&list_id)
            .map(|r| {
                r.items
                    .iter()
                    .filter(|i| i.is_expired_at(now))
                    .filter_map(ListItem::to_expired)
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{StoreId, UserId};

    fn list_id() -> ShoppingListId {
        ShoppingListId::new(1)
    }

    fn store(id: i64) -> StoreRef {
        StoreRef::new(StoreId::new(id), format!("Store {}", id))
    }

    fn shopping_list() -> ShoppingList {
        ShoppingList {
            id: list_id(),
            owner_id: UserId::new("user-1").unwrap(),
            name: "Weekly".to_string(),
            is_locked: false,
            locked_by: None,
            updated_at: Timestamp::now(),
        }
    }

    async fn seeded(now: Timestamp) -> InMemoryShoppingLists {
        let lists = InMemoryShoppingLists::new();
        lists
            .insert_list(
                shopping_list(),
                vec![
                    ListItem::new(ItemId::new(1), "Milk", Decimal::new(129, 2), store(100))
                        .with_offer(OfferId::new(501), now.minus_secs(60)),
                    ListItem::new(ItemId::new(2), "Bread", Decimal::new(249, 2), store(100))
                        .with_offer(OfferId::new(502), now.plus_secs(3600)),
                    ListItem::new(ItemId::new(3), "Eggs", Decimal::new(299, 2), store(100)),
                ],
            )
            .await;
        lists
    }

    #[tokio::test]
    async fn only_items_past_their_offer_are_expired() {
        let now = Timestamp::now();
        let lists = seeded(now).await;

        let expired = lists.get_expired_items_for_list(list_id(), now).await.unwrap();

        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].item_id, ItemId::new(1));
        assert_eq!(expired[0].original_offer_id, Some(OfferId::new(501)));
        assert!(expired[0].suggestions.is_empty());
    }

    #[tokio::test]
    async fn unknown_list_has_no_expired_items() {
        let lists = InMemoryShoppingLists::new();
        assert!(!lists
            .has_expired_items(ShoppingListId::new(42), Timestamp::now())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn lock_compare_and_set() {
        let lists = seeded(Timestamp::now()).await;
        let a = WizardSessionId::new();
        let b = WizardSessionId::new();

        assert!(lists.compare_and_set_lock(list_id(), None, Some(a)).await.unwrap());
        assert!(!lists.compare_and_set_lock(list_id(), None, Some(b)).await.unwrap());
        assert!(!lists.compare_and_set_lock(list_id(), Some(b), None).await.unwrap());
        assert!(lists.compare_and_set_lock(list_id(), Some(a), Some(b)).await.unwrap());
        assert!(lists.compare_and_set_lock(list_id(), Some(b), None).await.unwrap());

        let list = lists.list(list_id()).await.unwrap();
        assert!(!list.is_locked);
        assert_eq!(list.locked_by, None);
    }

    #[tokio::test]
    async fn lock_on_unknown_list_is_not_found() {
        let lists = InMemoryShoppingLists::new();
        let result = lists
            .compare_and_set_lock(ShoppingListId::new(7), None, Some(WizardSessionId::new()))
            .await;
        assert!(matches!(result, Err(ShoppingListError::NotFound(_))));
    }

    #[tokio::test]
    async fn apply_migration_changes_items_once() {
        let now = Timestamp::now();
        let lists = seeded(now).await;
        let session = WizardSessionId::new();
        let changes = vec![
            ItemChange::Replace {
                item_id: ItemId::new(1),
                offer_id: OfferId::new(900),
                store: store(200),
                unit_price: Decimal::new(99, 2),
                product_name: "Milk 1L".to_string(),
                valid_until: now.plus_secs(86_400),
            },
            ItemChange::Remove {
                item_id: ItemId::new(3),
            },
        ];

        let first = lists
            .apply_migration(list_id(), session, &changes)
            .await
            .unwrap();
        let second = lists
            .apply_migration(list_id(), session, &changes)
            .await
            .unwrap();

        assert_eq!(first, ApplyOutcome::Applied { changed_items: 2 });
        assert_eq!(second, ApplyOutcome::AlreadyApplied);

        let items = lists.items(list_id()).await;
        assert_eq!(items.len(), 2);
        let milk = lists.item(list_id(), ItemId::new(1)).await.unwrap();
        assert_eq!(milk.offer_id, Some(OfferId::new(900)));
        assert_eq!(milk.store.id, StoreId::new(200));
        assert!(lists
            .get_expired_items_for_list(list_id(), now)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn repeat_with_other_changes_is_refused() {
        let lists = seeded(Timestamp::now()).await;
        let session = WizardSessionId::new();
        let reviewed = ItemChange::MarkReviewed {
            item_id: ItemId::new(1),
        };
        lists
            .apply_migration(list_id(), session, &[reviewed.clone()])
            .await
            .unwrap();

        let result = lists
            .apply_migration(
                list_id(),
                session,
                &[
                    reviewed,
                    ItemChange::Remove {
                        item_id: ItemId::new(3),
                    },
                ],
            )
            .await;

        assert!(matches!(
            result,
            Err(ShoppingListError::Diverged { item_id, .. }) if item_id == ItemId::new(3)
        ));
        assert_eq!(lists.items(list_id()).await.len(), 3);
    }

    #[tokio::test]
    async fn applied_history_is_bounded() {
        let lists = seeded(Timestamp::now()).await;
        let first = WizardSessionId::new();
        lists.apply_migration(list_id(), first, &[]).await.unwrap();
        for _ in 0..APPLIED_HISTORY {
            lists
                .apply_migration(list_id(), WizardSessionId::new(), &[])
                .await
                .unwrap();
        }

        let record = lists.lists.read().await.get(&list_id()).cloned().unwrap();
        assert_eq!(record.applied.len(), APPLIED_HISTORY);
        assert!(record.applied_by(first).is_none());
    }

    #[tokio::test]
    async fn apply_migration_is_all_or_nothing() {
        let lists = seeded(Timestamp::now()).await;
        let changes = vec![
            ItemChange::Remove {
                item_id: ItemId::new(1),
            },
            ItemChange::Remove {
                item_id: ItemId::new(99),
            },
        ];

        let result = lists
            .apply_migration(list_id(), WizardSessionId::new(), &changes)
            .await;

        assert!(matches!(result, Err(ShoppingListError::Rejected(_))));
        assert_eq!(lists.items(list_id()).await.len(), 3);
    }

    #[tokio::test]
    async fn reviewed_item_is_no_longer_expired() {
        let now = Timestamp::now();
        let lists = seeded(now).await;

        lists
            .apply_migration(
                list_id(),
                WizardSessionId::new(),
                &[ItemChange::MarkReviewed {
                    item_id: ItemId::new(1),
                }],
            )
            .await
            .unwrap();

        assert!(!lists.has_expired_items(list_id(), now).await.unwrap());
    }

    #[tokio::test]
    async fn injected_failures_fire_once() {
        let lists = seeded(Timestamp::now()).await;
        let session = WizardSessionId::new();

        lists.fail_next_apply();
        assert!(lists.apply_migration(list_id(), session, &[]).await.is_err());
        assert!(lists.apply_migration(list_id(), session, &[]).await.is_ok());

        lists.compare_and_set_lock(list_id(), None, Some(session)).await.unwrap();
        lists.fail_next_unlock();
        assert!(lists
            .compare_and_set_lock(list_id(), Some(session), None)
            .await
            .is_err());
        assert!(lists
            .compare_and_set_lock(list_id(), Some(session), None)
            .await
            .unwrap());
    }
}
