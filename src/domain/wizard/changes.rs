//! Concrete list mutations a finalized wizard applies.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::expired_item::StoreRef;
use crate::domain::foundation::{ItemId, OfferId, Timestamp};

/// One change to a shopping-list item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemChange {
    /// Relink the item to a new offer.
    Replace {
        item_id: ItemId,
        offer_id: OfferId,
        store: StoreRef,
        unit_price: Decimal,
        product_name: String,
        valid_until: Timestamp,
    },
    /// Leave the item alone but record that the user looked at it.
    MarkReviewed { item_id: ItemId },
    Remove { item_id: ItemId },
}

impl ItemChange {
    pub fn item_id(&self) -> ItemId {
        match self {
            ItemChange::Replace { item_id, .. }
            | ItemChange::MarkReviewed { item_id }
            | ItemChange::Remove { item_id } => *item_id,
        }
    }
}
