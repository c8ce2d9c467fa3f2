//! Frozen snapshots of shopping-list items whose linked offer expired.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::suggestion::Suggestion;
use crate::domain::foundation::{ItemId, OfferId, StoreId, Timestamp};

/// Reference to a store, by ID with its display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoreRef {
    pub id: StoreId,
    pub name: String,
}

impl StoreRef {
    pub fn new(id: StoreId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Snapshot of an expired shopping-list item taken when the wizard starts.
///
/// The snapshot does not follow later edits to the list; suggestions are
/// ordered best-first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpiredItem {
    pub item_id: ItemId,
    pub product_name: String,
    pub brand: Option<String>,
    /// Unit price under the expired offer.
    pub original_price: Decimal,
    pub quantity: u32,
    /// Package size as printed on the flyer, e.g. "500 g".
    pub size: Option<String>,
    /// When the linked offer stopped being valid.
    pub expired_at: Timestamp,
    pub original_store: StoreRef,
    pub original_offer_id: Option<OfferId>,
    #[serde(default)]
    pub suggestions: Vec<Suggestion>,
}

impl ExpiredItem {
    /// Looks up one of this item's suggestions by the offer it proposes.
    pub fn suggestion(&self, offer_id: OfferId) -> Option<&Suggestion> {
        self.suggestions.iter().find(|s| s.offer_id == offer_id)
    }

    /// Returns the best-ranked suggestion, if any.
    pub fn top_suggestion(&self) -> Option<&Suggestion> {
        self.suggestions.first()
    }

    /// Original line total (unit price times quantity).
    pub fn original_line_total(&self) -> Decimal {
        self.original_price * Decimal::from(self.quantity)
    }
}
