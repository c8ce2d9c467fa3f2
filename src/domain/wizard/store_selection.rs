//! Per-store aggregation of accepted replacements.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::decision::{Decision, DecisionAction};
use super::expired_item::{ExpiredItem, StoreRef};
use crate::domain::foundation::StoreId;

/// A destination store with everything the session moves there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSelection {
    pub store: StoreRef,
    pub item_count: u32,
    /// Sum of replacement line totals at this store.
    pub total_price: Decimal,
    /// Original line totals minus replacement line totals; negative when dearer.
    pub savings: Decimal,
}

/// Derives store selections from the Replace decisions of a session.
///
/// Ordered by item count descending, then store id.
pub fn derive_store_selections(items: &[ExpiredItem], decisions: &[Decision]) -> Vec<StoreSelection> {
    let mut by_store: HashMap<StoreId, StoreSelection> = HashMap::new();

    for decision in decisions {
        let DecisionAction::Replace { suggestion_id } = decision.action else {
            continue;
        };
        let Some(item) = items.iter().find(|i| i.item_id == decision.item_id) else {
            continue;
        };
        let Some(suggestion) = item.suggestion(suggestion_id) else {
            continue;
        };

        let quantity = Decimal::from(item.quantity);
        let line_total = suggestion.price * quantity;
        let entry = by_store
            .entry(suggestion.store.id)
            .or_insert_with(|| StoreSelection {
                store: suggestion.store.clone(),
                item_count: 0,
                total_price: Decimal::ZERO,
                savings: Decimal::ZERO,
            });
        entry.item_count += 1;
        entry.total_price += line_total;
        entry.savings += item.original_line_total() - line_total;
    }

    let mut selections: Vec<StoreSelection> = by_store.into_values().collect();
    selections.sort_by(|a, b| {
        b.item_count
            .cmp(&a.item_count)
            .then_with(|| a.store.id.cmp(&b.store.id))
    });
    selections
}
