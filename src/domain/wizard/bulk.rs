//! Store-capped planning for BulkAcceptSuggestions.
//!
//! Every undecided item gets its top suggestion as long as those picks,
//! together with the stores the user already chose, fit within `max_stores`.
//! Only when they do not does the planner narrow the store set and fall back
//! to alternates:
//!
//! 1. Stores already chosen by the user's Replace decisions are always allowed.
//! 2. Remaining slots up to `max_stores` are filled greedily. Each round adds
//!    the store that newly covers the most undecided items, then the one with
//!    the largest score gain, then the cheapest, then the lowest store id.
//! 3. Each item takes its best-ranked suggestion inside the allowed set.
//!    Items without one stay undecided.

use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};

use super::decision::{Decision, DecisionAction};
use super::expired_item::ExpiredItem;
use super::suggestion::Suggestion;
use crate::domain::foundation::{ItemId, OfferId, StoreId};

/// A suggestion the planner accepts on the user's behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkPick {
    pub item_id: ItemId,
    pub offer_id: OfferId,
    pub store_id: StoreId,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BulkPlan {
    pub picks: Vec<BulkPick>,
    pub allowed_stores: Vec<StoreId>,
}

/// Plans accept-top-suggestion decisions for every undecided item.
pub fn plan_bulk_accept(
    items: &[ExpiredItem],
    decisions: &[Decision],
    max_stores: usize,
) -> BulkPlan {
    let decided: HashSet<ItemId> = decisions.iter().map(|d| d.item_id).collect();
    let undecided: Vec<&ExpiredItem> = items
        .iter()
        .filter(|i| !decided.contains(&i.item_id) && !i.suggestions.is_empty())
        .collect();

    let in_use = stores_in_use(items, decisions);
    let mut top_stores = in_use.clone();
    for store in undecided
        .iter()
        .filter_map(|i| i.top_suggestion().map(|s| s.store.id))
    {
        if !top_stores.contains(&store) {
            top_stores.push(store);
        }
    }

    let allowed = if top_stores.len() <= max_stores {
        top_stores
    } else {
        narrow_stores(&undecided, in_use, max_stores)
    };

    let picks = undecided
        .iter()
        .filter_map(|item| {
            best_in(item, &allowed).map(|s| BulkPick {
                item_id: item.item_id,
                offer_id: s.offer_id,
                store_id: s.store.id,
            })
        })
        .collect();

    BulkPlan {
        picks,
        allowed_stores: allowed,
    }
}

/// Grows `allowed` one store at a time up to `max_stores`.
fn narrow_stores(
    undecided: &[&ExpiredItem],
    mut allowed: Vec<StoreId>,
    max_stores: usize,
) -> Vec<StoreId> {
    while allowed.len() < max_stores {
        let candidates: BTreeSet<StoreId> = undecided
            .iter()
            .flat_map(|i| i.suggestions.iter().map(|s| s.store.id))
            .filter(|id| !allowed.contains(id))
            .collect();

        let mut best: Option<(StoreGain, StoreId)> = None;
        for store in candidates {
            let gain = StoreGain::measure(undecided, &allowed, store);
            if gain.is_empty() {
                continue;
            }
            let better = match &best {
                Some((current, _)) => gain.compare(current) == Ordering::Greater,
                None => true,
            };
            if better {
                best = Some((gain, store));
            }
        }

        match best {
            Some((_, store)) => allowed.push(store),
            None => break,
        }
    }
    allowed
}

/// Destination stores of existing Replace decisions, in decision order.
fn stores_in_use(items: &[ExpiredItem], decisions: &[Decision]) -> Vec<StoreId> {
    let mut stores = Vec::new();
    for decision in decisions {
        let DecisionAction::Replace { suggestion_id } = decision.action else {
            continue;
        };
        let store = items
            .iter()
            .find(|i| i.item_id == decision.item_id)
            .and_then(|i| i.suggestion(suggestion_id))
            .map(|s| s.store.id);
        if let Some(store) = store {
            if !stores.contains(&store) {
                stores.push(store);
            }
        }
    }
    stores
}

/// Suggestions are ordered best-first, so the first hit is the best one.
fn best_in<'a>(item: &'a ExpiredItem, stores: &[StoreId]) -> Option<&'a Suggestion> {
    item.suggestions.iter().find(|s| stores.contains(&s.store.id))
}

fn best_at(item: &ExpiredItem, store: StoreId) -> Option<&Suggestion> {
    item.suggestions.iter().find(|s| s.store.id == store)
}

/// What adding one store to the allowed set would buy.
#[derive(Debug, Clone)]
struct StoreGain {
    covered: usize,
    improvement: f64,
    price: Decimal,
}

impl StoreGain {
    fn measure(undecided: &[&ExpiredItem], allowed: &[StoreId], store: StoreId) -> Self {
        let mut gain = StoreGain {
            covered: 0,
            improvement: 0.0,
            price: Decimal::ZERO,
        };
        for item in undecided {
            let Some(candidate) = best_at(item, store) else {
                continue;
            };
            match best_in(item, allowed) {
                None => {
                    gain.covered += 1;
                    gain.improvement += candidate.score;
                    gain.price += candidate.price;
                }
                Some(current) if candidate.score > current.score => {
                    gain.improvement += candidate.score - current.score;
                    gain.price += candidate.price;
                }
                Some(_) => {}
            }
        }
        gain
    }

    fn is_empty(&self) -> bool {
        self.covered == 0 && self.improvement <= 0.0
    }

    /// Greater is better.
    fn compare(&self, other: &Self) -> Ordering {
        self.covered
            .cmp(&other.covered)
            .then_with(|| self.improvement.total_cmp(&other.improvement))
            .then_with(|| other.price.cmp(&self.price))
    }
}
