//! Progress and completion reporting.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::store_selection::StoreSelection;
use crate::domain::foundation::{ShoppingListId, Timestamp, WizardSessionId};

/// How far the user has come through the expired items.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardProgress {
    pub completed_items: usize,
    pub total_items: usize,
    /// `completed / total * 100`, zero for an empty session.
    pub percent_complete: f64,
}

impl WizardProgress {
    pub fn new(completed_items: usize, total_items: usize) -> Self {
        let percent_complete = if total_items == 0 {
            0.0
        } else {
            completed_items as f64 / total_items as f64 * 100.0
        };
        Self {
            completed_items,
            total_items,
            percent_complete,
        }
    }

    pub fn is_done(&self) -> bool {
        self.completed_items >= self.total_items
    }
}

/// Outcome counts for a finalized wizard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationSummary {
    pub total_items: usize,
    pub items_migrated: usize,
    pub items_skipped: usize,
    pub items_removed: usize,
    /// Items left without a decision; they are not touched on the list.
    pub items_undecided: usize,
    pub total_savings: Decimal,
    pub stores_used: usize,
    /// Mean confidence of the accepted replacements, zero when none.
    pub average_confidence: f64,
}

/// What CompleteWizard returns, stored on the session for replays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardResult {
    pub session_id: WizardSessionId,
    pub list_id: ShoppingListId,
    pub summary: MigrationSummary,
    pub selected_stores: Vec<StoreSelection>,
    pub completed_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_percent_is_zero_for_empty_session() {
        let progress = WizardProgress::new(0, 0);
        assert_eq!(progress.percent_complete, 0.0);
        assert!(progress.is_done());
    }

    #[test]
    fn progress_percent_tracks_ratio() {
        let progress = WizardProgress::new(1, 4);
        assert_eq!(progress.percent_complete, 25.0);
        assert!(!progress.is_done());
    }

    #[test]
    fn progress_serializes_camel_case() {
        let json = serde_json::to_value(WizardProgress::new(2, 2)).unwrap();
        assert_eq!(json["completedItems"], 2);
        assert_eq!(json["percentComplete"], 100.0);
    }
}
