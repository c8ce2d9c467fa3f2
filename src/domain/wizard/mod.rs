//! Wizard module - Migration of expired shopping-list items.
//!
//! A `WizardSession` snapshots the expired items of a list, attaches ranked
//! replacement suggestions, collects one decision per item and is finally
//! completed (decisions applied), cancelled, or expired.

mod bulk;
mod changes;
mod decision;
mod errors;
mod events;
mod expired_item;
mod session;
mod status;
mod store_selection;
mod suggestion;
mod summary;

pub use bulk::{plan_bulk_accept, BulkPick, BulkPlan};
pub use changes::ItemChange;
pub use decision::{Decision, DecisionAction, DecisionSource};
pub use errors::WizardError;
pub use events::{
    WizardCancelled, WizardCompleted, WizardDecisionRecorded, WizardExpired, WizardStarted,
};
pub use expired_item::{ExpiredItem, StoreRef};
pub use session::{NewWizardSession, RecordOutcome, WizardSession};
pub use status::WizardStatus;
pub use store_selection::{derive_store_selections, StoreSelection};
pub use suggestion::{CandidateOffer, MatchedField, ScoreBreakdown, Suggestion, SuggestionEngine};
pub use summary::{MigrationSummary, WizardProgress, WizardResult};
