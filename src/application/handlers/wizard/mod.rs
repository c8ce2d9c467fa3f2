//! Wizard command and query handlers.
//!
//! All handlers share one [`WizardServices`] bundle. Session access and the
//! list lock are implemented on it so every operation loads, checks, and
//! writes sessions the same way.

mod bulk_accept;
mod cancel_wizard;
mod complete_wizard;
mod get_session;
mod has_expired_items;
mod list_lock;
mod record_decision;
mod services;
mod session_access;
mod start_wizard;

pub use bulk_accept::{
    BulkAcceptSuggestionsCommand, BulkAcceptSuggestionsHandler, BulkAcceptSuggestionsResult,
};
pub use cancel_wizard::{CancelWizardCommand, CancelWizardHandler};
pub use complete_wizard::{CompleteWizardCommand, CompleteWizardHandler, CompleteWizardResult};
pub use get_session::{GetSessionHandler, GetSessionQuery};
pub use has_expired_items::{HasExpiredItemsHandler, HasExpiredItemsQuery};
pub use record_decision::{RecordDecisionCommand, RecordDecisionHandler, RecordDecisionResult};
pub use services::WizardServices;
pub use start_wizard::{StartWizardCommand, StartWizardHandler, StartWizardResult};
