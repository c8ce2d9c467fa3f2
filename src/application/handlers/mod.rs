//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod wizard;

pub use wizard::{
    BulkAcceptSuggestionsCommand, BulkAcceptSuggestionsHandler, BulkAcceptSuggestionsResult,
    CancelWizardCommand, CancelWizardHandler, CompleteWizardCommand, CompleteWizardHandler,
    CompleteWizardResult, GetSessionHandler, GetSessionQuery, HasExpiredItemsHandler,
    HasExpiredItemsQuery, RecordDecisionCommand, RecordDecisionHandler, RecordDecisionResult,
    StartWizardCommand, StartWizardHandler, StartWizardResult, WizardServices,
};
