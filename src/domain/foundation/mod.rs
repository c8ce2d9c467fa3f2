//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, errors, and event plumbing
//! that form the vocabulary of the migration wizard domain.

mod command;
mod errors;
mod events;
mod ids;
mod state_machine;
mod timestamp;

pub use command::CommandMetadata;
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use events::{domain_event, DomainEvent, EventEnvelope, EventId, EventMetadata};
pub use ids::{
    DatasetVersion, IdempotencyKey, ItemId, OfferId, ShoppingListId, StoreId, UserId,
    WizardSessionId, MAX_IDEMPOTENCY_KEY_LENGTH,
};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
