//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the wizard and the outside world. Adapters implement these ports.
//!
//! ## State
//!
//! - `WizardSessionStore` - TTL-bound session persistence with conditional writes
//! - `RateLimiter` - Sliding-window throttle for session creation
//!
//! ## Collaborators
//!
//! - `ShoppingListService` - Ownership, advisory lock, atomic item changes
//! - `ExpiredItemsProvider` - Items whose linked offer expired
//! - `OfferCatalog` - Replacement candidates and dataset version
//!
//! ## Events
//!
//! - `EventPublisher` - Port for publishing domain events

mod event_publisher;
mod expired_items;
mod offer_catalog;
mod rate_limiter;
mod session_store;
mod shopping_list;

pub use event_publisher::EventPublisher;
pub use expired_items::{ExpiredItemsError, ExpiredItemsProvider};
pub use offer_catalog::{CatalogError, OfferCatalog};
pub use rate_limiter::{
    RateLimitDenied, RateLimitError, RateLimitKey, RateLimitQuota, RateLimitResult,
    RateLimitStatus, RateLimiter,
};
pub use session_store::{SessionStoreError, WizardSessionStore};
pub use shopping_list::{
    ApplyOutcome, ShoppingList, ShoppingListError, ShoppingListService,
};
