//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `catalog` - Offer catalog (in-memory)
//! - `events` - Event bus (in-memory) and the queued publisher
//! - `rate_limiter` - Sliding-log limiters (in-memory, Redis)
//! - `session_store` - Wizard session stores (in-memory, Redis)
//! - `shopping_list` - Shopping lists and expired-item lookup (in-memory)

pub mod catalog;
pub mod events;
pub mod rate_limiter;
pub mod session_store;
pub mod shopping_list;

pub use catalog::{CatalogOffer, InMemoryOfferCatalog};
pub use events::{EventWorker, InMemoryEventBus, QueuedEventPublisher};
pub use rate_limiter::{InMemoryRateLimiter, RedisRateLimiter};
pub use session_store::{InMemorySessionStore, RedisSessionStore};
pub use shopping_list::{InMemoryShoppingLists, ListItem};
