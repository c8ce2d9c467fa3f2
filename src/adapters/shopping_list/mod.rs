//! Shopping-list adapters.
//!
//! - `InMemoryShoppingLists` - Lists, items and the lock flag in one map;
//!   also answers expired-item lookups

mod in_memory;

pub use in_memory::{InMemoryShoppingLists, ListItem};
