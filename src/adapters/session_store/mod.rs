//! Wizard session store adapters.
//!
//! - `InMemorySessionStore` - Process-local, for tests and single-server use
//! - `RedisSessionStore` - Shared store with atomic conditional writes

mod in_memory;
mod redis;

pub use in_memory::InMemorySessionStore;
pub use redis::RedisSessionStore;
