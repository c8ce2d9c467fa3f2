//! RateLimiter adapters: a process-local one and a Redis one whose counts
//! are shared by every server.
//!
//! ```ignore
//! let limiter = InMemoryRateLimiter::new();
//! let key = RateLimitKey::for_user(&user_id, "wizard_start");
//! let result = limiter.check(&key, RateLimitQuota::new(5, 3600)).await?;
//! ```

mod in_memory;
mod redis;

pub use in_memory::InMemoryRateLimiter;
pub use redis::RedisRateLimiter;
