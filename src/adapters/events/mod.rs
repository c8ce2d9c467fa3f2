//! Event bus adapters.
//!
//! - `InMemoryEventBus` - In-process capture bus for tests and local runs
//! - `QueuedEventPublisher` - Bounded queue with a drop policy in front of
//!   another publisher

mod in_memory;
mod queued_publisher;

pub use in_memory::InMemoryEventBus;
pub use queued_publisher::{EventWorker, QueuedEventPublisher};
