//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Commands (start, decide, bulk accept, complete, cancel) and queries
//! (get session, has expired items) each have their own handler.

pub mod handlers;

pub use handlers::*;
