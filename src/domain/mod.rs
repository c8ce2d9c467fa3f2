//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors, events)
//! - `wizard` - Migration wizard session, suggestions, decisions and events

pub mod foundation;
pub mod wizard;
