//! Offer Migration - moves shopping-list items off expired flyer offers.
//!
//! A migration wizard snapshots a list's expired items, proposes ranked
//! replacement offers, records one decision per item, and finally applies
//! all decisions to the list in one step (or discards them on cancel).
//!
//! Layout follows ports and adapters: `domain` holds the wizard aggregate
//! and scoring, `ports` the collaborator traits, `adapters` in-memory and
//! Redis implementations, and `application` one handler per operation.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
