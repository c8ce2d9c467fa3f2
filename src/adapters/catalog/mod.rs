//! Offer catalog adapters.

mod in_memory;

pub use in_memory::{name_similarity, CatalogOffer, InMemoryOfferCatalog};
