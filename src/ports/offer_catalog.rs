//! OfferCatalog port - current flyer offers and the dataset version they
//! belong to.
//!
//! How candidate products are matched to an expired item is up to the
//! adapter; it reports a similarity in `[0, 1]` per candidate.

use async_trait::async_trait;
use std::collections::HashSet;

use crate::domain::foundation::{DatasetVersion, OfferId, Timestamp};
use crate::domain::wizard::{CandidateOffer, ExpiredItem, WizardError};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("offer catalog unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait OfferCatalog: Send + Sync {
    /// Version of the offer snapshot currently served.
    async fn current_dataset_version(&self) -> Result<DatasetVersion, CatalogError>;

    /// Offers valid at `now` that could replace the item.
    async fn candidates_for(
        &self,
        item: &ExpiredItem,
        now: Timestamp,
    ) -> Result<Vec<CandidateOffer>, CatalogError>;

    /// The subset of `offer_ids` still valid at `now`.
    async fn active_offers(
        &self,
        offer_ids: &[OfferId],
        now: Timestamp,
    ) -> Result<HashSet<OfferId>, CatalogError>;
}

impl From<CatalogError> for WizardError {
    fn from(err: CatalogError) -> Self {
        WizardError::internal(err.to_string())
    }
}
