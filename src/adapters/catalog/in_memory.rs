//! In-memory offer catalog.
//!
//! Product similarity is the Jaccard overlap of lowercase word tokens of the
//! product names. Every change to the offer set bumps the dataset version.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DatasetVersion, OfferId, Timestamp};
use crate::domain::wizard::{CandidateOffer, ExpiredItem, StoreRef};
use crate::ports::{CatalogError, OfferCatalog};

/// One flyer offer.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogOffer {
    pub offer_id: OfferId,
    pub store: StoreRef,
    pub product_name: String,
    pub brand: Option<String>,
    pub price: Decimal,
    pub size: Option<String>,
    pub valid_from: Timestamp,
    pub valid_until: Timestamp,
}

impl CatalogOffer {
    fn is_active_at(&self, now: Timestamp) -> bool {
        !now.is_before(&self.valid_from) && now.is_before(&self.valid_until)
    }
}

#[derive(Debug, Default)]
struct CatalogState {
    offers: BTreeMap<OfferId, CatalogOffer>,
    version: u64,
}

impl CatalogState {
    fn bump(&mut self) {
        self.version += 1;
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryOfferCatalog {
    state: Arc<RwLock<CatalogState>>,
}

impl InMemoryOfferCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an offer.
    pub async fn add_offer(&self, offer: CatalogOffer) {
        let mut state = self.state.write().await;
        state.offers.insert(offer.offer_id, offer);
        state.bump();
    }

    /// Ends an offer's validity at `at`. Returns false for an unknown offer.
    pub async fn expire_offer(&self, offer_id: OfferId, at: Timestamp) -> bool {
        let mut state = self.state.write().await;
        let Some(offer) = state.offers.get_mut(&offer_id) else {
            return false;
        };
        offer.valid_until = at;
        state.bump();
        true
    }

    pub async fn offer_count(&self) -> usize {
        self.state.read().await.offers.len()
    }
}

fn tokens(name: &str) -> HashSet<String> {
    name.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Jaccard overlap of the two names' word tokens, in `[0, 1]`.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let a = tokens(a);
    let b = tokens(b);
    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f64 / union as f64
}

#[async_trait]
impl OfferCatalog for InMemoryOfferCatalog {
    async fn current_dataset_version(&self) -> Result<DatasetVersion, CatalogError> {
        let version = self.state.read().await.version;
        Ok(DatasetVersion::new(format!("v{}", version)))
    }

    async fn candidates_for(
        &self,
        item: &ExpiredItem,
        now: Timestamp,
    ) -> Result<Vec<CandidateOffer>, CatalogError> {
        let state = self.state.read().await;
        Ok(state
            .offers
            .values()
            .filter(|o| o.is_active_at(now))
            .filter_map(|o| {
                let similarity = name_similarity(&item.product_name, &o.product_name);
                (similarity > 0.0).then(|| CandidateOffer {
                    offer_id: o.offer_id,
                    store: o.store.clone(),
                    product_name: o.product_name.clone(),
                    brand: o.brand.clone(),
                    price: o.price,
                    size: o.size.clone(),
                    valid_until: o.valid_until,
                    similarity,
                })
            })
            .collect())
    }

    async fn active_offers(
        &self,
        offer_ids: &[OfferId],
        now: Timestamp,
    ) -> Result<HashSet<OfferId>, CatalogError> {
        let state = self.state.read().await;
        Ok(offer_ids
            .iter()
            .filter(|id| state.offers.get(id).is_some_and(|o| o.is_active_at(now)))
            .copied()
            .collect())
    }
}
