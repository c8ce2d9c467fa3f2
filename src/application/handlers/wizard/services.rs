//! Ports and settings shared by every wizard handler.

use std::fmt::Display;
use std::sync::Arc;

use crate::config::WizardConfig;
use crate::domain::wizard::WizardError;
use crate::ports::{
    EventPublisher, ExpiredItemsProvider, OfferCatalog, RateLimiter, ShoppingListService,
    WizardSessionStore,
};

/// Collaborators of the wizard engine.
///
/// Cloning is cheap; every port sits behind an `Arc`.
#[derive(Clone)]
pub struct WizardServices {
    pub sessions: Arc<dyn WizardSessionStore>,
    pub lists: Arc<dyn ShoppingListService>,
    pub expired_items: Arc<dyn ExpiredItemsProvider>,
    pub catalog: Arc<dyn OfferCatalog>,
    pub rate_limiter: Arc<dyn RateLimiter>,
    pub events: Arc<dyn EventPublisher>,
    pub config: WizardConfig,
}

impl std::fmt::Debug for WizardServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WizardServices")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Converts a port error, logging the cause when it becomes an
/// `Internal` error (callers only see a generic message).
pub(crate) fn logged<E>(operation: &'static str) -> impl FnOnce(E) -> WizardError
where
    E: Display + Into<WizardError>,
{
    move |err| {
        let cause = err.to_string();
        let converted: WizardError = err.into();
        if matches!(converted, WizardError::Internal(_)) {
            tracing::error!(operation, error = %cause, "Wizard dependency failed");
        }
        converted
    }
}
