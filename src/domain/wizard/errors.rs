//! Wizard-specific error types.
//!
//! | Error | Code | Expected outcome |
//! |-------|------|------------------|
//! | Validation | VALIDATION_ERROR | yes |
//! | NotFound | NOT_FOUND | yes |
//! | SessionExpired | SESSION_EXPIRED | yes |
//! | StaleData | STALE_DATA | yes |
//! | ListLocked | LIST_LOCKED | yes |
//! | RateLimitExceeded | RATE_LIMIT_EXCEEDED | yes |
//! | InvalidDecision | INVALID_DECISION | yes |
//! | RevalidationFailed | REVALIDATION_FAILED | yes |
//! | Unauthorized | UNAUTHORIZED | yes |
//! | Conflict | CONFLICT | yes |
//! | Internal | INTERNAL_ERROR | no |

use std::collections::HashMap;

use crate::domain::foundation::{
    DatasetVersion, DomainError, ErrorCode, ItemId, OfferId, ShoppingListId, ValidationError,
    WizardSessionId,
};

use super::status::WizardStatus;

/// Errors surfaced by wizard operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WizardError {
    #[error("Validation failed for '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    #[error("Wizard session {session_id} is {status}")]
    SessionExpired {
        session_id: WizardSessionId,
        status: WizardStatus,
    },

    #[error("Offer data changed since the wizard started ({expected} -> {actual})")]
    StaleData {
        expected: DatasetVersion,
        actual: DatasetVersion,
    },

    #[error("Shopping list {list_id} is locked by another wizard")]
    ListLocked {
        list_id: ShoppingListId,
        locked_by: Option<WizardSessionId>,
    },

    #[error("Too many wizard sessions: limit {limit} per {window_secs}s, retry in {retry_after_secs}s")]
    RateLimitExceeded {
        limit: u32,
        window_secs: u64,
        retry_after_secs: u64,
    },

    #[error("Invalid decision for item {item_id}: {reason}")]
    InvalidDecision { item_id: ItemId, reason: String },

    #[error("Decision for item {item_id} can no longer be applied: {reason}")]
    RevalidationFailed {
        item_id: ItemId,
        offer_id: Option<OfferId>,
        reason: String,
    },

    #[error("Not authorized to access this resource")]
    Unauthorized,

    #[error("Wizard session {session_id} was modified concurrently")]
    Conflict { session_id: WizardSessionId },

    /// The cause is logged where it happens; callers only see a generic message.
    #[error("Internal error")]
    Internal(String),
}

impl WizardError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        WizardError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn session_not_found(id: WizardSessionId) -> Self {
        WizardError::NotFound {
            resource: "Wizard session",
            id: id.to_string(),
        }
    }

    pub fn list_not_found(id: ShoppingListId) -> Self {
        WizardError::NotFound {
            resource: "Shopping list",
            id: id.to_string(),
        }
    }

    pub fn item_not_found(id: ItemId) -> Self {
        WizardError::NotFound {
            resource: "Expired item",
            id: id.to_string(),
        }
    }

    pub fn session_expired(session_id: WizardSessionId, status: WizardStatus) -> Self {
        WizardError::SessionExpired { session_id, status }
    }

    pub fn invalid_decision(item_id: ItemId, reason: impl Into<String>) -> Self {
        WizardError::InvalidDecision {
            item_id,
            reason: reason.into(),
        }
    }

    pub fn revalidation_failed(
        item_id: ItemId,
        offer_id: Option<OfferId>,
        reason: impl Into<String>,
    ) -> Self {
        WizardError::RevalidationFailed {
            item_id,
            offer_id,
            reason: reason.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        WizardError::Internal(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            WizardError::Validation { .. } => ErrorCode::ValidationError,
            WizardError::NotFound { .. } => ErrorCode::NotFound,
            WizardError::SessionExpired { .. } => ErrorCode::SessionExpired,
            WizardError::StaleData { .. } => ErrorCode::StaleData,
            WizardError::ListLocked { .. } => ErrorCode::ListLocked,
            WizardError::RateLimitExceeded { .. } => ErrorCode::RateLimitExceeded,
            WizardError::InvalidDecision { .. } => ErrorCode::InvalidDecision,
            WizardError::RevalidationFailed { .. } => ErrorCode::RevalidationFailed,
            WizardError::Unauthorized => ErrorCode::Unauthorized,
            WizardError::Conflict { .. } => ErrorCode::Conflict,
            WizardError::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Structured context for the caller, keyed in camelCase.
    pub fn details(&self) -> HashMap<String, String> {
        let mut details = HashMap::new();
        let mut put = |k: &str, v: String| {
            details.insert(k.to_string(), v);
        };
        match self {
            WizardError::Validation { field, .. } => put("field", field.clone()),
            WizardError::NotFound { resource, id } => {
                put("resource", resource.to_string());
                put("id", id.clone());
            }
            WizardError::SessionExpired { session_id, status } => {
                put("sessionId", session_id.to_string());
                put("status", status.to_string());
            }
            WizardError::StaleData { expected, actual } => {
                put("expectedVersion", expected.to_string());
                put("actualVersion", actual.to_string());
            }
            WizardError::ListLocked { list_id, locked_by } => {
                put("listId", list_id.to_string());
                if let Some(owner) = locked_by {
                    put("lockedBy", owner.to_string());
                }
            }
            WizardError::RateLimitExceeded {
                limit,
                window_secs,
                retry_after_secs,
            } => {
                put("limit", limit.to_string());
                put("windowSeconds", window_secs.to_string());
                put("retryAfter", retry_after_secs.to_string());
            }
            WizardError::InvalidDecision { item_id, .. } => put("itemId", item_id.to_string()),
            WizardError::RevalidationFailed {
                item_id, offer_id, ..
            } => {
                put("itemId", item_id.to_string());
                if let Some(offer) = offer_id {
                    put("offerId", offer.to_string());
                }
            }
            WizardError::Conflict { session_id } => put("sessionId", session_id.to_string()),
            WizardError::Unauthorized | WizardError::Internal(_) => {}
        }
        details
    }

    /// True for user-actionable outcomes that should not be logged as failures.
    pub fn is_expected(&self) -> bool {
        !matches!(self, WizardError::Internal(_))
    }

    pub fn to_domain_error(&self) -> DomainError {
        DomainError::new(self.code(), self.to_string()).with_details(self.details())
    }
}

impl From<ValidationError> for WizardError {
    fn from(err: ValidationError) -> Self {
        WizardError::Validation {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<WizardError> for DomainError {
    fn from(err: WizardError) -> Self {
        err.to_domain_error()
    }
}
