//! Rate limiting port for throttling wizard session creation.
//!
//! The caller supplies the quota with every check, so one limiter instance
//! can serve differently sized limits. Implementations use a sliding log:
//! a request is allowed when fewer than `max_requests` were accepted during
//! the last `window_secs`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::wizard::WizardError;

/// Sliding-log limiter shared by every handler instance.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Counts the request when it fits the quota; denied requests are not counted.
    async fn check(
        &self,
        key: &RateLimitKey,
        quota: RateLimitQuota,
    ) -> Result<RateLimitResult, RateLimitError>;

    /// Reads the counter without recording anything.
    async fn status(
        &self,
        key: &RateLimitKey,
        quota: RateLimitQuota,
    ) -> Result<RateLimitStatus, RateLimitError>;

    /// Forgets every recorded request for the key.
    async fn reset(&self, key: &RateLimitKey) -> Result<(), RateLimitError>;
}

/// How many requests a key may make per window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitQuota {
    pub max_requests: u32,
    pub window_secs: u64,
}

impl RateLimitQuota {
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window_secs,
        }
    }
}

/// One user's counter for one throttled action.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct RateLimitKey(String);

impl RateLimitKey {
    /// `action` names what is being throttled, e.g. `wizard_start`.
    pub fn for_user(user_id: &UserId, action: &str) -> Self {
        Self(format!("ratelimit:{}:{}", action, user_id))
    }

    /// Storage key, without any backend namespace.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RateLimitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of a rate limit check.
#[derive(Debug, Clone)]
pub enum RateLimitResult {
    Allowed(RateLimitStatus),
    Denied(RateLimitDenied),
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed(_))
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, RateLimitResult::Denied(_))
    }
}

/// Counter state after an allowed request, or as read by `status`.
#[derive(Debug, Clone)]
pub struct RateLimitStatus {
    pub limit: u32,
    pub remaining: u32,
    /// When the oldest recorded request leaves the window.
    pub reset_at: Timestamp,
    pub window_secs: u64,
}

/// Why a request was turned away.
#[derive(Debug, Clone)]
pub struct RateLimitDenied {
    pub limit: u32,
    pub window_secs: u64,
    /// Seconds until the oldest counted request leaves the window.
    pub retry_after_secs: u64,
}

impl From<RateLimitDenied> for WizardError {
    fn from(denied: RateLimitDenied) -> Self {
        WizardError::RateLimitExceeded {
            limit: denied.limit,
            window_secs: denied.window_secs,
            retry_after_secs: denied.retry_after_secs,
        }
    }
}

/// Backend failure. Callers fail open on it.
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("rate limiter unavailable: {0}")]
    Unavailable(String),
}

impl From<RateLimitError> for WizardError {
    fn from(err: RateLimitError) -> Self {
        WizardError::internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ErrorCode;

    #[test]
    fn key_combines_action_and_user() {
        let user_id = UserId::new("user-123").unwrap();
        let key = RateLimitKey::for_user(&user_id, "wizard_start");
        assert_eq!(key.as_str(), "ratelimit:wizard_start:user-123");
        assert_ne!(key, RateLimitKey::for_user(&user_id, "wizard_complete"));
    }

    #[test]
    fn denial_surfaces_as_rate_limit_exceeded() {
        let err: WizardError = RateLimitDenied {
            limit: 5,
            window_secs: 3600,
            retry_after_secs: 42,
        }
        .into();

        assert_eq!(err.code(), ErrorCode::RateLimitExceeded);
        assert_eq!(err.details()["retryAfter"], "42");
        assert_eq!(err.details()["windowSeconds"], "3600");
    }

    #[test]
    fn backend_failure_is_internal() {
        let err: WizardError = RateLimitError::Unavailable("connection reset".to_string()).into();
        assert_eq!(err.code(), ErrorCode::InternalError);
    }
}
