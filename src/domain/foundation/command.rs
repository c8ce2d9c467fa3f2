//! Caller context handed to every wizard handler.
//!
//! The API layer authenticates the request and builds `CommandMetadata`;
//! handlers take the acting user from here and never from the command body.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandMetadata {
    pub user_id: UserId,

    /// Shared by every log line and event one request produces. Generated
    /// when the caller does not supply one.
    correlation_id: String,
}

impl CommandMetadata {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            correlation_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = id.into();
        self
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }
}
