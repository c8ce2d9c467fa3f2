//! Strongly-typed identifier value objects.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::ValidationError;

/// Maximum length accepted for a client-supplied idempotency key.
pub const MAX_IDEMPOTENCY_KEY_LENGTH: usize = 128;

/// Unique identifier for a migration wizard session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WizardSessionId(Uuid);

impl WizardSessionId {
    /// Creates a new random WizardSessionId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a WizardSessionId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for WizardSessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WizardSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for WizardSessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// User identifier (typically from auth provider).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Creates a new UserId, returning error if empty.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::empty_field("user_id"));
        }
        Ok(Self(id))
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Declares a 64-bit integer identifier owned by the relational side
/// (lists, items, offers, stores).
macro_rules! int_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw database identifier.
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the raw identifier.
            pub const fn value(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.parse()?))
            }
        }
    };
}

int_id!(
    /// Identifier of a shopping list.
    ShoppingListId
);
int_id!(
    /// Identifier of a shopping-list item.
    ItemId
);
int_id!(
    /// Identifier of a flyer price offer. Suggestions are identified by the offer they propose.
    OfferId
);
int_id!(
    /// Identifier of a store.
    StoreId
);

/// Token that makes a repeated request produce one logical effect.
///
/// Either supplied by the client or derived from the request contents
/// with [`IdempotencyKey::derive`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

const DERIVED_PREFIX: &str = "derived:";

impl IdempotencyKey {
    /// Creates a client-supplied key.
    ///
    /// # Errors
    ///
    /// - `EmptyField` if the key is blank
    /// - `InvalidFormat` if the key exceeds [`MAX_IDEMPOTENCY_KEY_LENGTH`]
    pub fn new(key: impl Into<String>) -> Result<Self, ValidationError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(ValidationError::empty_field("idempotency_key"));
        }
        if key.len() > MAX_IDEMPOTENCY_KEY_LENGTH {
            return Err(ValidationError::invalid_format(
                "idempotency_key",
                format!("must be at most {} characters", MAX_IDEMPOTENCY_KEY_LENGTH),
            ));
        }
        Ok(Self(key))
    }

    /// Derives a deterministic key from the parts identifying an operation.
    ///
    /// Parts are length-prefixed before hashing so `["ab", "c"]` and
    /// `["a", "bc"]` produce different keys.
    pub fn derive(parts: &[&str]) -> Self {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update((part.len() as u64).to_be_bytes());
            hasher.update(part.as_bytes());
        }
        Self(format!("{}{:x}", DERIVED_PREFIX, hasher.finalize()))
    }

    /// True for keys built by [`IdempotencyKey::derive`].
    pub fn is_derived(&self) -> bool {
        self.0.starts_with(DERIVED_PREFIX)
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque marker of the price/product snapshot suggestions were built from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetVersion(String);

impl DatasetVersion {
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatasetVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
