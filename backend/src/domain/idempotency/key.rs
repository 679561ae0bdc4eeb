//! Client-supplied idempotency keys.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Validation errors for [`IdempotencyKey`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdempotencyKeyValidationError {
    /// The header was present but empty.
    #[error("idempotency key must not be empty")]
    EmptyKey,
    /// The header was not a UUID.
    #[error("idempotency key must be a valid UUID")]
    InvalidKey,
}

/// Idempotency key sent by clients on mutating requests.
///
/// # Examples
/// ```
/// use voucher_backend::domain::idempotency::IdempotencyKey;
///
/// let key: IdempotencyKey = "550e8400-e29b-41d4-a716-446655440000".parse().unwrap();
/// assert_eq!(key.to_string(), "550e8400-e29b-41d4-a716-446655440000");
/// assert!("not-a-key".parse::<IdempotencyKey>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(Uuid);

impl IdempotencyKey {
    /// Wrap a UUID loaded from storage.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Generate a fresh key; used by tests and internal callers.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl FromStr for IdempotencyKey {
    type Err = IdempotencyKeyValidationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if raw.is_empty() {
            return Err(IdempotencyKeyValidationError::EmptyKey);
        }
        if raw.trim() != raw {
            return Err(IdempotencyKeyValidationError::InvalidKey);
        }
        Uuid::parse_str(raw)
            .map(Self)
            .map_err(|_| IdempotencyKeyValidationError::InvalidKey)
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
