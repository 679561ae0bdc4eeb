//! Operation discriminator for idempotency keys.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Operation protected by an idempotency key.
///
/// Stored beside each record so a key reused against a different endpoint
/// is reported as a conflict rather than replaying an unrelated response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdempotencyScope {
    /// `POST /offers/{id}/accept`.
    OfferAccept,
}

impl IdempotencyScope {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OfferAccept => "offer_accept",
        }
    }
}

impl fmt::Display for IdempotencyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a stored scope is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown idempotency scope: {0}")]
pub struct ParseIdempotencyScopeError(pub String);

impl FromStr for IdempotencyScope {
    type Err = ParseIdempotencyScopeError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "offer_accept" => Ok(Self::OfferAccept),
            other => Err(ParseIdempotencyScopeError(other.to_owned())),
        }
    }
}
