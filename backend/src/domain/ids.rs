//! Strongly typed identifiers for the voucher aggregates.
//!
//! Every identifier is a UUID on the wire and in storage. Distinct newtypes
//! keep an offer id from being passed where a voucher id is expected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Validation errors raised while parsing identifiers from client input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdValidationError {
    /// Input was empty.
    #[error("identifier must not be empty")]
    Empty,
    /// Input was not a canonical UUID.
    #[error("identifier must be a valid UUID")]
    Invalid,
}

fn parse_uuid_id(raw: &str) -> Result<Uuid, IdValidationError> {
    if raw.is_empty() {
        return Err(IdValidationError::Empty);
    }
    if raw.trim() != raw {
        return Err(IdValidationError::Invalid);
    }
    Uuid::parse_str(raw).map_err(|_| IdValidationError::Invalid)
}

macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Wrap an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Generate a fresh random identifier.
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

        impl FromStr for $name {
            type Err = IdValidationError;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                parse_uuid_id(raw).map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

uuid_identifier!(
    /// Stable identifier of the authenticated user.
    UserId
);
uuid_identifier!(
    /// Identifier of a location offer.
    OfferId
);
uuid_identifier!(
    /// Identifier of an issued voucher.
    VoucherId
);
uuid_identifier!(
    /// Identifier of a QR token row.
    QrTokenId
);
uuid_identifier!(
    /// Identifier of an immutable ledger row; doubles as the history cursor.
    LedgerEntryId
);
