//! Vouchers issued from accepted offers.
//!
//! Status only moves forward: `active` to `used` on redemption, or
//! `active` to `expired` when its end of life passes. Terminal states are
//! never left.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{OfferId, UserId, VoucherId};

/// Lifecycle state of a voucher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoucherStatus {
    /// Issued and redeemable.
    Active,
    /// Redeemed through a QR token.
    Used,
    /// Past its end of life without redemption.
    Expired,
}

impl VoucherStatus {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Used => "used",
            Self::Expired => "expired",
        }
    }

    /// Position of the status in wallet listings: active vouchers come
    /// first, then used, then expired.
    #[must_use]
    pub const fn list_rank(self) -> i16 {
        match self {
            Self::Active => 0,
            Self::Used => 1,
            Self::Expired => 2,
        }
    }

    /// Whether moving from `self` to `next` respects forward-only ordering.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!((self, next), (Self::Active, Self::Used | Self::Expired))
    }
}

impl fmt::Display for VoucherStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error raised for unrecognised stored voucher states.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown voucher status: {0}")]
pub struct ParseVoucherStatusError(pub String);

impl FromStr for VoucherStatus {
    type Err = ParseVoucherStatusError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "active" => Ok(Self::Active),
            "used" => Ok(Self::Used),
            "expired" => Ok(Self::Expired),
            other => Err(ParseVoucherStatusError(other.to_owned())),
        }
    }
}

/// A voucher as read inside a redemption or issuance transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voucher {
    /// Voucher identifier.
    pub id: VoucherId,
    /// Owning user.
    pub user_id: UserId,
    /// Offer the voucher was issued from.
    pub offer_id: OfferId,
    /// Current status.
    pub status: VoucherStatus,
    /// End of life inherited from the offer.
    pub expire_at: DateTime<Utc>,
    /// Redemption instant, set once the voucher is used.
    pub used_at: Option<DateTime<Utc>>,
}

impl Voucher {
    /// Whether the voucher's own end of life has passed at `now`.
    #[must_use]
    pub fn is_past_expiry(&self, now: DateTime<Utc>) -> bool {
        self.expire_at < now
    }
}

/// A voucher as listed in the owner's wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoucherCard {
    /// Voucher identifier; also the listing cursor.
    pub id: VoucherId,
    /// Offer the voucher was issued from.
    pub offer_id: OfferId,
    /// Offer headline.
    pub title: String,
    /// Current status.
    pub status: VoucherStatus,
    /// End of life inherited from the offer.
    pub expire_at: DateTime<Utc>,
    /// Redemption instant for used vouchers.
    pub used_at: Option<DateTime<Utc>>,
}

/// Keyset position of a card in wallet listings.
///
/// Cards sort by status rank, then soonest expiry, then id, so the most
/// urgent active vouchers lead and every page boundary is unambiguous.
pub type VoucherListKey = (i16, DateTime<Utc>, VoucherId);

impl VoucherCard {
    /// Sort key of this card.
    #[must_use]
    pub const fn list_key(&self) -> VoucherListKey {
        (self.status.list_rank(), self.expire_at, self.id)
    }
}
