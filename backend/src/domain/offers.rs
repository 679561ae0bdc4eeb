//! Offer inbox entries and the acceptance decision.
//!
//! An inbox entry in `new` or `dismissed` may be accepted exactly once.
//! Storage adapters lock the entry, then ask [`plan_acceptance`] what to do
//! so every adapter applies the same rules inside its own transaction.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::VoucherId;

/// HTTP status used for a freshly accepted offer.
pub const OFFER_ACCEPTED_STATUS: u16 = 201;

/// Delivery state of an offer in a user's inbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InboxStatus {
    /// Delivered, not yet acted on.
    New,
    /// Accepted; a voucher exists.
    Accepted,
    /// Hidden by the user; still acceptable.
    Dismissed,
}

impl InboxStatus {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Accepted => "accepted",
            Self::Dismissed => "dismissed",
        }
    }
}

impl fmt::Display for InboxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error raised for unrecognised stored inbox states.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown inbox status: {0}")]
pub struct ParseInboxStatusError(pub String);

impl FromStr for InboxStatus {
    type Err = ParseInboxStatusError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "new" => Ok(Self::New),
            "accepted" => Ok(Self::Accepted),
            "dismissed" => Ok(Self::Dismissed),
            other => Err(ParseInboxStatusError(other.to_owned())),
        }
    }
}

/// What an adapter must do with a locked inbox entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptancePlan {
    /// Report the existing voucher; no writes.
    AlreadyAccepted,
    /// Reject; no writes.
    OfferExpired,
    /// Insert an active voucher and mark the entry accepted.
    IssueVoucher,
}

/// Decide how to handle an acceptance attempt.
///
/// The accepted check comes first so repeated calls on a finished offer keep
/// reporting the voucher even after the offer ends.
///
/// # Examples
/// ```
/// use chrono::{TimeDelta, Utc};
/// use voucher_backend::domain::{AcceptancePlan, InboxStatus, plan_acceptance};
///
/// let now = Utc::now();
/// let plan = plan_acceptance(InboxStatus::New, now - TimeDelta::minutes(1), now);
/// assert_eq!(plan, AcceptancePlan::OfferExpired);
/// ```
#[must_use]
pub fn plan_acceptance(
    status: InboxStatus,
    offer_end_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> AcceptancePlan {
    if status == InboxStatus::Accepted {
        return AcceptancePlan::AlreadyAccepted;
    }
    if offer_end_at < now {
        return AcceptancePlan::OfferExpired;
    }
    AcceptancePlan::IssueVoucher
}

/// Successful acceptance payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedOffer {
    /// Newly issued voucher.
    pub voucher_id: VoucherId,
    /// Active vouchers held by the user after the acceptance.
    pub wallet_count: u64,
}
