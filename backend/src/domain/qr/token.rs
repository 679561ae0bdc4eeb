//! Single-use QR tokens.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};

use crate::domain::{QrTokenId, VoucherId};

use super::TokenHash;

/// Default lifetime of an issued token.
pub const DEFAULT_QR_TTL_SECS: u32 = 300;

/// Lifecycle state of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QrTokenStatus {
    /// Presentable.
    Active,
    /// Consumed by a successful redemption.
    Used,
    /// Past its TTL, rotated, or tied to an expired voucher.
    Expired,
}

impl QrTokenStatus {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Used => "used",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for QrTokenStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QrTokenStatus {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "active" => Ok(Self::Active),
            "used" => Ok(Self::Used),
            "expired" => Ok(Self::Expired),
            other => Err(format!("unknown qr token status: {other}")),
        }
    }
}

/// Token row as read inside a redemption transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrToken {
    /// Token identifier.
    pub id: QrTokenId,
    /// Voucher the token redeems.
    pub voucher_id: VoucherId,
    /// Digest of the code.
    pub code_hash: TokenHash,
    /// Lifetime in seconds from `created_at`.
    pub ttl_sec: u32,
    /// Current status.
    pub status: QrTokenStatus,
    /// Issuance instant.
    pub created_at: DateTime<Utc>,
}

impl QrToken {
    /// Instant the token stops being presentable.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + TimeDelta::seconds(i64::from(self.ttl_sec))
    }

    /// Whether more than `ttl_sec` has elapsed since issuance.
    #[must_use]
    pub fn is_past_ttl(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at()
    }
}
