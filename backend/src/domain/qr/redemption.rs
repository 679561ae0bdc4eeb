//! Redemption and issuance decisions for QR tokens.
//!
//! Adapters lock the token and voucher rows, call [`plan_redemption`], and
//! apply the returned [`RedemptionPlan`] before committing. The order of the
//! checks is part of the contract:
//!
//! 1. token TTL;
//! 2. token already used;
//! 3. voucher no longer active (mirrored, no writes);
//! 4. voucher end of life;
//! 5. caller proximity;
//! 6. redeem.
//!
//! A token whose TTL lapses while its voucher is still valid expires alone;
//! the voucher stays active so a fresh token can be issued for it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{QrToken, QrTokenStatus};
use crate::domain::{Error, Voucher, VoucherId, VoucherStatus};

/// Furthest a caller may stand from the offer's place, in metres.
pub const DEFAULT_MAX_DISTANCE_METERS: f64 = 50.0;

/// Result of presenting a token. Every variant is a normal response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum QrVerifyOutcome {
    /// The voucher was redeemed by this call.
    Success {
        /// Redeemed voucher.
        voucher_id: VoucherId,
    },
    /// The token or voucher was redeemed earlier.
    AlreadyUsed {
        /// When the voucher was redeemed.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        used_at: Option<DateTime<Utc>>,
    },
    /// The token or voucher is past its end of life.
    Expired {
        /// When it expired, when known.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expired_at: Option<DateTime<Utc>>,
    },
    /// Unknown code or failed location check; deliberately uninformative.
    Invalid,
}

/// Caller location in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    lat: f64,
    lng: f64,
}

/// Validation errors for [`GeoPoint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GeoPointError {
    /// Latitude outside -90..=90.
    #[error("lat must be between -90 and 90")]
    Latitude,
    /// Longitude outside -180..=180.
    #[error("lng must be between -180 and 180")]
    Longitude,
}

impl GeoPoint {
    /// Validate coordinates.
    ///
    /// # Errors
    /// Returns [`GeoPointError`] for out-of-range or non-finite values.
    pub fn new(lat: f64, lng: f64) -> Result<Self, GeoPointError> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(GeoPointError::Latitude);
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(GeoPointError::Longitude);
        }
        Ok(Self { lat, lng })
    }

    /// Latitude in degrees.
    #[must_use]
    pub const fn lat(&self) -> f64 {
        self.lat
    }

    /// Longitude in degrees.
    #[must_use]
    pub const fn lng(&self) -> f64 {
        self.lng
    }
}

/// Writes an adapter must perform for one presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedemptionPlan {
    /// No writes; return the outcome as is.
    Report(QrVerifyOutcome),
    /// Mark the token expired; also the voucher when its own expiry passed.
    ExpireToken {
        /// Token expiry instant.
        expired_at: DateTime<Utc>,
        /// Whether the voucher must be expired as well.
        expire_voucher: bool,
    },
    /// Mark both voucher and token expired.
    ExpireVoucher {
        /// Voucher expiry instant.
        expired_at: DateTime<Utc>,
    },
    /// Mark the voucher used at `used_at` and the token used.
    Redeem {
        /// Voucher being redeemed.
        voucher_id: VoucherId,
        /// Redemption instant.
        used_at: DateTime<Utc>,
    },
}

impl RedemptionPlan {
    /// Outcome reported to the caller once the plan is applied.
    #[must_use]
    pub const fn outcome(&self) -> QrVerifyOutcome {
        match *self {
            Self::Report(outcome) => outcome,
            Self::ExpireToken { expired_at, .. } | Self::ExpireVoucher { expired_at } => {
                QrVerifyOutcome::Expired {
                    expired_at: Some(expired_at),
                }
            }
            Self::Redeem { voucher_id, .. } => QrVerifyOutcome::Success { voucher_id },
        }
    }
}

/// Decide what a presentation of `token` does at `now`.
///
/// `within_range` is the proximity verdict computed before the transaction;
/// pass `true` when no location check applies.
#[must_use]
pub fn plan_redemption(
    token: &QrToken,
    voucher: &Voucher,
    within_range: bool,
    now: DateTime<Utc>,
) -> RedemptionPlan {
    if token.is_past_ttl(now) {
        let expired_at = token.expires_at();
        if token.status != QrTokenStatus::Active {
            return RedemptionPlan::Report(QrVerifyOutcome::Expired {
                expired_at: Some(expired_at),
            });
        }
        let expire_voucher =
            voucher.status == VoucherStatus::Active && voucher.is_past_expiry(now);
        return RedemptionPlan::ExpireToken {
            expired_at,
            expire_voucher,
        };
    }

    match token.status {
        QrTokenStatus::Used => {
            return RedemptionPlan::Report(QrVerifyOutcome::AlreadyUsed {
                used_at: voucher.used_at,
            });
        }
        QrTokenStatus::Expired => {
            return RedemptionPlan::Report(QrVerifyOutcome::Expired { expired_at: None });
        }
        QrTokenStatus::Active => {}
    }

    match voucher.status {
        VoucherStatus::Used => {
            return RedemptionPlan::Report(QrVerifyOutcome::AlreadyUsed {
                used_at: voucher.used_at,
            });
        }
        VoucherStatus::Expired => {
            return RedemptionPlan::Report(QrVerifyOutcome::Expired {
                expired_at: Some(voucher.expire_at),
            });
        }
        VoucherStatus::Active => {}
    }

    if voucher.is_past_expiry(now) {
        return RedemptionPlan::ExpireVoucher {
            expired_at: voucher.expire_at,
        };
    }

    if !within_range {
        return RedemptionPlan::Report(QrVerifyOutcome::Invalid);
    }

    RedemptionPlan::Redeem {
        voucher_id: voucher.id,
        used_at: now,
    }
}

/// Why a voucher cannot receive a new token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueRejection {
    /// The voucher has been redeemed.
    AlreadyUsed {
        /// Redemption instant.
        used_at: Option<DateTime<Utc>>,
    },
    /// The voucher is past its end of life.
    Expired {
        /// Expiry instant.
        expire_at: DateTime<Utc>,
    },
}

impl From<IssueRejection> for Error {
    fn from(rejection: IssueRejection) -> Self {
        match rejection {
            IssueRejection::AlreadyUsed { used_at } => {
                Self::already_used("voucher has already been redeemed")
                    .with_details(serde_json::json!({ "usedAt": used_at }))
            }
            IssueRejection::Expired { expire_at } => Self::expired("voucher has expired")
                .with_details(serde_json::json!({ "expiredAt": expire_at })),
        }
    }
}

/// Check that `voucher` can be given a fresh token at `now`.
///
/// # Errors
/// Returns [`IssueRejection`] for used or expired vouchers.
pub fn plan_issue(voucher: &Voucher, now: DateTime<Utc>) -> Result<(), IssueRejection> {
    match voucher.status {
        VoucherStatus::Used => Err(IssueRejection::AlreadyUsed {
            used_at: voucher.used_at,
        }),
        VoucherStatus::Expired => Err(IssueRejection::Expired {
            expire_at: voucher.expire_at,
        }),
        VoucherStatus::Active if voucher.is_past_expiry(now) => Err(IssueRejection::Expired {
            expire_at: voucher.expire_at,
        }),
        VoucherStatus::Active => Ok(()),
    }
}

#[cfg(test)]
#[path = "redemption_tests.rs"]
mod tests;
