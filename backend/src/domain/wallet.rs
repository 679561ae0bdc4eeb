//! Read-only wallet aggregation.

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

/// Window ahead of now in which an active voucher counts as expiring.
pub const EXPIRING_HORIZON: TimeDelta = TimeDelta::hours(48);

/// Redeemed vouchers needed to complete a stamp card.
pub const STAMPS_PER_REWARD: u64 = 10;

/// Voucher counts computed from current voucher rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VoucherStats {
    /// Active vouchers whose expiry has not passed.
    pub active: u64,
    /// Active vouchers expiring within [`EXPIRING_HORIZON`].
    pub expiring: u64,
    /// Redeemed vouchers.
    pub used: u64,
    /// Earliest expiry among active vouchers.
    pub nearest_expire_at: Option<DateTime<Utc>>,
}

/// Stamp card progress derived from redemptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StampCard {
    /// Stamps collected.
    pub count: u64,
    /// Stamps still needed for the next reward.
    pub next_reward_in: u64,
}

impl StampCard {
    /// Derive progress from the number of redemptions.
    ///
    /// # Examples
    /// ```
    /// use voucher_backend::domain::StampCard;
    ///
    /// assert_eq!(StampCard::from_count(0).next_reward_in, 10);
    /// assert_eq!(StampCard::from_count(13).next_reward_in, 7);
    /// assert_eq!(StampCard::from_count(20).next_reward_in, 10);
    /// ```
    #[must_use]
    pub const fn from_count(count: u64) -> Self {
        Self {
            count,
            next_reward_in: STAMPS_PER_REWARD - count % STAMPS_PER_REWARD,
        }
    }
}

/// Voucher section of the summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VoucherCounts {
    /// Active vouchers.
    pub active: u64,
    /// Active vouchers expiring soon.
    pub expiring: u64,
    /// Earliest active expiry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nearest_expire_at: Option<DateTime<Utc>>,
}

/// Composite wallet view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WalletSummary {
    /// Latest ledger balance.
    pub points: i64,
    /// Stamp card progress.
    pub stamps: StampCard,
    /// Voucher counts.
    pub vouchers: VoucherCounts,
}

impl WalletSummary {
    /// Combine a balance with voucher statistics.
    #[must_use]
    pub const fn compose(points: i64, stats: VoucherStats) -> Self {
        Self {
            points,
            stamps: StampCard::from_count(stats.used),
            vouchers: VoucherCounts {
                active: stats.active,
                expiring: stats.expiring,
                nearest_expire_at: stats.nearest_expire_at,
            },
        }
    }
}
