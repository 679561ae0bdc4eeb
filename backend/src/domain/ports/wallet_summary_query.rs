//! Driving port for the wallet summary view.

use async_trait::async_trait;

use crate::domain::{Error, UserId, VoucherStats, WalletSummary};

/// Composite wallet reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WalletSummaryQuery: Send + Sync {
    /// Points, stamps, and voucher counts for `user_id`.
    async fn summary(&self, user_id: &UserId) -> Result<WalletSummary, Error>;
}

/// Fixture query reporting an empty wallet.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureWalletSummaryQuery;

#[async_trait]
impl WalletSummaryQuery for FixtureWalletSummaryQuery {
    async fn summary(&self, _user_id: &UserId) -> Result<WalletSummary, Error> {
        Ok(WalletSummary::compose(0, VoucherStats::default()))
    }
}
