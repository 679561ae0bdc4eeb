//! Driving port for the wallet voucher listing.

use async_trait::async_trait;
use pagination::{Page, PageLimit};

use crate::domain::{Error, UserId, VoucherCard, VoucherId, VoucherStatus};

/// Request for one page of wallet vouchers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoucherPageRequest {
    /// Wallet owner.
    pub user_id: UserId,
    /// Only list vouchers in this state; every state when absent.
    pub status: Option<VoucherStatus>,
    /// Last voucher of the previous page.
    pub cursor: Option<VoucherId>,
    /// Page size.
    pub limit: PageLimit,
}

/// One page of wallet vouchers, active and soonest-expiring first.
pub type VoucherPage = Page<VoucherCard, VoucherId>;

/// Wallet voucher reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VoucherQuery: Send + Sync {
    /// Fetch one page.
    async fn list_vouchers(&self, request: VoucherPageRequest) -> Result<VoucherPage, Error>;
}

/// Fixture query returning an empty wallet.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureVoucherQuery;

#[async_trait]
impl VoucherQuery for FixtureVoucherQuery {
    async fn list_vouchers(&self, _request: VoucherPageRequest) -> Result<VoucherPage, Error> {
        Ok(Page::empty())
    }
}
