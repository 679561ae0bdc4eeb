//! Port for voucher aggregates and the expiry sweep.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pagination::PageLimit;

use crate::domain::{UserId, VoucherCard, VoucherId, VoucherStats, VoucherStatus};

use super::define_port_error;

define_port_error! {
    /// Errors raised by voucher repository adapters.
    pub enum VoucherRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "voucher repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "voucher repository query failed: {message}",
        /// The cursor does not name one of the user's vouchers.
        UnknownCursor { cursor: String } => "unknown voucher cursor: {cursor}",
    }
}

/// Port for voucher reads and bulk transitions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VoucherRepository: Send + Sync {
    /// Count the user's vouchers; active ones expiring before `horizon_end`
    /// also count as expiring.
    async fn stats(
        &self,
        user_id: &UserId,
        now: DateTime<Utc>,
        horizon_end: DateTime<Utc>,
    ) -> Result<VoucherStats, VoucherRepositoryError>;

    /// Move active vouchers past their expiry, and their active tokens, to
    /// `expired`. Returns the number of vouchers changed.
    async fn expire_overdue(&self, now: DateTime<Utc>) -> Result<u64, VoucherRepositoryError>;

    /// The user's vouchers in [`VoucherCard::list_key`] order, optionally
    /// restricted to one status, starting after `cursor`.
    ///
    /// Returns up to `limit.overfetch()` rows so callers can tell whether a
    /// further page exists.
    async fn list(
        &self,
        user_id: &UserId,
        status: Option<VoucherStatus>,
        cursor: Option<VoucherId>,
        limit: PageLimit,
    ) -> Result<Vec<VoucherCard>, VoucherRepositoryError>;
}

/// Fixture repository reporting an empty wallet.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureVoucherRepository;

#[async_trait]
impl VoucherRepository for FixtureVoucherRepository {
    async fn stats(
        &self,
        _user_id: &UserId,
        _now: DateTime<Utc>,
        _horizon_end: DateTime<Utc>,
    ) -> Result<VoucherStats, VoucherRepositoryError> {
        Ok(VoucherStats::default())
    }

    async fn expire_overdue(&self, _now: DateTime<Utc>) -> Result<u64, VoucherRepositoryError> {
        Ok(0)
    }

    async fn list(
        &self,
        _user_id: &UserId,
        _status: Option<VoucherStatus>,
        _cursor: Option<VoucherId>,
        _limit: PageLimit,
    ) -> Result<Vec<VoucherCard>, VoucherRepositoryError> {
        Ok(Vec::new())
    }
}
