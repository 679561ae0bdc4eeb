//! Wallet summary read model.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;

use crate::domain::ledger_service::map_ledger_error;
use crate::domain::ports::{
    LedgerRepository, VoucherRepository, VoucherRepositoryError, WalletSummaryQuery,
};
use crate::domain::{EXPIRING_HORIZON, Error, UserId, WalletSummary};

pub(crate) fn map_voucher_error(error: VoucherRepositoryError) -> Error {
    match error {
        VoucherRepositoryError::Connection { message } => {
            Error::internal(format!("voucher repository unavailable: {message}"))
        }
        VoucherRepositoryError::Query { message } => {
            Error::internal(format!("voucher repository error: {message}"))
        }
        VoucherRepositoryError::UnknownCursor { cursor } => Error::invalid_param("unknown cursor")
            .with_details(json!({ "field": "cursor", "value": cursor, "code": "unknown_cursor" })),
    }
}

/// Service implementing [`WalletSummaryQuery`].
#[derive(Clone)]
pub struct WalletSummaryService<L, V> {
    ledger: Arc<L>,
    vouchers: Arc<V>,
    clock: Arc<dyn Clock>,
}

impl<L, V> WalletSummaryService<L, V> {
    /// Create the service.
    pub fn new(ledger: Arc<L>, vouchers: Arc<V>, clock: Arc<dyn Clock>) -> Self {
        Self {
            ledger,
            vouchers,
            clock,
        }
    }
}

#[async_trait]
impl<L, V> WalletSummaryQuery for WalletSummaryService<L, V>
where
    L: LedgerRepository,
    V: VoucherRepository,
{
    async fn summary(&self, user_id: &UserId) -> Result<WalletSummary, Error> {
        let now = self.clock.utc();
        let points = self
            .ledger
            .latest_balance(user_id)
            .await
            .map_err(map_ledger_error)?;
        let stats = self
            .vouchers
            .stats(user_id, now, now + EXPIRING_HORIZON)
            .await
            .map_err(map_voucher_error)?;
        Ok(WalletSummary::compose(points, stats))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};
    use rstest::rstest;
    use uuid::Uuid;

    use super::*;
    use crate::domain::VoucherStats;
    use crate::domain::ports::{MockLedgerRepository, MockVoucherRepository};
    use crate::test_support::MutableClock;

    #[rstest]
    #[tokio::test]
    async fn summary_combines_balance_and_voucher_stats() {
        let now: DateTime<Utc> = Utc
            .with_ymd_and_hms(2026, 8, 1, 12, 0, 0)
            .single()
            .expect("valid time");
        let nearest = now + TimeDelta::hours(5);
        let mut ledger = MockLedgerRepository::new();
        ledger.expect_latest_balance().return_once(|_| Ok(120));
        let mut vouchers = MockVoucherRepository::new();
        vouchers
            .expect_stats()
            .withf(move |_, at, horizon| *at == now && *horizon == now + TimeDelta::hours(48))
            .return_once(move |_, _, _| {
                Ok(VoucherStats {
                    active: 4,
                    expiring: 1,
                    used: 12,
                    nearest_expire_at: Some(nearest),
                })
            });

        let summary = WalletSummaryService::new(
            Arc::new(ledger),
            Arc::new(vouchers),
            Arc::new(MutableClock::new(now)),
        )
        .summary(&UserId::from_uuid(Uuid::from_u128(1)))
        .await
        .expect("summary");

        assert_eq!(summary.points, 120);
        assert_eq!(summary.stamps.count, 12);
        assert_eq!(summary.stamps.next_reward_in, 8);
        assert_eq!(summary.vouchers.active, 4);
        assert_eq!(summary.vouchers.nearest_expire_at, Some(nearest));
    }
}
