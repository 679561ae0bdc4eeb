//! Periodic housekeeping: expired idempotency records, stale rate limit
//! counters, and overdue vouchers.

use std::sync::Arc;

use mockable::Clock;
use tracing::{info, warn};

use crate::domain::ports::{IdempotencyStore, RateLimitStore, VoucherRepository};
use crate::domain::wallet_summary_service::map_voucher_error;
use crate::domain::{Error, FixedWindowRateLimiter, IdempotencyService};

/// Rows touched by one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    /// Idempotency records deleted.
    pub idempotency_purged: u64,
    /// Rate limit counters deleted.
    pub counters_purged: u64,
    /// Vouchers moved to `expired`.
    pub vouchers_expired: u64,
}

/// Runs every housekeeping task once per call.
#[derive(Clone)]
pub struct MaintenanceService<I, R, V> {
    idempotency: IdempotencyService<I>,
    limiter: FixedWindowRateLimiter<R>,
    vouchers: Arc<V>,
    clock: Arc<dyn Clock>,
}

fn settle(task: &'static str, result: Result<u64, Error>) -> u64 {
    result.unwrap_or_else(|err| {
        warn!(task, error = %err, "maintenance task failed");
        0
    })
}

impl<I, R, V> MaintenanceService<I, R, V>
where
    I: IdempotencyStore,
    R: RateLimitStore,
    V: VoucherRepository,
{
    /// Create the service.
    pub fn new(
        idempotency: IdempotencyService<I>,
        limiter: FixedWindowRateLimiter<R>,
        vouchers: Arc<V>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            idempotency,
            limiter,
            vouchers,
            clock,
        }
    }

    /// Run each task; a failing task is logged and does not stop the others.
    pub async fn run_once(&self) -> MaintenanceReport {
        let report = MaintenanceReport {
            idempotency_purged: settle("idempotency", self.idempotency.purge_expired().await),
            counters_purged: settle("rate_limit", self.limiter.purge_expired().await),
            vouchers_expired: settle(
                "voucher_expiry",
                self.vouchers
                    .expire_overdue(self.clock.utc())
                    .await
                    .map_err(map_voucher_error),
            ),
        };
        info!(
            idempotency_purged = report.idempotency_purged,
            counters_purged = report.counters_purged,
            vouchers_expired = report.vouchers_expired,
            "maintenance sweep finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rstest::rstest;

    use super::*;
    use crate::domain::IdempotencyConfig;
    use crate::domain::ports::{
        MockIdempotencyStore, MockRateLimitStore, MockVoucherRepository, VoucherRepositoryError,
    };
    use crate::test_support::MutableClock;

    #[rstest]
    #[tokio::test]
    async fn failing_task_does_not_stop_the_sweep() {
        let clock: Arc<dyn Clock> = Arc::new(MutableClock::new(
            Utc.with_ymd_and_hms(2026, 9, 1, 3, 0, 0)
                .single()
                .expect("valid time"),
        ));
        let mut idempotency = MockIdempotencyStore::new();
        idempotency.expect_purge_expired().return_once(|_| Ok(7));
        let mut counters = MockRateLimitStore::new();
        counters.expect_purge_expired().return_once(|_| Ok(2));
        let mut vouchers = MockVoucherRepository::new();
        vouchers
            .expect_expire_overdue()
            .return_once(|_| Err(VoucherRepositoryError::query("deadlock detected")));

        let service = MaintenanceService::new(
            IdempotencyService::new(
                Arc::new(idempotency),
                IdempotencyConfig::default(),
                clock.clone(),
            ),
            FixedWindowRateLimiter::new(Arc::new(counters), clock.clone()),
            Arc::new(vouchers),
            clock,
        );

        assert_eq!(
            service.run_once().await,
            MaintenanceReport {
                idempotency_purged: 7,
                counters_purged: 2,
                vouchers_expired: 0,
            }
        );
    }
}
