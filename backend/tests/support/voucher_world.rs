//! Shared world for the voucher behaviour suites.
//!
//! Services run over the in-memory adapters with a clock that only moves
//! when a step says so. A current-thread runtime drives the async calls from
//! the synchronous step functions.

use std::cell::RefCell;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use mockable::Clock;
use tokio::runtime::Runtime;
use uuid::Uuid;

use voucher_backend::domain::{
    Error, FixedWindowRateLimiter, IdempotencyConfig, IdempotencyService, LedgerService,
    MaintenanceService, OfferAcceptanceService, OfferId, QrRedemptionConfig, QrRedemptionService,
    UserId, WalletSummaryService,
};
use voucher_backend::outbound::memory::{InMemoryIdempotencyStore, InMemoryRateLimitStore};
use voucher_backend::test_support::{InMemoryVoucherStore, MutableClock, OfferSeed};

pub(crate) type Offers = OfferAcceptanceService<InMemoryVoucherStore, InMemoryIdempotencyStore>;
pub(crate) type Qr = QrRedemptionService<InMemoryVoucherStore, InMemoryVoucherStore>;
pub(crate) type Ledger = LedgerService<InMemoryVoucherStore>;
pub(crate) type Wallet = WalletSummaryService<InMemoryVoucherStore, InMemoryVoucherStore>;
pub(crate) type Limiter = FixedWindowRateLimiter<InMemoryRateLimitStore>;
pub(crate) type Maintenance =
    MaintenanceService<InMemoryIdempotencyStore, InMemoryRateLimitStore, InMemoryVoucherStore>;

/// Start of every scenario.
pub(crate) fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 4, 2, 8, 0, 0)
        .single()
        .expect("valid epoch")
}

pub(crate) struct VoucherWorld {
    runtime: Runtime,
    pub(crate) clock: Arc<MutableClock>,
    pub(crate) store: Arc<InMemoryVoucherStore>,
    pub(crate) offers: Offers,
    pub(crate) qr: Qr,
    pub(crate) ledger: Ledger,
    pub(crate) wallet: Wallet,
    pub(crate) limiter: Limiter,
    pub(crate) maintenance: Maintenance,
    pub(crate) user: UserId,
    pub(crate) offer: OfferId,
    pub(crate) last_error: RefCell<Option<Error>>,
}

impl VoucherWorld {
    pub(crate) fn new() -> Self {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("tokio runtime");
        let clock = Arc::new(MutableClock::new(epoch()));
        let dyn_clock: Arc<dyn Clock> = clock.clone();
        let store = Arc::new(InMemoryVoucherStore::default());
        let idempotency = IdempotencyService::new(
            Arc::new(InMemoryIdempotencyStore::default()),
            IdempotencyConfig::default(),
            dyn_clock.clone(),
        );
        let limiter = FixedWindowRateLimiter::new(
            Arc::new(InMemoryRateLimitStore::default()),
            dyn_clock.clone(),
        );

        Self {
            runtime,
            offers: OfferAcceptanceService::new(
                store.clone(),
                idempotency.clone(),
                dyn_clock.clone(),
            ),
            qr: QrRedemptionService::new(
                store.clone(),
                store.clone(),
                QrRedemptionConfig::default(),
                dyn_clock.clone(),
            ),
            ledger: LedgerService::new(store.clone(), dyn_clock.clone()),
            wallet: WalletSummaryService::new(store.clone(), store.clone(), dyn_clock.clone()),
            maintenance: MaintenanceService::new(
                idempotency,
                limiter.clone(),
                store.clone(),
                dyn_clock,
            ),
            limiter,
            clock,
            store,
            user: UserId::from_uuid(Uuid::from_u128(0x11)),
            offer: OfferId::from_uuid(Uuid::from_u128(0x22)),
            last_error: RefCell::new(None),
        }
    }

    /// Drive `future` to completion on the world's runtime.
    pub(crate) fn block_on<F: std::future::Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Seed the default offer, ending `hours` from now, and deliver it.
    pub(crate) fn deliver_offer(&self, hours: i64, reward_points: i64) {
        self.store.seed_offer(OfferSeed {
            id: self.offer,
            title: "Free coffee",
            end_at: self.clock.utc() + TimeDelta::hours(hours),
            reward_points,
        });
        self.store.deliver(self.user, self.offer);
    }

    pub(crate) fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }

    pub(crate) fn record_error(&self, error: Error) {
        *self.last_error.borrow_mut() = Some(error);
    }

    pub(crate) fn clear_error(&self) {
        *self.last_error.borrow_mut() = None;
    }

    /// Code of the last recorded error.
    pub(crate) fn last_error_code(&self) -> Option<&'static str> {
        self.last_error
            .borrow()
            .as_ref()
            .map(|error| error.code().as_str())
    }
}
