//! Builders wiring persistence adapters into services and HTTP state.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockable::{Clock, DefaultClock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use voucher_backend::domain::ports::RateLimitStore;
use voucher_backend::domain::{
    FixedWindowRateLimiter, IdempotencyConfig, IdempotencyService, LedgerService,
    MaintenanceService, OfferAcceptanceService, QrRedemptionConfig, QrRedemptionService,
    WalletSummaryService, WalletVoucherService,
};
use voucher_backend::inbound::http::health::ReadinessProbe;
use voucher_backend::inbound::http::state::HttpState;
use voucher_backend::outbound::cache::{RedisPoolError, RedisRateLimitStore};
use voucher_backend::outbound::memory::InMemoryRateLimitStore;
use voucher_backend::outbound::persistence::{
    DbPool, DieselIdempotencyStore, DieselLedgerRepository, DieselOfferRepository,
    DieselQrTokenRepository, DieselVoucherRepository, PostgisProximityOracle,
};

/// Inputs shared by every service.
pub struct RuntimeInputs {
    pub pool: DbPool,
    pub qr: QrRedemptionConfig,
    pub idempotency: IdempotencyConfig,
    pub maintenance_interval: Duration,
}

/// HTTP state plus the handle of the background maintenance loop.
pub struct Runtime {
    pub http_state: HttpState,
    pub maintenance: JoinHandle<()>,
}

/// Readiness probe pinging the database pool.
pub struct DatabaseProbe(pub DbPool);

#[async_trait]
impl ReadinessProbe for DatabaseProbe {
    async fn check(&self) -> Result<(), String> {
        self.0.ping().await.map_err(|err| err.to_string())
    }
}

/// Build the runtime with Redis counters when `redis_url` is set, otherwise
/// with process-local counters.
///
/// # Errors
/// Returns [`RedisPoolError`] when Redis is configured but unreachable.
pub async fn build_runtime(
    inputs: RuntimeInputs,
    redis_url: Option<&str>,
) -> Result<Runtime, RedisPoolError> {
    match redis_url {
        Some(url) => {
            let store = RedisRateLimitStore::connect(url).await?;
            info!("rate limit counters stored in redis");
            Ok(build_with_counters(inputs, Arc::new(store)))
        }
        None => {
            warn!("no redis configured; rate limits apply per instance");
            Ok(build_with_counters(
                inputs,
                Arc::new(InMemoryRateLimitStore::default()),
            ))
        }
    }
}

fn build_with_counters<R>(inputs: RuntimeInputs, counters: Arc<R>) -> Runtime
where
    R: RateLimitStore + 'static,
{
    let RuntimeInputs {
        pool,
        qr,
        idempotency,
        maintenance_interval,
    } = inputs;
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);

    let idempotency_service = IdempotencyService::new(
        Arc::new(DieselIdempotencyStore::new(pool.clone())),
        idempotency,
        clock.clone(),
    );
    let limiter = FixedWindowRateLimiter::new(counters, clock.clone());
    let ledger = Arc::new(DieselLedgerRepository::new(pool.clone()));
    let vouchers = Arc::new(DieselVoucherRepository::new(pool.clone()));

    let http_state = HttpState {
        offers: Arc::new(OfferAcceptanceService::new(
            Arc::new(DieselOfferRepository::new(pool.clone())),
            idempotency_service.clone(),
            clock.clone(),
        )),
        qr: Arc::new(QrRedemptionService::new(
            Arc::new(DieselQrTokenRepository::new(pool.clone())),
            Arc::new(PostgisProximityOracle::new(pool)),
            qr,
            clock.clone(),
        )),
        vouchers: Arc::new(WalletVoucherService::new(vouchers.clone())),
        ledger: Arc::new(LedgerService::new(ledger.clone(), clock.clone())),
        wallet: Arc::new(WalletSummaryService::new(
            ledger,
            vouchers.clone(),
            clock.clone(),
        )),
        throttle: Arc::new(limiter.clone()),
    };

    let maintenance = MaintenanceService::new(idempotency_service, limiter, vouchers, clock);
    Runtime {
        http_state,
        maintenance: spawn_maintenance(maintenance, maintenance_interval),
    }
}

fn spawn_maintenance<I, R, V>(
    service: MaintenanceService<I, R, V>,
    every: Duration,
) -> JoinHandle<()>
where
    I: voucher_backend::domain::ports::IdempotencyStore + 'static,
    R: RateLimitStore + 'static,
    V: voucher_backend::domain::ports::VoucherRepository + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            service.run_once().await;
        }
    })
}
