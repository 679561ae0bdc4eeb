//! Fixed-window request throttling over a shared counter store.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::warn;

use crate::domain::ports::{RateLimitStore, RateLimitStoreError, RequestThrottle};
use crate::domain::{Error, RateLimitDecision, RateLimitPolicy};

/// Throttle backed by a [`RateLimitStore`].
///
/// Store outages fail open: the request proceeds and a warning is logged.
/// Budgets protect capacity, whereas the economic guarantees live in the
/// transactional store.
pub struct FixedWindowRateLimiter<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S> Clone for FixedWindowRateLimiter<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S> FixedWindowRateLimiter<S> {
    /// Create a limiter over `store`.
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }
}

fn log_store_failure(policy: RateLimitPolicy, error: &RateLimitStoreError) {
    warn!(
        scope = policy.scope(),
        error.kind = error.kind(),
        error = %error,
        "rate limit store unavailable; admitting request"
    );
}

impl<S> FixedWindowRateLimiter<S>
where
    S: RateLimitStore,
{
    /// Drop counters whose window has ended.
    ///
    /// # Errors
    /// Returns `server_error` when the store fails.
    pub async fn purge_expired(&self) -> Result<u64, Error> {
        self.store
            .purge_expired(self.clock.utc())
            .await
            .map_err(|err| Error::internal(format!("rate limit purge failed: {err}")))
    }
}

#[async_trait]
impl<S> RequestThrottle for FixedWindowRateLimiter<S>
where
    S: RateLimitStore,
{
    async fn check(&self, policy: RateLimitPolicy, identity: &str) -> Result<(), Error> {
        let now = self.clock.utc();
        let key = policy.key_for(identity);
        let counter = match self.store.load(&key, now).await {
            Ok(counter) => counter,
            Err(err) => {
                log_store_failure(policy, &err);
                return Ok(());
            }
        };
        match RateLimitDecision::evaluate(counter.as_ref(), &policy, now) {
            RateLimitDecision::Allowed => Ok(()),
            RateLimitDecision::Limited { retry_after_secs } => Err(Error::rate_limited(
                format!(
                    "Too many requests. Limit: {}/{}s. Reset in {retry_after_secs}s",
                    policy.limit(),
                    policy.window().as_secs()
                ),
                retry_after_secs,
            )),
        }
    }

    async fn record(&self, policy: RateLimitPolicy, identity: &str) -> Result<(), Error> {
        let key = policy.key_for(identity);
        if let Err(err) = self
            .store
            .increment(&key, policy.window(), self.clock.utc())
            .await
        {
            log_store_failure(policy, &err);
        }
        Ok(())
    }
}
