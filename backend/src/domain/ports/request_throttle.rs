//! Driving port for per-identity request budgets.

use async_trait::async_trait;

use crate::domain::{Error, RateLimitPolicy};

/// Admission control applied by inbound adapters before invoking a use case.
///
/// `check` and `record` are split so an idempotent replay can be vetted
/// without consuming budget; most callers use [`RequestThrottle::admit`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RequestThrottle: Send + Sync {
    /// Fail with `rate_limited` when `identity` has exhausted `policy`.
    async fn check(&self, policy: RateLimitPolicy, identity: &str) -> Result<(), Error>;

    /// Count one request against `policy`.
    async fn record(&self, policy: RateLimitPolicy, identity: &str) -> Result<(), Error>;

    /// Check then record.
    async fn admit(&self, policy: RateLimitPolicy, identity: &str) -> Result<(), Error> {
        self.check(policy, identity).await?;
        self.record(policy, identity).await
    }
}

/// Throttle that admits everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureRequestThrottle;

#[async_trait]
impl RequestThrottle for FixtureRequestThrottle {
    async fn check(&self, _policy: RateLimitPolicy, _identity: &str) -> Result<(), Error> {
        Ok(())
    }

    async fn record(&self, _policy: RateLimitPolicy, _identity: &str) -> Result<(), Error> {
        Ok(())
    }
}
