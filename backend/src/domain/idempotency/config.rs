//! Environment-driven configuration for idempotency records.

use std::time::Duration;

/// Environment variable overriding the record TTL in hours.
pub const IDEMPOTENCY_TTL_HOURS_ENV: &str = "VOUCHER_IDEMPOTENCY_TTL_HOURS";

/// Environment lookups, injectable so tests avoid touching process state.
pub trait IdempotencyEnv {
    /// Fetch a string value by name.
    fn string(&self, name: &str) -> Option<String>;
}

/// Reads the real process environment.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultIdempotencyEnv;

impl IdempotencyEnv for DefaultIdempotencyEnv {
    fn string(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Record TTL and claim lease.
///
/// Completed records are replayed for `ttl` (24 hours by default). A claim
/// that never completes blocks its key for `claim_lease` only, after which a
/// retry may take it over.
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use voucher_backend::domain::idempotency::IdempotencyConfig;
///
/// let config = IdempotencyConfig::default();
/// assert_eq!(config.ttl(), Duration::from_secs(24 * 3600));
/// assert_eq!(config.claim_lease(), Duration::from_secs(60));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdempotencyConfig {
    ttl: Duration,
    claim_lease: Duration,
}

impl IdempotencyConfig {
    const DEFAULT_TTL_HOURS: u64 = 24;
    const MIN_TTL_HOURS: u64 = 1;
    const MAX_TTL_HOURS: u64 = 24 * 30;
    const DEFAULT_CLAIM_LEASE: Duration = Duration::from_secs(60);

    /// Load from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with(&DefaultIdempotencyEnv)
    }

    /// Load from a custom environment source.
    ///
    /// Unparseable values fall back to the default; others are clamped to
    /// 1..=720 hours.
    #[must_use]
    pub fn from_env_with(env: &impl IdempotencyEnv) -> Self {
        let hours = env
            .string(IDEMPOTENCY_TTL_HOURS_ENV)
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .unwrap_or(Self::DEFAULT_TTL_HOURS)
            .clamp(Self::MIN_TTL_HOURS, Self::MAX_TTL_HOURS);
        Self::with_ttl(Duration::from_secs(hours.saturating_mul(3600)))
    }

    /// Use an explicit TTL with the default claim lease.
    #[must_use]
    pub const fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            claim_lease: Self::DEFAULT_CLAIM_LEASE,
        }
    }

    /// Override the claim lease.
    #[must_use]
    pub const fn with_claim_lease(mut self, claim_lease: Duration) -> Self {
        self.claim_lease = claim_lease;
        self
    }

    /// How long completed responses are replayed.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// How long an unfinished claim blocks its key.
    #[must_use]
    pub const fn claim_lease(&self) -> Duration {
        self.claim_lease
    }
}

impl Default for IdempotencyConfig {
    fn default() -> Self {
        Self::with_ttl(Duration::from_secs(Self::DEFAULT_TTL_HOURS * 3600))
    }
}
