//! Port for fixed-window request counters.
//!
//! Adapters must make [`RateLimitStore::increment`] atomic per key: the
//! window reset and the increment happen together so concurrent requests
//! never both open a fresh window.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{RateLimitCounter, RateLimitKey};

use super::define_port_error;

define_port_error! {
    /// Errors raised by rate limit counter adapters.
    pub enum RateLimitStoreError {
        /// Counter backend is unreachable.
        Backend { message: String } => "rate limit store unavailable: {message}",
        /// Stored counter state could not be interpreted.
        Corrupt { message: String } => "rate limit counter is corrupt: {message}",
    }
}

/// Port for per-key request counters.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Current counter for `key`, or `None` when no window is open.
    async fn load(
        &self,
        key: &RateLimitKey,
        now: DateTime<Utc>,
    ) -> Result<Option<RateLimitCounter>, RateLimitStoreError>;

    /// Record one request, opening a new `window` when the old one elapsed.
    async fn increment(
        &self,
        key: &RateLimitKey,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<RateLimitCounter, RateLimitStoreError>;

    /// Drop counters whose window ended before `now`.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RateLimitStoreError>;
}
