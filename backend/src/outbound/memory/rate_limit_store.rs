//! In-memory fixed-window counters.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::ports::{RateLimitStore, RateLimitStoreError};
use crate::domain::{RateLimitCounter, RateLimitKey};

/// Counters held in a process-local map.
///
/// Suitable for a single instance; multiple replicas each enforce their own
/// budget.
#[derive(Debug, Default)]
pub struct InMemoryRateLimitStore {
    counters: Mutex<HashMap<RateLimitKey, RateLimitCounter>>,
}

impl InMemoryRateLimitStore {
    fn counters(&self) -> MutexGuard<'_, HashMap<RateLimitKey, RateLimitCounter>> {
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl RateLimitStore for InMemoryRateLimitStore {
    async fn load(
        &self,
        key: &RateLimitKey,
        now: DateTime<Utc>,
    ) -> Result<Option<RateLimitCounter>, RateLimitStoreError> {
        Ok(self
            .counters()
            .get(key)
            .copied()
            .filter(|counter| !counter.is_expired(now)))
    }

    async fn increment(
        &self,
        key: &RateLimitKey,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<RateLimitCounter, RateLimitStoreError> {
        let mut counters = self.counters();
        let next = RateLimitCounter::recorded(counters.get(key).copied(), now, window);
        counters.insert(key.clone(), next);
        Ok(next)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RateLimitStoreError> {
        let mut counters = self.counters();
        let before = counters.len();
        counters.retain(|_, counter| !counter.is_expired(now));
        Ok(u64::try_from(before - counters.len()).unwrap_or(u64::MAX))
    }
}
