//! Fixed-window counters in Redis.
//!
//! Each counter is a plain integer key whose TTL is the remaining window.
//! Incrementing runs as one Lua script so the first request of a window sets
//! the expiry atomically with the increment; Redis then drops the key when
//! the window ends, so there is nothing to garbage-collect.

use std::time::Duration;

use async_trait::async_trait;
use bb8_redis::RedisConnectionManager;
use bb8_redis::bb8::{Pool, PooledConnection, RunError};
use bb8_redis::redis::{self, RedisError, Script};
use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

use crate::domain::ports::{RateLimitStore, RateLimitStoreError};
use crate::domain::{RateLimitCounter, RateLimitKey};

const KEY_PREFIX: &str = "voucher:ratelimit:";

const INCREMENT_SCRIPT: &str = r"
local count = redis.call('INCR', KEYS[1])
if count == 1 then
    redis.call('PEXPIRE', KEYS[1], ARGV[1])
end
local ttl = redis.call('PTTL', KEYS[1])
if ttl < 0 then
    redis.call('PEXPIRE', KEYS[1], ARGV[1])
    ttl = tonumber(ARGV[1])
end
return {count, ttl}
";

/// Errors raised while building the Redis pool.
#[derive(Debug, thiserror::Error)]
pub enum RedisPoolError {
    /// The URL was rejected by the client.
    #[error("invalid redis url: {0}")]
    Url(#[source] RedisError),
    /// The pool could not open its first connections.
    #[error("failed to build redis pool: {0}")]
    Build(#[source] RedisError),
}

/// [`RateLimitStore`] shared across replicas through Redis.
#[derive(Clone)]
pub struct RedisRateLimitStore {
    pool: Pool<RedisConnectionManager>,
    increment: Script,
}

impl RedisRateLimitStore {
    /// Connect to `url` with a small pool.
    ///
    /// # Errors
    /// Returns [`RedisPoolError`] for a malformed URL or an unreachable
    /// server.
    pub async fn connect(url: &str) -> Result<Self, RedisPoolError> {
        let manager = RedisConnectionManager::new(url).map_err(RedisPoolError::Url)?;
        let pool = Pool::builder()
            .max_size(8)
            .connection_timeout(Duration::from_secs(2))
            .build(manager)
            .await
            .map_err(RedisPoolError::Build)?;
        Ok(Self::from_pool(pool))
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: Pool<RedisConnectionManager>) -> Self {
        Self {
            pool,
            increment: Script::new(INCREMENT_SCRIPT),
        }
    }

    async fn connection(
        &self,
    ) -> Result<PooledConnection<'_, RedisConnectionManager>, RateLimitStoreError> {
        self.pool.get().await.map_err(|err| match err {
            RunError::User(err) => RateLimitStoreError::backend(err.to_string()),
            RunError::TimedOut => RateLimitStoreError::backend("timed out waiting for connection"),
        })
    }
}

fn storage_key(key: &RateLimitKey) -> String {
    format!("{KEY_PREFIX}{key}")
}

fn map_redis_error(error: RedisError) -> RateLimitStoreError {
    debug!(error = %error, "redis command failed");
    RateLimitStoreError::backend(error.to_string())
}

fn counter_from(
    count: i64,
    ttl_ms: i64,
    now: DateTime<Utc>,
) -> Result<RateLimitCounter, RateLimitStoreError> {
    let count = u32::try_from(count)
        .map_err(|_| RateLimitStoreError::corrupt(format!("counter out of range: {count}")))?;
    let reset_at = now
        .checked_add_signed(TimeDelta::milliseconds(ttl_ms))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    Ok(RateLimitCounter { count, reset_at })
}

#[async_trait]
impl RateLimitStore for RedisRateLimitStore {
    async fn load(
        &self,
        key: &RateLimitKey,
        now: DateTime<Utc>,
    ) -> Result<Option<RateLimitCounter>, RateLimitStoreError> {
        let mut conn = self.connection().await?;
        let storage_key = storage_key(key);
        let (count, ttl_ms): (Option<i64>, i64) = redis::pipe()
            .get(&storage_key)
            .pttl(&storage_key)
            .query_async(&mut *conn)
            .await
            .map_err(map_redis_error)?;
        match count {
            Some(count) if ttl_ms > 0 => counter_from(count, ttl_ms, now).map(Some),
            _ => Ok(None),
        }
    }

    async fn increment(
        &self,
        key: &RateLimitKey,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<RateLimitCounter, RateLimitStoreError> {
        let window_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX).max(1);
        let mut conn = self.connection().await?;
        let (count, ttl_ms): (i64, i64) = self
            .increment
            .key(storage_key(key))
            .arg(window_ms)
            .invoke_async(&mut *conn)
            .await
            .map_err(map_redis_error)?;
        counter_from(count, ttl_ms, now)
    }

    async fn purge_expired(&self, _now: DateTime<Utc>) -> Result<u64, RateLimitStoreError> {
        Ok(0)
    }
}
