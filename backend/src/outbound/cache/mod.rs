//! Redis-backed adapters.
//!
//! Connections are pooled with `bb8-redis`. Keys are namespaced so the
//! instance can be shared with other services.

mod redis_rate_limit_store;

pub use redis_rate_limit_store::{RedisPoolError, RedisRateLimitStore};
