//! Process-local adapters.
//!
//! Used when no shared backend is configured and as fast doubles in tests.
//! State lives behind a `std::sync::Mutex`; no lock is held across an await.

mod idempotency_store;
mod rate_limit_store;

pub use idempotency_store::InMemoryIdempotencyStore;
pub use rate_limit_store::InMemoryRateLimitStore;
