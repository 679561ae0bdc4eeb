//! Idempotency primitives for safe retries of mutating requests.
//!
//! - [`IdempotencyKey`]: client UUID from the `Idempotency-Key` header.
//! - [`PayloadHash`]: SHA-256 over canonical JSON, used to spot a key reused
//!   with a different request.
//! - [`IdempotencyScope`]: which operation a key protects.
//! - [`IdempotencyRecord`]: the claim or completed snapshot stored per key.
//! - [`StoredResponse`]: status and body replayed verbatim on a hit.
//! - [`IdempotencyConfig`]: record TTL and claim lease.
//!
//! A record is first written as [`IdempotencyState::InProgress`] (the
//! claim), then completed with the response once the business transaction
//! has committed. Failed operations release the claim instead.

mod config;
mod key;
mod payload;
mod record;
mod scope;

pub use config::{
    DefaultIdempotencyEnv, IDEMPOTENCY_TTL_HOURS_ENV, IdempotencyConfig, IdempotencyEnv,
};
pub use key::{IdempotencyKey, IdempotencyKeyValidationError};
pub use payload::{PayloadHash, PayloadHashError, canonicalize_and_hash, hash_payload};
pub use record::{
    IdempotencyLookupQuery, IdempotencyLookupResult, IdempotencyRecord, IdempotencyState,
    IdempotentReply, StoredResponse,
};
pub use scope::{IdempotencyScope, ParseIdempotencyScopeError};
