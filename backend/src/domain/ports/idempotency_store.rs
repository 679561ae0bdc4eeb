//! Port abstraction for idempotency record persistence.
//!
//! The [`IdempotencyStore`] holds claims and completed responses keyed by the
//! client's `Idempotency-Key`. Adapters must enforce key uniqueness so two
//! concurrent claims cannot both succeed, and must only surface records that
//! are still live.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{IdempotencyKey, IdempotencyRecord, StoredResponse};

use super::define_port_error;

define_port_error! {
    /// Errors raised by idempotency store adapters.
    pub enum IdempotencyStoreError {
        /// Store connection could not be established.
        Connection { message: String } => "idempotency store connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "idempotency store query failed: {message}",
        /// Response serialization or deserialization failed.
        Serialization { message: String } => "idempotency store serialization failed: {message}",
        /// A live record with this key already exists.
        DuplicateKey { message: String } => "idempotency key already exists: {message}",
    }
}

/// Port for idempotency claim and response storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    /// Fetch the live record for `key`, ignoring records expired at `now`.
    async fn find(
        &self,
        key: &IdempotencyKey,
        now: DateTime<Utc>,
    ) -> Result<Option<IdempotencyRecord>, IdempotencyStoreError>;

    /// Insert an in-progress claim.
    ///
    /// Fails with [`IdempotencyStoreError::DuplicateKey`] when a live record
    /// holds the key. An expired record is replaced.
    async fn claim(&self, record: &IdempotencyRecord) -> Result<(), IdempotencyStoreError>;

    /// Attach the final response to a claim and extend it to `expires_at`.
    ///
    /// Only an in-progress claim may be completed; a completed or missing
    /// record fails with [`IdempotencyStoreError::Query`].
    async fn complete(
        &self,
        key: &IdempotencyKey,
        response: &StoredResponse,
        expires_at: DateTime<Utc>,
    ) -> Result<(), IdempotencyStoreError>;

    /// Drop an in-progress claim so a retry can run the operation again.
    async fn release(&self, key: &IdempotencyKey) -> Result<(), IdempotencyStoreError>;

    /// Delete records expired at `now`, returning how many were removed.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, IdempotencyStoreError>;
}

/// Fixture store that never finds a record and accepts every write.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureIdempotencyStore;

#[async_trait]
impl IdempotencyStore for FixtureIdempotencyStore {
    async fn find(
        &self,
        _key: &IdempotencyKey,
        _now: DateTime<Utc>,
    ) -> Result<Option<IdempotencyRecord>, IdempotencyStoreError> {
        Ok(None)
    }

    async fn claim(&self, _record: &IdempotencyRecord) -> Result<(), IdempotencyStoreError> {
        Ok(())
    }

    async fn complete(
        &self,
        _key: &IdempotencyKey,
        _response: &StoredResponse,
        _expires_at: DateTime<Utc>,
    ) -> Result<(), IdempotencyStoreError> {
        Ok(())
    }

    async fn release(&self, _key: &IdempotencyKey) -> Result<(), IdempotencyStoreError> {
        Ok(())
    }

    async fn purge_expired(&self, _now: DateTime<Utc>) -> Result<u64, IdempotencyStoreError> {
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixture_store_finds_nothing() {
        let store = FixtureIdempotencyStore;
        let found = store
            .find(&IdempotencyKey::random(), Utc::now())
            .await
            .expect("fixture lookup should succeed");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn fixture_store_purges_nothing() {
        let purged = FixtureIdempotencyStore
            .purge_expired(Utc::now())
            .await
            .expect("fixture purge should succeed");
        assert_eq!(purged, 0);
    }
}
