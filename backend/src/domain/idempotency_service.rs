//! Claim-first idempotent execution.
//!
//! A request first looks for a live record under its key. On a miss it
//! claims the key with an in-progress record, runs the operation, and stores
//! the response. A request that loses the claim race polls until the winner
//! completes. Failed operations release the claim; terminal business errors
//! are stored and replayed like successes.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use tracing::{debug, warn};

use crate::domain::ports::{IdempotencyStore, IdempotencyStoreError};
use crate::domain::{
    Error, IdempotencyConfig, IdempotencyLookupQuery, IdempotencyLookupResult, IdempotencyRecord,
    IdempotencyState, IdempotentReply, StoredResponse,
};

const DUPLICATE_RACE_MAX_RETRIES: usize = 20;
const DUPLICATE_RACE_RETRY_DELAY: Duration = Duration::from_millis(25);
const IN_PROGRESS_MESSAGE: &str = "a request with this idempotency key is still in progress";
const CONFLICT_MESSAGE: &str = "idempotency key already used with a different request";

pub(crate) fn map_idempotency_error(error: IdempotencyStoreError) -> Error {
    match error {
        IdempotencyStoreError::Connection { message } => {
            Error::internal(format!("idempotency store unavailable: {message}"))
        }
        IdempotencyStoreError::Query { message } => {
            Error::internal(format!("idempotency store error: {message}"))
        }
        IdempotencyStoreError::Serialization { message } => Error::internal(format!(
            "idempotency store serialization failed: {message}"
        )),
        IdempotencyStoreError::DuplicateKey { message } => {
            Error::internal(format!("unexpected idempotency key conflict: {message}"))
        }
    }
}

fn offset(now: DateTime<Utc>, by: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(by)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

enum Resolution {
    Replay(StoredResponse),
    Wait,
    Absent,
}

/// Runs operations at most once per idempotency key.
pub struct IdempotencyService<S> {
    store: Arc<S>,
    config: IdempotencyConfig,
    clock: Arc<dyn Clock>,
}

impl<S> Clone for IdempotencyService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config,
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S> IdempotencyService<S> {
    /// Create a service over `store`.
    pub fn new(store: Arc<S>, config: IdempotencyConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            config,
            clock,
        }
    }
}

impl<S> IdempotencyService<S>
where
    S: IdempotencyStore,
{
    /// Run `operation` once for `query.key`, or replay its stored response.
    ///
    /// Replayable operation errors (see [`crate::domain::ErrorCode::is_replayable`])
    /// are stored and returned as responses. Other errors release the claim
    /// and propagate.
    ///
    /// # Errors
    /// Returns `conflict` when the key belongs to a different request or the
    /// original request is still running, the operation's non-replayable
    /// errors, and `server_error` for store failures.
    pub async fn execute<F, Fut>(
        &self,
        query: IdempotencyLookupQuery,
        operation: F,
    ) -> Result<IdempotentReply, Error>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<StoredResponse, Error>> + Send,
    {
        match self.resolve(&query).await? {
            Resolution::Replay(response) => return Ok(IdempotentReply::replayed(response)),
            Resolution::Wait => return self.await_winner(&query).await,
            Resolution::Absent => {}
        }

        let lease =
            TimeDelta::from_std(self.config.claim_lease()).unwrap_or(TimeDelta::seconds(60));
        let claim = IdempotencyRecord::claim(&query, self.clock.utc(), lease);
        match self.store.claim(&claim).await {
            Ok(()) => {}
            Err(IdempotencyStoreError::DuplicateKey { .. }) => {
                debug!(key = %query.key, "lost idempotency claim race");
                return self.await_winner(&query).await;
            }
            Err(err) => return Err(map_idempotency_error(err)),
        }

        let response = match operation().await {
            Ok(response) => response,
            Err(err) if err.code().is_replayable() => StoredResponse::from_error(&err)?,
            Err(err) => {
                if let Err(release_err) = self.store.release(&query.key).await {
                    warn!(
                        key = %query.key,
                        error.kind = release_err.kind(),
                        error = %release_err,
                        "failed to release idempotency claim"
                    );
                }
                return Err(err);
            }
        };

        let expires_at = offset(self.clock.utc(), self.config.ttl());
        self.store
            .complete(&query.key, &response, expires_at)
            .await
            .map_err(map_idempotency_error)?;
        Ok(IdempotentReply::fresh(response))
    }

    async fn resolve(&self, query: &IdempotencyLookupQuery) -> Result<Resolution, Error> {
        let record = self
            .store
            .find(&query.key, self.clock.utc())
            .await
            .map_err(map_idempotency_error)?;
        match IdempotencyLookupResult::classify(record, query) {
            IdempotencyLookupResult::NotFound => Ok(Resolution::Absent),
            IdempotencyLookupResult::ConflictingPayload(_) => {
                Err(Error::conflict(CONFLICT_MESSAGE))
            }
            IdempotencyLookupResult::MatchingPayload(record) => match record.state {
                IdempotencyState::Completed(response) => Ok(Resolution::Replay(response)),
                IdempotencyState::InProgress => Ok(Resolution::Wait),
            },
        }
    }

    async fn await_winner(&self, query: &IdempotencyLookupQuery) -> Result<IdempotentReply, Error> {
        for _ in 0..DUPLICATE_RACE_MAX_RETRIES {
            tokio::time::sleep(DUPLICATE_RACE_RETRY_DELAY).await;
            match self.resolve(query).await? {
                Resolution::Replay(response) => return Ok(IdempotentReply::replayed(response)),
                Resolution::Wait | Resolution::Absent => {}
            }
        }
        Err(Error::conflict(IN_PROGRESS_MESSAGE))
    }

    /// Delete records that expired before now.
    ///
    /// # Errors
    /// Returns `server_error` when the store fails.
    pub async fn purge_expired(&self) -> Result<u64, Error> {
        self.store
            .purge_expired(self.clock.utc())
            .await
            .map_err(map_idempotency_error)
    }
}

#[cfg(test)]
#[path = "idempotency_service_tests.rs"]
mod tests;
