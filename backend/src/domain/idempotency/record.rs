//! Stored idempotency records, lookups, and replayable responses.

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use serde_json::Value;

use super::{IdempotencyKey, IdempotencyScope, PayloadHash};
use crate::domain::{Error, UserId};

/// Status and JSON body returned for a keyed request.
///
/// The body is kept as a [`Value`] so the first response and every replay
/// are rendered from the same bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredResponse {
    status: u16,
    body: Value,
}

impl StoredResponse {
    /// Wrap a status and body.
    #[must_use]
    pub const fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// Serialise a success payload.
    ///
    /// # Errors
    /// Returns [`Error::internal`] if the payload cannot be rendered.
    pub fn json<T: Serialize>(status: u16, payload: &T) -> Result<Self, Error> {
        let body = serde_json::to_value(payload)
            .map_err(|err| Error::internal(format!("failed to serialise response: {err}")))?;
        Ok(Self::new(status, body))
    }

    /// Snapshot a deterministic terminal error without its trace id.
    ///
    /// # Errors
    /// Returns [`Error::internal`] if the error cannot be rendered.
    pub fn from_error(error: &Error) -> Result<Self, Error> {
        let status = error.code().status_code();
        Self::json(status, &error.clone().without_trace_id())
    }

    /// Response status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Response body.
    #[must_use]
    pub const fn body(&self) -> &Value {
        &self.body
    }

    /// Whether the snapshot describes a successful outcome.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Lifecycle of a stored key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdempotencyState {
    /// Claimed by a request that has not finished yet.
    InProgress,
    /// Finished; the snapshot is replayed for later requests.
    Completed(StoredResponse),
}

/// Row linking a key to its owner, request fingerprint and outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdempotencyRecord {
    /// Key supplied by the client.
    pub key: IdempotencyKey,
    /// Operation the key protects.
    pub scope: IdempotencyScope,
    /// User who made the original request.
    pub user_id: UserId,
    /// Fingerprint of the original request.
    pub payload_hash: PayloadHash,
    /// Claim or completed snapshot.
    pub state: IdempotencyState,
    /// When the key was first claimed.
    pub created_at: DateTime<Utc>,
    /// After this instant the record is ignored and may be purged.
    pub expires_at: DateTime<Utc>,
}

impl IdempotencyRecord {
    /// Build an in-progress claim for `query` valid for `lease`.
    #[must_use]
    pub fn claim(query: &IdempotencyLookupQuery, now: DateTime<Utc>, lease: TimeDelta) -> Self {
        Self {
            key: query.key,
            scope: query.scope,
            user_id: query.user_id,
            payload_hash: query.payload_hash,
            state: IdempotencyState::InProgress,
            created_at: now,
            expires_at: now + lease,
        }
    }

    /// Whether the record still shadows new requests at `now`.
    #[must_use]
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Parameters identifying one keyed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdempotencyLookupQuery {
    /// Key supplied by the client.
    pub key: IdempotencyKey,
    /// Requesting user.
    pub user_id: UserId,
    /// Operation being performed.
    pub scope: IdempotencyScope,
    /// Fingerprint of the request.
    pub payload_hash: PayloadHash,
}

impl IdempotencyLookupQuery {
    /// Bundle lookup parameters.
    #[must_use]
    pub const fn new(
        key: IdempotencyKey,
        user_id: UserId,
        scope: IdempotencyScope,
        payload_hash: PayloadHash,
    ) -> Self {
        Self {
            key,
            user_id,
            scope,
            payload_hash,
        }
    }
}

/// Outcome of looking up a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdempotencyLookupResult {
    /// No live record exists.
    NotFound,
    /// A live record exists for the same user, scope and payload.
    MatchingPayload(IdempotencyRecord),
    /// A live record exists but was created by a different request.
    ConflictingPayload(IdempotencyRecord),
}

impl IdempotencyLookupResult {
    /// Compare a stored record against the incoming request.
    #[must_use]
    pub fn classify(record: Option<IdempotencyRecord>, query: &IdempotencyLookupQuery) -> Self {
        match record {
            None => Self::NotFound,
            Some(record)
                if record.user_id == query.user_id
                    && record.scope == query.scope
                    && record.payload_hash == query.payload_hash =>
            {
                Self::MatchingPayload(record)
            }
            Some(record) => Self::ConflictingPayload(record),
        }
    }
}

/// Response for a keyed request plus whether it came from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdempotentReply {
    /// Status and body to render.
    pub response: StoredResponse,
    /// `true` when the response was replayed from an earlier execution.
    pub replayed: bool,
}

impl IdempotentReply {
    /// A freshly executed response.
    #[must_use]
    pub const fn fresh(response: StoredResponse) -> Self {
        Self {
            response,
            replayed: false,
        }
    }

    /// A response replayed from the store.
    #[must_use]
    pub const fn replayed(response: StoredResponse) -> Self {
        Self {
            response,
            replayed: true,
        }
    }
}
