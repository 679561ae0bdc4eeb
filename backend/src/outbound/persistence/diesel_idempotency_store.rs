//! PostgreSQL-backed `IdempotencyStore` implementation using Diesel ORM.
//!
//! The primary key on `idempotency_records.key` is the claim lock: of two
//! concurrent inserts only one commits, the other sees a unique violation
//! and reports [`IdempotencyStoreError::DuplicateKey`]. A record whose
//! `expires_at` has passed is deleted in the same transaction before the
//! insert so an abandoned claim can be taken over.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::AsyncConnection as _;
use diesel_async::RunQueryDsl;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use tracing::debug;

use crate::domain::ports::{IdempotencyStore, IdempotencyStoreError};
use crate::domain::{IdempotencyKey, IdempotencyRecord, StoredResponse};

use super::diesel_error_mapping::{is_unique_violation, map_diesel_error, map_pool_error};
use super::models::{IdempotencyRecordRow, NewIdempotencyClaimRow};
use super::pool::DbPool;
use super::schema::idempotency_records;

const PRIMARY_KEY_CONSTRAINT: &str = "idempotency_records_pkey";

/// Diesel-backed implementation of the `IdempotencyStore` port.
#[derive(Clone)]
pub struct DieselIdempotencyStore {
    pool: DbPool,
}

impl DieselIdempotencyStore {
    /// Create a new store with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_claim_error(error: diesel::result::Error, key: &IdempotencyKey) -> IdempotencyStoreError {
    if is_unique_violation(&error, PRIMARY_KEY_CONSTRAINT) {
        return IdempotencyStoreError::duplicate_key(key.to_string());
    }
    map_diesel_error(error, "idempotency claim")
}

fn response_status(response: &StoredResponse) -> i32 {
    i32::from(response.status())
}

#[async_trait]
impl IdempotencyStore for DieselIdempotencyStore {
    async fn find(
        &self,
        key: &IdempotencyKey,
        now: DateTime<Utc>,
    ) -> Result<Option<IdempotencyRecord>, IdempotencyStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error::<IdempotencyStoreError>)?;

        let row: Option<IdempotencyRecordRow> = idempotency_records::table
            .filter(idempotency_records::key.eq(key.as_uuid()))
            .filter(idempotency_records::expires_at.gt(now))
            .select(IdempotencyRecordRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(|err| map_diesel_error::<IdempotencyStoreError>(err, "idempotency lookup"))?;

        row.map(IdempotencyRecord::try_from)
            .transpose()
            .map_err(|err| IdempotencyStoreError::serialization(err.to_string()))
    }

    async fn claim(&self, record: &IdempotencyRecord) -> Result<(), IdempotencyStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error::<IdempotencyStoreError>)?;
        let new_row = NewIdempotencyClaimRow::from(record);
        let claimed_at = record.created_at;

        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            async move {
                let reclaimed = diesel::delete(idempotency_records::table)
                    .filter(idempotency_records::key.eq(new_row.key))
                    .filter(idempotency_records::expires_at.le(claimed_at))
                    .execute(conn)
                    .await?;
                if reclaimed > 0 {
                    debug!(key = %new_row.key, "replacing expired idempotency record");
                }

                diesel::insert_into(idempotency_records::table)
                    .values(&new_row)
                    .execute(conn)
                    .await
                    .map(|_| ())
            }
            .scope_boxed()
        })
        .await
        .map_err(|err| map_claim_error(err, &record.key))
    }

    async fn complete(
        &self,
        key: &IdempotencyKey,
        response: &StoredResponse,
        expires_at: DateTime<Utc>,
    ) -> Result<(), IdempotencyStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error::<IdempotencyStoreError>)?;

        let updated = diesel::update(idempotency_records::table)
            .filter(idempotency_records::key.eq(key.as_uuid()))
            .filter(idempotency_records::response_status.is_null())
            .set((
                idempotency_records::response_status.eq(response_status(response)),
                idempotency_records::response_body.eq(response.body()),
                idempotency_records::expires_at.eq(expires_at),
            ))
            .execute(&mut conn)
            .await
            .map_err(|err| map_diesel_error::<IdempotencyStoreError>(err, "idempotency complete"))?;

        if updated == 0 {
            return Err(IdempotencyStoreError::query(format!(
                "no in-progress claim for key {key}"
            )));
        }
        Ok(())
    }

    async fn release(&self, key: &IdempotencyKey) -> Result<(), IdempotencyStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error::<IdempotencyStoreError>)?;

        diesel::delete(idempotency_records::table)
            .filter(idempotency_records::key.eq(key.as_uuid()))
            .filter(idempotency_records::response_status.is_null())
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(|err| map_diesel_error(err, "idempotency release"))
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, IdempotencyStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error::<IdempotencyStoreError>)?;

        let deleted = diesel::delete(idempotency_records::table)
            .filter(idempotency_records::expires_at.le(now))
            .execute(&mut conn)
            .await
            .map_err(|err| map_diesel_error::<IdempotencyStoreError>(err, "idempotency purge"))?;

        debug!(deleted, cutoff = %now, "purged expired idempotency records");
        Ok(u64::try_from(deleted).unwrap_or_default())
    }
}
