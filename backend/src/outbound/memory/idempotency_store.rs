//! In-memory idempotency records.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::ports::{IdempotencyStore, IdempotencyStoreError};
use crate::domain::{IdempotencyKey, IdempotencyRecord, IdempotencyState, StoredResponse};

/// Records held in a process-local map keyed by idempotency key.
#[derive(Debug, Default)]
pub struct InMemoryIdempotencyStore {
    records: Mutex<HashMap<IdempotencyKey, IdempotencyRecord>>,
}

impl InMemoryIdempotencyStore {
    fn records(&self) -> MutexGuard<'_, HashMap<IdempotencyKey, IdempotencyRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl IdempotencyStore for InMemoryIdempotencyStore {
    async fn find(
        &self,
        key: &IdempotencyKey,
        now: DateTime<Utc>,
    ) -> Result<Option<IdempotencyRecord>, IdempotencyStoreError> {
        Ok(self
            .records()
            .get(key)
            .filter(|record| record.is_live(now))
            .cloned())
    }

    async fn claim(&self, record: &IdempotencyRecord) -> Result<(), IdempotencyStoreError> {
        let mut records = self.records();
        if records
            .get(&record.key)
            .is_some_and(|existing| existing.is_live(record.created_at))
        {
            return Err(IdempotencyStoreError::duplicate_key(record.key.to_string()));
        }
        records.insert(record.key, record.clone());
        Ok(())
    }

    async fn complete(
        &self,
        key: &IdempotencyKey,
        response: &StoredResponse,
        expires_at: DateTime<Utc>,
    ) -> Result<(), IdempotencyStoreError> {
        let mut records = self.records();
        let record = records
            .get_mut(key)
            .filter(|record| record.state == IdempotencyState::InProgress)
            .ok_or_else(|| {
                IdempotencyStoreError::query(format!("no in-progress claim for key {key}"))
            })?;
        record.state = IdempotencyState::Completed(response.clone());
        record.expires_at = expires_at;
        Ok(())
    }

    async fn release(&self, key: &IdempotencyKey) -> Result<(), IdempotencyStoreError> {
        let mut records = self.records();
        if records
            .get(key)
            .is_some_and(|record| record.state == IdempotencyState::InProgress)
        {
            records.remove(key);
        }
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, IdempotencyStoreError> {
        let mut records = self.records();
        let before = records.len();
        records.retain(|_, record| record.is_live(now));
        Ok(u64::try_from(before - records.len()).unwrap_or(u64::MAX))
    }
}
