//! PostgreSQL adapter for the append-only points ledger.
//!
//! Appends take `pg_advisory_xact_lock` on a hash of the user id before
//! reading the latest balance, so two appends for one user cannot both read
//! the same predecessor. The lock is released when the surrounding
//! transaction ends. [`append_locked`] is shared with the QR adapter, which
//! credits reward points inside its redemption transaction.
//!
//! Entries are ordered by `(created_at, seq)`. `seq` is a `BIGSERIAL`, and
//! `created_at` never runs behind the user's latest entry, so the newest row
//! under that order is always the predecessor of the next append even when
//! two instances' clocks disagree.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_query;
use diesel::sql_types::Text;
use diesel_async::AsyncConnection as _;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use pagination::PageLimit;
use tracing::debug;

use crate::domain::ports::{AppendOutcome, LedgerRepository, LedgerRepositoryError};
use crate::domain::{LedgerEntry, LedgerEntryDraft, LedgerEntryId, UserId};

use super::diesel_error_mapping::{TxError, map_diesel_error, map_pool_error, map_tx_error};
use super::models::{LedgerEntryRow, NewLedgerEntryRow};
use super::pool::DbPool;
use super::schema::ledger_entries;

const ADVISORY_LOCK_SQL: &str = "SELECT pg_advisory_xact_lock(hashtextextended($1, 0))";

/// Diesel-backed implementation of the `LedgerRepository` port.
#[derive(Clone)]
pub struct DieselLedgerRepository {
    pool: DbPool,
}

impl DieselLedgerRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

async fn latest_of(
    conn: &mut AsyncPgConnection,
    user_id: &UserId,
) -> Result<Option<(i64, DateTime<Utc>)>, diesel::result::Error> {
    ledger_entries::table
        .filter(ledger_entries::user_id.eq(user_id.as_uuid()))
        .order((ledger_entries::created_at.desc(), ledger_entries::seq.desc()))
        .select((ledger_entries::balance_after, ledger_entries::created_at))
        .first(conn)
        .await
        .optional()
}

/// Append `draft` on the caller's open transaction.
///
/// Must run inside a transaction; the advisory lock is transaction scoped.
pub(crate) async fn append_locked(
    conn: &mut AsyncPgConnection,
    draft: LedgerEntryDraft,
    id: LedgerEntryId,
    now: DateTime<Utc>,
) -> Result<AppendOutcome, TxError> {
    sql_query(ADVISORY_LOCK_SQL)
        .bind::<Text, _>(draft.user_id().to_string())
        .execute(conn)
        .await?;

    let (previous, created_at) = match latest_of(conn, draft.user_id()).await? {
        Some((balance, latest_at)) => (balance, now.max(latest_at)),
        None => (0, now),
    };
    let balance_after = match draft.apply(previous) {
        Ok(balance) => balance,
        Err(violation) => return Ok(AppendOutcome::Rejected(violation)),
    };

    let entry = draft.into_entry(id, balance_after, created_at);
    diesel::insert_into(ledger_entries::table)
        .values(NewLedgerEntryRow::from(&entry))
        .execute(conn)
        .await?;
    debug!(
        user_id = %entry.user_id,
        entry_type = %entry.entry_type,
        balance_after,
        "ledger entry appended"
    );
    Ok(AppendOutcome::Appended(entry))
}

#[async_trait]
impl LedgerRepository for DieselLedgerRepository {
    async fn append(
        &self,
        draft: &LedgerEntryDraft,
        id: LedgerEntryId,
        now: DateTime<Utc>,
    ) -> Result<AppendOutcome, LedgerRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error::<LedgerRepositoryError>)?;
        let draft = draft.clone();

        conn.transaction(|conn| append_locked(conn, draft, id, now).scope_boxed())
            .await
            .map_err(|err| map_tx_error(err, "ledger append"))
    }

    async fn latest_balance(&self, user_id: &UserId) -> Result<i64, LedgerRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error::<LedgerRepositoryError>)?;
        latest_of(&mut conn, user_id)
            .await
            .map(|latest| latest.map_or(0, |(balance, _)| balance))
            .map_err(|err| map_diesel_error(err, "ledger balance"))
    }

    async fn list(
        &self,
        user_id: &UserId,
        cursor: Option<LedgerEntryId>,
        limit: PageLimit,
    ) -> Result<Vec<LedgerEntry>, LedgerRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error::<LedgerRepositoryError>)?;

        let mut query = ledger_entries::table
            .filter(ledger_entries::user_id.eq(user_id.as_uuid()))
            .select(LedgerEntryRow::as_select())
            .order((ledger_entries::created_at.desc(), ledger_entries::seq.desc()))
            .limit(limit.overfetch())
            .into_boxed();

        if let Some(cursor) = cursor {
            // Cursors from another user are indistinguishable from unknown ids.
            let anchor: Option<(DateTime<Utc>, i64)> = ledger_entries::table
                .filter(ledger_entries::id.eq(cursor.as_uuid()))
                .filter(ledger_entries::user_id.eq(user_id.as_uuid()))
                .select((ledger_entries::created_at, ledger_entries::seq))
                .first(&mut conn)
                .await
                .optional()
                .map_err(|err| {
                    map_diesel_error::<LedgerRepositoryError>(err, "ledger cursor lookup")
                })?;
            let (anchor_at, anchor_seq) = anchor
                .ok_or_else(|| LedgerRepositoryError::unknown_cursor(cursor.to_string()))?;
            query = query.filter(
                ledger_entries::created_at.lt(anchor_at).or(ledger_entries::created_at
                    .eq(anchor_at)
                    .and(ledger_entries::seq.lt(anchor_seq))),
            );
        }

        let rows: Vec<LedgerEntryRow> = query
            .load(&mut conn)
            .await
            .map_err(|err| map_diesel_error::<LedgerRepositoryError>(err, "ledger page"))?;

        rows.into_iter()
            .map(|row| {
                LedgerEntry::try_from(row)
                    .map_err(|err| LedgerRepositoryError::query(err.to_string()))
            })
            .collect()
    }
}
