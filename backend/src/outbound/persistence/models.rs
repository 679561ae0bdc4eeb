//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. Each read row knows how to decode itself
//! into a domain value; decoding fails with [`RowDecodeError`] when stored
//! text or numbers fall outside what the domain accepts.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::{
    IdempotencyKey, IdempotencyRecord, IdempotencyScope, IdempotencyState, LedgerEntry,
    LedgerEntryId, LedgerEntryType, OfferId, PayloadHash, QrToken, QrTokenId, QrTokenStatus,
    StoredResponse, TokenHash, UserId, Voucher, VoucherId, VoucherStatus,
};

use super::schema::{idempotency_records, ledger_entries, qr_tokens, vouchers};

/// A stored row could not be mapped onto a domain value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("corrupt {table} row: {message}")]
pub(crate) struct RowDecodeError {
    table: &'static str,
    message: String,
}

impl RowDecodeError {
    pub(crate) fn new(table: &'static str, message: impl ToString) -> Self {
        Self {
            table,
            message: message.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Voucher models
// ---------------------------------------------------------------------------

/// Row struct for reading from the vouchers table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = vouchers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct VoucherRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub offer_id: Uuid,
    pub status: String,
    pub expire_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
}

impl TryFrom<VoucherRow> for Voucher {
    type Error = RowDecodeError;

    fn try_from(row: VoucherRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<VoucherStatus>()
            .map_err(|err| RowDecodeError::new("vouchers", err))?;
        Ok(Self {
            id: VoucherId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            offer_id: OfferId::from_uuid(row.offer_id),
            status,
            expire_at: row.expire_at,
            used_at: row.used_at,
        })
    }
}

/// Insertable struct for issuing a voucher.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = vouchers)]
pub(crate) struct NewVoucherRow<'a> {
    pub id: Uuid,
    pub user_id: Uuid,
    pub offer_id: Uuid,
    pub status: &'a str,
    pub expire_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// QR token models
// ---------------------------------------------------------------------------

/// Row struct for reading from the qr_tokens table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = qr_tokens)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct QrTokenRow {
    pub id: Uuid,
    pub voucher_id: Uuid,
    pub code_hash: String,
    pub ttl_sec: i32,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<QrTokenRow> for QrToken {
    type Error = RowDecodeError;

    fn try_from(row: QrTokenRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<QrTokenStatus>()
            .map_err(|err| RowDecodeError::new("qr_tokens", err))?;
        let ttl_sec =
            u32::try_from(row.ttl_sec).map_err(|err| RowDecodeError::new("qr_tokens", err))?;
        Ok(Self {
            id: QrTokenId::from_uuid(row.id),
            voucher_id: VoucherId::from_uuid(row.voucher_id),
            code_hash: TokenHash::from_stored(row.code_hash),
            ttl_sec,
            status,
            created_at: row.created_at,
        })
    }
}

/// Insertable struct for storing a freshly issued token.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = qr_tokens)]
pub(crate) struct NewQrTokenRow<'a> {
    pub id: Uuid,
    pub voucher_id: Uuid,
    pub code_hash: &'a str,
    pub ttl_sec: i32,
    pub status: &'a str,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Ledger models
// ---------------------------------------------------------------------------

/// Row struct for reading from the ledger_entries table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = ledger_entries)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct LedgerEntryRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub entry_type: String,
    pub amount: i64,
    pub balance_after: i64,
    pub ref_id: Option<Uuid>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<LedgerEntryRow> for LedgerEntry {
    type Error = RowDecodeError;

    fn try_from(row: LedgerEntryRow) -> Result<Self, Self::Error> {
        let entry_type = row
            .entry_type
            .parse::<LedgerEntryType>()
            .map_err(|err| RowDecodeError::new("ledger_entries", err))?;
        Ok(Self {
            id: LedgerEntryId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            entry_type,
            amount: row.amount,
            balance_after: row.balance_after,
            created_at: row.created_at,
            ref_id: row.ref_id,
            description: row.description,
        })
    }
}

/// Insertable struct for appending a ledger row.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = ledger_entries)]
pub(crate) struct NewLedgerEntryRow<'a> {
    pub id: Uuid,
    pub user_id: Uuid,
    pub entry_type: &'a str,
    pub amount: i64,
    pub balance_after: i64,
    pub ref_id: Option<Uuid>,
    pub description: Option<&'a str>,
    pub created_at: DateTime<Utc>,
}

impl<'a> From<&'a LedgerEntry> for NewLedgerEntryRow<'a> {
    fn from(entry: &'a LedgerEntry) -> Self {
        Self {
            id: *entry.id.as_uuid(),
            user_id: *entry.user_id.as_uuid(),
            entry_type: entry.entry_type.as_str(),
            amount: entry.amount,
            balance_after: entry.balance_after,
            ref_id: entry.ref_id,
            description: entry.description.as_deref(),
            created_at: entry.created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Idempotency models
// ---------------------------------------------------------------------------

/// Row struct for reading from the idempotency_records table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = idempotency_records)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct IdempotencyRecordRow {
    pub key: Uuid,
    pub user_id: Uuid,
    pub scope: String,
    pub payload_hash: Vec<u8>,
    pub response_status: Option<i32>,
    pub response_body: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl TryFrom<IdempotencyRecordRow> for IdempotencyRecord {
    type Error = RowDecodeError;

    fn try_from(row: IdempotencyRecordRow) -> Result<Self, Self::Error> {
        const TABLE: &str = "idempotency_records";
        let scope = row
            .scope
            .parse::<IdempotencyScope>()
            .map_err(|err| RowDecodeError::new(TABLE, err))?;
        let payload_hash = PayloadHash::try_from_bytes(&row.payload_hash)
            .map_err(|err| RowDecodeError::new(TABLE, err))?;
        let state = match (row.response_status, row.response_body) {
            (Some(status), Some(body)) => {
                let status =
                    u16::try_from(status).map_err(|err| RowDecodeError::new(TABLE, err))?;
                IdempotencyState::Completed(StoredResponse::new(status, body))
            }
            (None, None) => IdempotencyState::InProgress,
            _ => {
                return Err(RowDecodeError::new(
                    TABLE,
                    "response status and body must be set together",
                ));
            }
        };
        Ok(Self {
            key: IdempotencyKey::from_uuid(row.key),
            scope,
            user_id: UserId::from_uuid(row.user_id),
            payload_hash,
            state,
            created_at: row.created_at,
            expires_at: row.expires_at,
        })
    }
}

/// Insertable struct for an in-progress claim.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = idempotency_records)]
pub(crate) struct NewIdempotencyClaimRow<'a> {
    pub key: Uuid,
    pub user_id: Uuid,
    pub scope: &'a str,
    pub payload_hash: &'a [u8],
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl<'a> From<&'a IdempotencyRecord> for NewIdempotencyClaimRow<'a> {
    fn from(record: &'a IdempotencyRecord) -> Self {
        Self {
            key: *record.key.as_uuid(),
            user_id: *record.user_id.as_uuid(),
            scope: record.scope.as_str(),
            payload_hash: record.payload_hash.as_bytes(),
            created_at: record.created_at,
            expires_at: record.expires_at,
        }
    }
}
