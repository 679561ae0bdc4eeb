//! PostgreSQL adapter for QR token issuance and redemption.
//!
//! Redemption locks the token row, then its voucher, and applies the plan
//! from [`plan_redemption`]. Issuance follows the same order: it locks the
//! voucher's existing tokens by ascending id before the voucher row, so a
//! scan racing a rotation waits instead of deadlocking.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_query;
use diesel::sql_types::Uuid as SqlUuid;
use diesel_async::AsyncConnection as _;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::ports::{
    AppendOutcome, QrTokenRepository, QrTokenRepositoryError, RedemptionAttempt,
    RedemptionTarget, TokenIssue, TokenIssueOutcome,
};
use crate::domain::{
    LedgerEntryDraft, LedgerEntryId, LedgerEntryType, OfferId, QrToken, QrTokenStatus,
    QrVerifyOutcome, RedemptionPlan, TokenHash, Voucher, VoucherId, VoucherStatus, plan_issue,
    plan_redemption,
};

use super::diesel_error_mapping::{TxError, map_diesel_error, map_pool_error, map_tx_error};
use super::diesel_ledger_repository::append_locked;
use super::models::{NewQrTokenRow, QrTokenRow, VoucherRow};
use super::pool::DbPool;
use super::schema::{offers, qr_tokens, vouchers};

/// Diesel-backed implementation of the `QrTokenRepository` port.
#[derive(Clone)]
pub struct DieselQrTokenRepository {
    pool: DbPool,
}

impl DieselQrTokenRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

async fn set_token_status(
    conn: &mut AsyncPgConnection,
    token_id: Uuid,
    status: QrTokenStatus,
) -> Result<(), diesel::result::Error> {
    diesel::update(qr_tokens::table.find(token_id))
        .set(qr_tokens::status.eq(status.as_str()))
        .execute(conn)
        .await
        .map(|_| ())
}

async fn expire_voucher(
    conn: &mut AsyncPgConnection,
    voucher_id: Uuid,
) -> Result<(), diesel::result::Error> {
    diesel::update(vouchers::table.find(voucher_id))
        .filter(vouchers::status.eq(VoucherStatus::Active.as_str()))
        .set(vouchers::status.eq(VoucherStatus::Expired.as_str()))
        .execute(conn)
        .await
        .map(|_| ())
}

async fn credit_reward(
    conn: &mut AsyncPgConnection,
    voucher: &Voucher,
    now: DateTime<Utc>,
) -> Result<(), TxError> {
    let reward_points: i64 = offers::table
        .find(voucher.offer_id.as_uuid())
        .select(offers::reward_points)
        .first(conn)
        .await?;
    if reward_points <= 0 {
        return Ok(());
    }

    let draft = LedgerEntryDraft::new(voucher.user_id, LedgerEntryType::Earn, reward_points)?
        .with_ref_id(*voucher.id.as_uuid())
        .with_description("voucher redeemed");
    match append_locked(conn, draft, LedgerEntryId::random(), now).await? {
        AppendOutcome::Appended(_) => Ok(()),
        AppendOutcome::Rejected(violation) => Err(violation.into()),
    }
}

async fn apply_plan(
    conn: &mut AsyncPgConnection,
    plan: RedemptionPlan,
    token: &QrToken,
    voucher: &Voucher,
) -> Result<(), TxError> {
    let token_id = *token.id.as_uuid();
    let voucher_id = *voucher.id.as_uuid();
    match plan {
        RedemptionPlan::Report(_) => {}
        RedemptionPlan::ExpireToken { expire_voucher: also_voucher, .. } => {
            set_token_status(conn, token_id, QrTokenStatus::Expired).await?;
            if also_voucher {
                expire_voucher(conn, voucher_id).await?;
            }
        }
        RedemptionPlan::ExpireVoucher { .. } => {
            expire_voucher(conn, voucher_id).await?;
            set_token_status(conn, token_id, QrTokenStatus::Expired).await?;
        }
        RedemptionPlan::Redeem { used_at, .. } => {
            let updated = diesel::update(vouchers::table.find(voucher_id))
                .filter(vouchers::status.eq(VoucherStatus::Active.as_str()))
                .set((
                    vouchers::status.eq(VoucherStatus::Used.as_str()),
                    vouchers::used_at.eq(used_at),
                ))
                .execute(conn)
                .await?;
            if updated != 1 {
                return Err(diesel::result::Error::NotFound.into());
            }
            set_token_status(conn, token_id, QrTokenStatus::Used).await?;
            credit_reward(conn, voucher, used_at).await?;
        }
    }
    Ok(())
}

async fn redeem_in_transaction(
    conn: &mut AsyncPgConnection,
    attempt: &RedemptionAttempt,
) -> Result<Option<QrVerifyOutcome>, TxError> {
    let token_row: Option<QrTokenRow> = qr_tokens::table
        .filter(qr_tokens::code_hash.eq(attempt.code_hash.as_str()))
        .select(QrTokenRow::as_select())
        .for_update()
        .first(conn)
        .await
        .optional()?;
    let Some(token_row) = token_row else {
        return Ok(None);
    };
    let token = QrToken::try_from(token_row)?;

    let voucher_row: VoucherRow = vouchers::table
        .find(token.voucher_id.as_uuid())
        .select(VoucherRow::as_select())
        .for_update()
        .first(conn)
        .await?;
    let voucher = Voucher::try_from(voucher_row)?;

    let plan = plan_redemption(&token, &voucher, attempt.within_range, attempt.now);
    apply_plan(conn, plan, &token, &voucher).await?;
    Ok(Some(plan.outcome()))
}

/// Locks every token of a voucher in ascending id order.
pub(crate) const LOCK_VOUCHER_TOKENS_SQL: &str =
    "SELECT id FROM qr_tokens WHERE voucher_id = $1 ORDER BY id FOR UPDATE";

async fn lock_voucher_tokens(
    conn: &mut AsyncPgConnection,
    voucher_id: Uuid,
) -> Result<usize, diesel::result::Error> {
    sql_query(LOCK_VOUCHER_TOKENS_SQL)
        .bind::<SqlUuid, _>(voucher_id)
        .execute(conn)
        .await
}

async fn issue_in_transaction(
    conn: &mut AsyncPgConnection,
    issue: &TokenIssue,
) -> Result<TokenIssueOutcome, TxError> {
    lock_voucher_tokens(conn, *issue.voucher_id.as_uuid()).await?;
    let voucher_row: Option<VoucherRow> = vouchers::table
        .filter(vouchers::id.eq(issue.voucher_id.as_uuid()))
        .filter(vouchers::user_id.eq(issue.user_id.as_uuid()))
        .select(VoucherRow::as_select())
        .for_update()
        .first(conn)
        .await
        .optional()?;
    let Some(voucher_row) = voucher_row else {
        return Ok(TokenIssueOutcome::VoucherNotFound);
    };
    let voucher = Voucher::try_from(voucher_row)?;
    if let Err(rejection) = plan_issue(&voucher, issue.now) {
        return Ok(TokenIssueOutcome::Rejected(rejection));
    }

    let rotated = diesel::update(qr_tokens::table)
        .filter(qr_tokens::voucher_id.eq(issue.voucher_id.as_uuid()))
        .filter(qr_tokens::status.eq(QrTokenStatus::Active.as_str()))
        .set(qr_tokens::status.eq(QrTokenStatus::Expired.as_str()))
        .execute(conn)
        .await?;
    if rotated > 0 {
        debug!(voucher_id = %issue.voucher_id, rotated, "expired previous qr tokens");
    }

    diesel::insert_into(qr_tokens::table)
        .values(NewQrTokenRow {
            id: *issue.token_id.as_uuid(),
            voucher_id: *issue.voucher_id.as_uuid(),
            code_hash: issue.code_hash.as_str(),
            ttl_sec: i32::try_from(issue.ttl_sec).unwrap_or(i32::MAX),
            status: QrTokenStatus::Active.as_str(),
            created_at: issue.now,
        })
        .execute(conn)
        .await?;

    Ok(TokenIssueOutcome::Issued(QrToken {
        id: issue.token_id,
        voucher_id: issue.voucher_id,
        code_hash: issue.code_hash.clone(),
        ttl_sec: issue.ttl_sec,
        status: QrTokenStatus::Active,
        created_at: issue.now,
    }))
}

#[async_trait]
impl QrTokenRepository for DieselQrTokenRepository {
    async fn find_target(
        &self,
        code_hash: &TokenHash,
    ) -> Result<Option<RedemptionTarget>, QrTokenRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error::<QrTokenRepositoryError>)?;

        let target: Option<(Uuid, Uuid)> = qr_tokens::table
            .inner_join(vouchers::table)
            .filter(qr_tokens::code_hash.eq(code_hash.as_str()))
            .select((vouchers::id, vouchers::offer_id))
            .first(&mut conn)
            .await
            .optional()
            .map_err(|err| map_diesel_error::<QrTokenRepositoryError>(err, "qr target lookup"))?;

        Ok(target.map(|(voucher_id, offer_id)| RedemptionTarget {
            voucher_id: VoucherId::from_uuid(voucher_id),
            offer_id: OfferId::from_uuid(offer_id),
        }))
    }

    async fn redeem(
        &self,
        attempt: &RedemptionAttempt,
    ) -> Result<Option<QrVerifyOutcome>, QrTokenRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error::<QrTokenRepositoryError>)?;

        conn.transaction(|conn| redeem_in_transaction(conn, attempt).scope_boxed())
            .await
            .map_err(|err| {
                warn!(error = %err, "qr redemption transaction rolled back");
                map_tx_error(err, "qr redemption")
            })
    }

    async fn issue(&self, issue: &TokenIssue) -> Result<TokenIssueOutcome, QrTokenRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error::<QrTokenRepositoryError>)?;

        conn.transaction(|conn| issue_in_transaction(conn, issue).scope_boxed())
            .await
            .map_err(|err| map_tx_error(err, "qr issue"))
    }
}
