//! PostgreSQL adapter for wallet voucher reads and the expiry sweep.
//!
//! The sweep locks the affected QR tokens before their vouchers, the order
//! redemption and issuance use.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_query;
use diesel::sql_types::{BigInt, Nullable, SmallInt, Text, Timestamptz, Uuid as SqlUuid};
use diesel_async::AsyncConnection as _;
use diesel_async::RunQueryDsl;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use pagination::PageLimit;
use tracing::info;
use uuid::Uuid;

use crate::domain::ports::{VoucherRepository, VoucherRepositoryError};
use crate::domain::{
    OfferId, QrTokenStatus, UserId, VoucherCard, VoucherId, VoucherListKey, VoucherStats,
    VoucherStatus,
};

use super::diesel_error_mapping::{map_diesel_error, map_pool_error};
use super::pool::DbPool;
use super::schema::{qr_tokens, vouchers};

/// Locks the tokens of overdue active vouchers, and only those rows, in
/// ascending id order.
pub(crate) const LOCK_OVERDUE_TOKENS_SQL: &str = r#"
SELECT t.id
FROM qr_tokens t
JOIN vouchers v ON v.id = t.voucher_id
WHERE v.status = 'active' AND v.expire_at < $1
ORDER BY t.id
FOR UPDATE OF t
"#;

/// Wallet cards after an optional keyset anchor. The `CASE` must agree with
/// `VoucherStatus::list_rank`.
pub(crate) const LIST_SQL: &str = r#"
SELECT v.id, v.offer_id, o.title, v.status, v.expire_at, v.used_at
FROM vouchers v
JOIN offers o ON o.id = v.offer_id
WHERE v.user_id = $1
  AND ($2::varchar IS NULL OR v.status = $2)
  AND (
    $3::smallint IS NULL
    OR (
      CASE v.status WHEN 'active' THEN 0 WHEN 'used' THEN 1 ELSE 2 END,
      v.expire_at,
      v.id
    ) > ($3, $4, $5)
  )
ORDER BY CASE v.status WHEN 'active' THEN 0 WHEN 'used' THEN 1 ELSE 2 END, v.expire_at, v.id
LIMIT $6
"#;

const STATS_SQL: &str = r#"
SELECT
    COUNT(*) FILTER (WHERE status = 'active' AND expire_at >= $2) AS active,
    COUNT(*) FILTER (WHERE status = 'active' AND expire_at >= $2 AND expire_at <= $3) AS expiring,
    COUNT(*) FILTER (WHERE status = 'used') AS used,
    MIN(expire_at) FILTER (WHERE status = 'active' AND expire_at >= $2) AS nearest_expire_at
FROM vouchers
WHERE user_id = $1
"#;

#[derive(Debug, QueryableByName)]
struct VoucherStatsRow {
    #[diesel(sql_type = BigInt)]
    active: i64,
    #[diesel(sql_type = BigInt)]
    expiring: i64,
    #[diesel(sql_type = BigInt)]
    used: i64,
    #[diesel(sql_type = Nullable<Timestamptz>)]
    nearest_expire_at: Option<DateTime<Utc>>,
}

impl From<VoucherStatsRow> for VoucherStats {
    fn from(row: VoucherStatsRow) -> Self {
        let count = |value: i64| u64::try_from(value).unwrap_or_default();
        Self {
            active: count(row.active),
            expiring: count(row.expiring),
            used: count(row.used),
            nearest_expire_at: row.nearest_expire_at,
        }
    }
}

#[derive(Debug, QueryableByName)]
struct VoucherCardRow {
    #[diesel(sql_type = SqlUuid)]
    id: Uuid,
    #[diesel(sql_type = SqlUuid)]
    offer_id: Uuid,
    #[diesel(sql_type = Text)]
    title: String,
    #[diesel(sql_type = Text)]
    status: String,
    #[diesel(sql_type = Timestamptz)]
    expire_at: DateTime<Utc>,
    #[diesel(sql_type = Nullable<Timestamptz>)]
    used_at: Option<DateTime<Utc>>,
}

impl TryFrom<VoucherCardRow> for VoucherCard {
    type Error = VoucherRepositoryError;

    fn try_from(row: VoucherCardRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<VoucherStatus>()
            .map_err(|err| VoucherRepositoryError::query(err.to_string()))?;
        Ok(Self {
            id: VoucherId::from_uuid(row.id),
            offer_id: OfferId::from_uuid(row.offer_id),
            title: row.title,
            status,
            expire_at: row.expire_at,
            used_at: row.used_at,
        })
    }
}

/// Diesel-backed implementation of the `VoucherRepository` port.
#[derive(Clone)]
pub struct DieselVoucherRepository {
    pool: DbPool,
}

impl DieselVoucherRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VoucherRepository for DieselVoucherRepository {
    async fn stats(
        &self,
        user_id: &UserId,
        now: DateTime<Utc>,
        horizon_end: DateTime<Utc>,
    ) -> Result<VoucherStats, VoucherRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error::<VoucherRepositoryError>)?;

        let row: VoucherStatsRow = sql_query(STATS_SQL)
            .bind::<SqlUuid, _>(*user_id.as_uuid())
            .bind::<Timestamptz, _>(now)
            .bind::<Timestamptz, _>(horizon_end)
            .get_result(&mut conn)
            .await
            .map_err(|err| map_diesel_error::<VoucherRepositoryError>(err, "voucher stats"))?;
        Ok(row.into())
    }

    async fn expire_overdue(&self, now: DateTime<Utc>) -> Result<u64, VoucherRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error::<VoucherRepositoryError>)?;

        let expired = conn
            .transaction::<_, diesel::result::Error, _>(|conn| {
                async move {
                    sql_query(LOCK_OVERDUE_TOKENS_SQL)
                        .bind::<Timestamptz, _>(now)
                        .execute(conn)
                        .await?;

                    let ids: Vec<Uuid> = diesel::update(vouchers::table)
                        .filter(vouchers::status.eq(VoucherStatus::Active.as_str()))
                        .filter(vouchers::expire_at.lt(now))
                        .set(vouchers::status.eq(VoucherStatus::Expired.as_str()))
                        .returning(vouchers::id)
                        .get_results(conn)
                        .await?;
                    if ids.is_empty() {
                        return Ok(0);
                    }

                    diesel::update(qr_tokens::table)
                        .filter(qr_tokens::voucher_id.eq_any(&ids))
                        .filter(qr_tokens::status.eq(QrTokenStatus::Active.as_str()))
                        .set(qr_tokens::status.eq(QrTokenStatus::Expired.as_str()))
                        .execute(conn)
                        .await?;
                    Ok(ids.len())
                }
                .scope_boxed()
            })
            .await
            .map_err(|err| {
                map_diesel_error::<VoucherRepositoryError>(err, "voucher expiry sweep")
            })?;

        if expired > 0 {
            info!(expired, "expired overdue vouchers");
        }
        Ok(u64::try_from(expired).unwrap_or_default())
    }

    async fn list(
        &self,
        user_id: &UserId,
        status: Option<VoucherStatus>,
        cursor: Option<VoucherId>,
        limit: PageLimit,
    ) -> Result<Vec<VoucherCard>, VoucherRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error::<VoucherRepositoryError>)?;

        let anchor: Option<VoucherListKey> = match cursor {
            Some(cursor) => {
                let (raw_status, expire_at) = vouchers::table
                    .filter(vouchers::id.eq(cursor.as_uuid()))
                    .filter(vouchers::user_id.eq(user_id.as_uuid()))
                    .select((vouchers::status, vouchers::expire_at))
                    .first::<(String, DateTime<Utc>)>(&mut conn)
                    .await
                    .optional()
                    .map_err(|err| {
                        map_diesel_error::<VoucherRepositoryError>(err, "voucher cursor lookup")
                    })?
                    .ok_or_else(|| VoucherRepositoryError::unknown_cursor(cursor.to_string()))?;
                let anchor_status = raw_status
                    .parse::<VoucherStatus>()
                    .map_err(|err| VoucherRepositoryError::query(err.to_string()))?;
                Some((anchor_status.list_rank(), expire_at, cursor))
            }
            None => None,
        };

        let rows: Vec<VoucherCardRow> = sql_query(LIST_SQL)
            .bind::<SqlUuid, _>(*user_id.as_uuid())
            .bind::<Nullable<Text>, _>(status.map(VoucherStatus::as_str))
            .bind::<Nullable<SmallInt>, _>(anchor.map(|(rank, _, _)| rank))
            .bind::<Nullable<Timestamptz>, _>(anchor.map(|(_, expire_at, _)| expire_at))
            .bind::<Nullable<SqlUuid>, _>(anchor.map(|(_, _, id)| *id.as_uuid()))
            .bind::<BigInt, _>(limit.overfetch())
            .load(&mut conn)
            .await
            .map_err(|err| map_diesel_error::<VoucherRepositoryError>(err, "voucher list"))?;
        rows.into_iter().map(VoucherCard::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    #[rstest]
    fn stats_row_converts_counts() {
        let nearest = Utc
            .with_ymd_and_hms(2026, 3, 2, 0, 0, 0)
            .single()
            .expect("valid time");
        let stats = VoucherStats::from(VoucherStatsRow {
            active: 3,
            expiring: 1,
            used: 12,
            nearest_expire_at: Some(nearest),
        });
        assert_eq!(
            stats,
            VoucherStats {
                active: 3,
                expiring: 1,
                used: 12,
                nearest_expire_at: Some(nearest),
            }
        );
    }

    #[rstest]
    fn listing_rank_matches_the_domain_order() {
        let sql = LIST_SQL.split_whitespace().collect::<Vec<_>>().join(" ");
        for status in [VoucherStatus::Active, VoucherStatus::Used] {
            let arm = format!("WHEN '{}' THEN {}", status.as_str(), status.list_rank());
            assert!(sql.contains(&arm), "missing {arm}");
        }
        assert!(sql.contains(&format!("ELSE {}", VoucherStatus::Expired.list_rank())));
        assert!(sql.ends_with("v.expire_at, v.id LIMIT $6"));
    }

    #[rstest]
    fn card_rows_reject_unknown_status() {
        let row = VoucherCardRow {
            id: Uuid::from_u128(1),
            offer_id: Uuid::from_u128(2),
            title: "Free coffee".to_owned(),
            status: "redeemed".to_owned(),
            expire_at: Utc
                .with_ymd_and_hms(2026, 3, 2, 0, 0, 0)
                .single()
                .expect("valid time"),
            used_at: None,
        };
        let err = VoucherCard::try_from(row).expect_err("unknown status");
        assert_eq!(err.kind(), "Query");
    }
}
