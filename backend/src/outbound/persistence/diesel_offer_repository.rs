//! PostgreSQL adapter for the offer acceptance transaction.
//!
//! The inbox row is locked `FOR UPDATE` before [`plan_acceptance`] runs, so
//! concurrent accepts for one `(user, offer)` pair queue behind each other
//! and the later ones observe `accepted`. The unique constraint on
//! `vouchers (user_id, offer_id)` catches anything that slips past the lock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::AsyncConnection as _;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use tracing::warn;
use uuid::Uuid;

use crate::domain::ports::{
    AcceptanceAttempt, AcceptanceOutcome, OfferRepository, OfferRepositoryError,
};
use crate::domain::{
    AcceptancePlan, AcceptedOffer, InboxStatus, UserId, VoucherId, VoucherStatus, plan_acceptance,
};

use super::diesel_error_mapping::{
    TxError, is_unique_violation, map_diesel_error, map_pool_error, map_tx_error,
};
use super::models::{NewVoucherRow, RowDecodeError};
use super::pool::DbPool;
use super::schema::{offer_inbox, offers, vouchers};

const VOUCHER_UNIQUE_CONSTRAINT: &str = "vouchers_user_offer_key";

/// Diesel-backed implementation of the `OfferRepository` port.
#[derive(Clone)]
pub struct DieselOfferRepository {
    pool: DbPool,
}

impl DieselOfferRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

async fn existing_voucher(
    conn: &mut AsyncPgConnection,
    user_id: Uuid,
    offer_id: Uuid,
) -> Result<Option<VoucherId>, diesel::result::Error> {
    vouchers::table
        .filter(vouchers::user_id.eq(user_id))
        .filter(vouchers::offer_id.eq(offer_id))
        .select(vouchers::id)
        .first::<Uuid>(conn)
        .await
        .optional()
        .map(|id| id.map(VoucherId::from_uuid))
}

async fn active_wallet_count(
    conn: &mut AsyncPgConnection,
    user_id: &UserId,
    now: DateTime<Utc>,
) -> Result<u64, diesel::result::Error> {
    let count: i64 = vouchers::table
        .filter(vouchers::user_id.eq(user_id.as_uuid()))
        .filter(vouchers::status.eq(VoucherStatus::Active.as_str()))
        .filter(vouchers::expire_at.ge(now))
        .count()
        .get_result(conn)
        .await?;
    Ok(u64::try_from(count).unwrap_or_default())
}

async fn accept_in_transaction(
    conn: &mut AsyncPgConnection,
    attempt: AcceptanceAttempt,
) -> Result<AcceptanceOutcome, TxError> {
    let user_id = *attempt.user_id.as_uuid();
    let offer_id = *attempt.offer_id.as_uuid();

    let status: Option<String> = offer_inbox::table
        .find((user_id, offer_id))
        .select(offer_inbox::status)
        .for_update()
        .first(conn)
        .await
        .optional()?;
    let Some(status) = status else {
        return Ok(AcceptanceOutcome::NotInInbox);
    };
    let status = status
        .parse::<InboxStatus>()
        .map_err(|err| RowDecodeError::new("offer_inbox", err))?;

    let end_at: DateTime<Utc> = offers::table
        .find(offer_id)
        .select(offers::end_at)
        .first(conn)
        .await?;

    match plan_acceptance(status, end_at, attempt.now) {
        AcceptancePlan::AlreadyAccepted => Ok(AcceptanceOutcome::AlreadyAccepted {
            voucher_id: existing_voucher(conn, user_id, offer_id).await?,
        }),
        AcceptancePlan::OfferExpired => Ok(AcceptanceOutcome::OfferExpired { end_at }),
        AcceptancePlan::IssueVoucher => {
            diesel::insert_into(vouchers::table)
                .values(NewVoucherRow {
                    id: *attempt.voucher_id.as_uuid(),
                    user_id,
                    offer_id,
                    status: VoucherStatus::Active.as_str(),
                    expire_at: end_at,
                    created_at: attempt.now,
                })
                .execute(conn)
                .await?;

            diesel::update(offer_inbox::table.find((user_id, offer_id)))
                .set((
                    offer_inbox::status.eq(InboxStatus::Accepted.as_str()),
                    offer_inbox::updated_at.eq(attempt.now),
                ))
                .execute(conn)
                .await?;

            let wallet_count = active_wallet_count(conn, &attempt.user_id, attempt.now).await?;
            Ok(AcceptanceOutcome::Accepted(AcceptedOffer {
                voucher_id: attempt.voucher_id,
                wallet_count,
            }))
        }
    }
}

#[async_trait]
impl OfferRepository for DieselOfferRepository {
    async fn accept(
        &self,
        attempt: &AcceptanceAttempt,
    ) -> Result<AcceptanceOutcome, OfferRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error::<OfferRepositoryError>)?;
        let owned = *attempt;

        let result = conn
            .transaction(|conn| accept_in_transaction(conn, owned).scope_boxed())
            .await;

        match result {
            Ok(outcome) => Ok(outcome),
            Err(TxError::Diesel(err)) if is_unique_violation(&err, VOUCHER_UNIQUE_CONSTRAINT) => {
                warn!(
                    user_id = %attempt.user_id,
                    offer_id = %attempt.offer_id,
                    "voucher uniqueness rejected a concurrent acceptance"
                );
                let voucher_id = existing_voucher(
                    &mut conn,
                    *attempt.user_id.as_uuid(),
                    *attempt.offer_id.as_uuid(),
                )
                .await
                .map_err(|err| map_diesel_error::<OfferRepositoryError>(err, "offer acceptance"))?;
                Ok(AcceptanceOutcome::AlreadyAccepted { voucher_id })
            }
            Err(err) => Err(map_tx_error(err, "offer acceptance")),
        }
    }
}
