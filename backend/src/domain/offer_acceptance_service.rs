//! Offer acceptance use case.
//!
//! Acceptance runs inside the idempotency envelope so retries with the same
//! key replay the first response, including a cached `already_accepted` or
//! `expired` error.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::info;

use crate::domain::ports::{
    AcceptOfferRequest, AcceptanceAttempt, AcceptanceOutcome, IdempotencyStore,
    OfferAcceptanceCommand, OfferRepository, OfferRepositoryError,
};
use crate::domain::{
    AcceptedOffer, Error, IdempotencyLookupQuery, IdempotencyScope, IdempotencyService,
    IdempotentReply, OFFER_ACCEPTED_STATUS, OfferId, StoredResponse, UserId, VoucherId,
    hash_payload,
};

fn map_offer_error(error: OfferRepositoryError) -> Error {
    match error {
        OfferRepositoryError::Connection { message } => {
            Error::internal(format!("offer repository unavailable: {message}"))
        }
        OfferRepositoryError::Query { message } => {
            Error::internal(format!("offer repository error: {message}"))
        }
    }
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct AcceptPayload {
    offer_id: OfferId,
}

/// Service implementing [`OfferAcceptanceCommand`].
#[derive(Clone)]
pub struct OfferAcceptanceService<R, I> {
    offers: Arc<R>,
    idempotency: IdempotencyService<I>,
    clock: Arc<dyn Clock>,
}

impl<R, I> OfferAcceptanceService<R, I> {
    /// Create the service.
    pub fn new(offers: Arc<R>, idempotency: IdempotencyService<I>, clock: Arc<dyn Clock>) -> Self {
        Self {
            offers,
            idempotency,
            clock,
        }
    }
}

impl<R, I> OfferAcceptanceService<R, I>
where
    R: OfferRepository,
    I: IdempotencyStore,
{
    /// Accept `offer_id` for `user_id` without idempotency handling.
    ///
    /// # Errors
    /// `not_found` when the offer is not in the inbox, `already_accepted`
    /// with `details.voucherId`, `expired` for ended offers, and
    /// `server_error` for storage failures.
    pub async fn accept(&self, user_id: UserId, offer_id: OfferId) -> Result<AcceptedOffer, Error> {
        let attempt = AcceptanceAttempt {
            user_id,
            offer_id,
            voucher_id: VoucherId::random(),
            now: self.clock.utc(),
        };
        match self.offers.accept(&attempt).await.map_err(map_offer_error)? {
            AcceptanceOutcome::Accepted(accepted) => {
                info!(
                    user_id = %user_id,
                    offer_id = %offer_id,
                    voucher_id = %accepted.voucher_id,
                    wallet_count = accepted.wallet_count,
                    "offer accepted"
                );
                Ok(accepted)
            }
            AcceptanceOutcome::NotInInbox => Err(Error::not_found("offer is not in your inbox")),
            AcceptanceOutcome::AlreadyAccepted { voucher_id } => {
                Err(Error::already_accepted("offer has already been accepted")
                    .with_details(json!({ "voucherId": voucher_id })))
            }
            AcceptanceOutcome::OfferExpired { end_at } => Err(Error::expired("offer has ended")
                .with_details(json!({ "expiredAt": end_at }))),
        }
    }
}

#[async_trait]
impl<R, I> OfferAcceptanceCommand for OfferAcceptanceService<R, I>
where
    R: OfferRepository,
    I: IdempotencyStore,
{
    async fn accept_offer(&self, request: AcceptOfferRequest) -> Result<IdempotentReply, Error> {
        let payload_hash = hash_payload(&AcceptPayload {
            offer_id: request.offer_id,
        })
        .map_err(|err| Error::internal(format!("failed to hash idempotency payload: {err}")))?;
        let query = IdempotencyLookupQuery::new(
            request.idempotency_key,
            request.user_id,
            IdempotencyScope::OfferAccept,
            payload_hash,
        );
        self.idempotency
            .execute(query, || async move {
                let accepted = self.accept(request.user_id, request.offer_id).await?;
                StoredResponse::json(OFFER_ACCEPTED_STATUS, &accepted)
            })
            .await
    }
}

#[cfg(test)]
#[path = "offer_acceptance_service_tests.rs"]
mod tests;
