//! Driving port for accepting offers from the inbox.

use async_trait::async_trait;
use serde_json::json;

use crate::domain::{
    Error, IdempotencyKey, IdempotentReply, OFFER_ACCEPTED_STATUS, OfferId, StoredResponse,
    UserId, VoucherId,
};

/// Request to accept one offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcceptOfferRequest {
    /// Authenticated user.
    pub user_id: UserId,
    /// Offer to accept.
    pub offer_id: OfferId,
    /// Client-supplied retry key.
    pub idempotency_key: IdempotencyKey,
}

/// Accept an offer exactly once per idempotency key.
///
/// The reply holds the stored response rather than a typed payload so a
/// replay returns the exact bytes of the first response, including cached
/// terminal errors.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OfferAcceptanceCommand: Send + Sync {
    /// Run or replay the acceptance.
    async fn accept_offer(&self, request: AcceptOfferRequest) -> Result<IdempotentReply, Error>;
}

/// Fixture command accepting every offer into a fresh voucher.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureOfferAcceptanceCommand;

#[async_trait]
impl OfferAcceptanceCommand for FixtureOfferAcceptanceCommand {
    async fn accept_offer(&self, _request: AcceptOfferRequest) -> Result<IdempotentReply, Error> {
        Ok(IdempotentReply::fresh(StoredResponse::new(
            OFFER_ACCEPTED_STATUS,
            json!({ "voucher_id": VoucherId::random(), "wallet_count": 1 }),
        )))
    }
}
