//! Port for the offer acceptance transaction.
//!
//! Implementations lock the user's inbox entry, consult
//! [`crate::domain::plan_acceptance`], and apply the plan before committing.
//! A unique `(user_id, offer_id)` constraint on vouchers backs up the lock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{AcceptedOffer, OfferId, UserId, VoucherId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by offer repository adapters.
    pub enum OfferRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "offer repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "offer repository query failed: {message}",
    }
}

/// Inputs for one acceptance attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcceptanceAttempt {
    /// Accepting user.
    pub user_id: UserId,
    /// Offer being accepted.
    pub offer_id: OfferId,
    /// Identifier to give the voucher if one is issued.
    pub voucher_id: VoucherId,
    /// Decision instant.
    pub now: DateTime<Utc>,
}

/// Result of an acceptance transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptanceOutcome {
    /// No inbox entry exists for this user and offer.
    NotInInbox,
    /// The entry was accepted earlier.
    AlreadyAccepted {
        /// Voucher issued by the earlier acceptance.
        voucher_id: Option<VoucherId>,
    },
    /// The offer ended before `now`.
    OfferExpired {
        /// End of the offer.
        end_at: DateTime<Utc>,
    },
    /// A voucher was issued.
    Accepted(AcceptedOffer),
}

/// Port for the atomic accept transaction.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OfferRepository: Send + Sync {
    /// Run the acceptance state machine for one inbox entry.
    async fn accept(
        &self,
        attempt: &AcceptanceAttempt,
    ) -> Result<AcceptanceOutcome, OfferRepositoryError>;
}

/// Fixture repository that treats every offer as missing from the inbox.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureOfferRepository;

#[async_trait]
impl OfferRepository for FixtureOfferRepository {
    async fn accept(
        &self,
        _attempt: &AcceptanceAttempt,
    ) -> Result<AcceptanceOutcome, OfferRepositoryError> {
        Ok(AcceptanceOutcome::NotInInbox)
    }
}
