//! Port for QR token issuance and redemption transactions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    IssueRejection, OfferId, QrToken, QrTokenId, QrVerifyOutcome, TokenHash, UserId, VoucherId,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by QR token repository adapters.
    pub enum QrTokenRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "qr token repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "qr token repository query failed: {message}",
    }
}

/// Voucher and offer a token points at, read before the transaction so the
/// proximity check can run outside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedemptionTarget {
    /// Voucher the token redeems.
    pub voucher_id: VoucherId,
    /// Offer the voucher was issued for.
    pub offer_id: OfferId,
}

/// Inputs for one redemption transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedemptionAttempt {
    /// Hash of the presented code.
    pub code_hash: TokenHash,
    /// Whether the caller passed the proximity gate.
    pub within_range: bool,
    /// Decision instant.
    pub now: DateTime<Utc>,
}

/// Inputs for issuing a fresh token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenIssue {
    /// Voucher owner; other users' vouchers are reported as missing.
    pub user_id: UserId,
    /// Voucher to attach the token to.
    pub voucher_id: VoucherId,
    /// Identifier for the new token row.
    pub token_id: QrTokenId,
    /// Hash of the generated code.
    pub code_hash: TokenHash,
    /// Token lifetime in seconds.
    pub ttl_sec: u32,
    /// Issue instant.
    pub now: DateTime<Utc>,
}

/// Result of an issue transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenIssueOutcome {
    /// The token was stored and earlier active tokens expired.
    Issued(QrToken),
    /// The user owns no voucher with this id.
    VoucherNotFound,
    /// The voucher can no longer be presented.
    Rejected(IssueRejection),
}

/// Port for QR token state transitions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QrTokenRepository: Send + Sync {
    /// Resolve the voucher and offer behind a code hash.
    async fn find_target(
        &self,
        code_hash: &TokenHash,
    ) -> Result<Option<RedemptionTarget>, QrTokenRepositoryError>;

    /// Lock token and voucher, apply [`crate::domain::plan_redemption`], and
    /// commit. Returns `None` when no token matches the hash.
    ///
    /// A successful redemption also appends an `earn` ledger entry when the
    /// offer carries reward points.
    async fn redeem(
        &self,
        attempt: &RedemptionAttempt,
    ) -> Result<Option<QrVerifyOutcome>, QrTokenRepositoryError>;

    /// Expire the voucher's active tokens and store a new one.
    async fn issue(&self, issue: &TokenIssue) -> Result<TokenIssueOutcome, QrTokenRepositoryError>;
}
