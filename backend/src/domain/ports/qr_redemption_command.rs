//! Driving port for QR presentation and issuance.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{Error, GeoPoint, PresentedCode, QrVerifyOutcome, UserId, VoucherId};

/// A code presented at the till.
#[derive(Debug)]
pub struct VerifyQrRequest {
    /// Plaintext code; only its hash leaves this request.
    pub code: PresentedCode,
    /// Where the code was scanned, when known.
    pub location: Option<GeoPoint>,
}

/// Request for a fresh code for one of the user's vouchers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IssueQrRequest {
    /// Voucher owner.
    pub user_id: UserId,
    /// Voucher to present.
    pub voucher_id: VoucherId,
}

/// A freshly issued code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedQrCode {
    /// Plaintext code to render as a QR image.
    pub code: String,
    /// Instant after which presenting the code fails.
    pub expires_at: DateTime<Utc>,
}

/// QR state machine use cases.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QrRedemptionCommand: Send + Sync {
    /// Present a code and report the outcome.
    async fn verify(&self, request: VerifyQrRequest) -> Result<QrVerifyOutcome, Error>;

    /// Rotate the voucher's code.
    async fn issue_token(&self, request: IssueQrRequest) -> Result<IssuedQrCode, Error>;
}

/// Fixture command that rejects every code and refuses to issue.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureQrRedemptionCommand;

#[async_trait]
impl QrRedemptionCommand for FixtureQrRedemptionCommand {
    async fn verify(&self, _request: VerifyQrRequest) -> Result<QrVerifyOutcome, Error> {
        Ok(QrVerifyOutcome::Invalid)
    }

    async fn issue_token(&self, request: IssueQrRequest) -> Result<IssuedQrCode, Error> {
        Err(Error::not_found(format!(
            "voucher {} not found",
            request.voucher_id
        )))
    }
}
