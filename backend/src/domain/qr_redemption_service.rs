//! QR presentation and issuance use cases.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::{debug, info};

use crate::domain::ports::{
    IssueQrRequest, IssuedQrCode, ProximityOracle, ProximityOracleError, QrRedemptionCommand,
    QrTokenRepository, QrTokenRepositoryError, RedemptionAttempt, RedemptionTarget, TokenIssue,
    TokenIssueOutcome, VerifyQrRequest,
};
use crate::domain::{
    DEFAULT_MAX_DISTANCE_METERS, DEFAULT_QR_TTL_SECS, Error, GeoPoint, PresentedCode, QrTokenId,
    QrVerifyOutcome,
};

fn map_token_error(error: QrTokenRepositoryError) -> Error {
    match error {
        QrTokenRepositoryError::Connection { message } => {
            Error::internal(format!("qr token repository unavailable: {message}"))
        }
        QrTokenRepositoryError::Query { message } => {
            Error::internal(format!("qr token repository error: {message}"))
        }
    }
}

fn map_oracle_error(error: ProximityOracleError) -> Error {
    Error::internal(format!("proximity check failed: {error}"))
}

/// Tunables for token lifetime and the proximity gate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QrRedemptionConfig {
    /// Lifetime of issued tokens in seconds.
    pub token_ttl_secs: u32,
    /// Furthest a scan may happen from the offer's place.
    pub max_distance_meters: f64,
}

impl Default for QrRedemptionConfig {
    fn default() -> Self {
        Self {
            token_ttl_secs: DEFAULT_QR_TTL_SECS,
            max_distance_meters: DEFAULT_MAX_DISTANCE_METERS,
        }
    }
}

/// Service implementing [`QrRedemptionCommand`].
#[derive(Clone)]
pub struct QrRedemptionService<T, P> {
    tokens: Arc<T>,
    proximity: Arc<P>,
    config: QrRedemptionConfig,
    clock: Arc<dyn Clock>,
}

impl<T, P> QrRedemptionService<T, P> {
    /// Create the service.
    pub fn new(
        tokens: Arc<T>,
        proximity: Arc<P>,
        config: QrRedemptionConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tokens,
            proximity,
            config,
            clock,
        }
    }
}

impl<T, P> QrRedemptionService<T, P>
where
    T: QrTokenRepository,
    P: ProximityOracle,
{
    async fn within_range(
        &self,
        target: &RedemptionTarget,
        location: Option<GeoPoint>,
    ) -> Result<bool, Error> {
        let Some(point) = location else {
            return Ok(true);
        };
        let distance = self
            .proximity
            .distance_meters(&target.offer_id, point)
            .await
            .map_err(map_oracle_error)?;
        Ok(distance.is_none_or(|metres| metres <= self.config.max_distance_meters))
    }
}

#[async_trait]
impl<T, P> QrRedemptionCommand for QrRedemptionService<T, P>
where
    T: QrTokenRepository,
    P: ProximityOracle,
{
    async fn verify(&self, request: VerifyQrRequest) -> Result<QrVerifyOutcome, Error> {
        let code_hash = request.code.hash();
        let Some(target) = self
            .tokens
            .find_target(&code_hash)
            .await
            .map_err(map_token_error)?
        else {
            debug!(code_hash = %code_hash, "no token for presented code");
            return Ok(QrVerifyOutcome::Invalid);
        };

        let within_range = self.within_range(&target, request.location).await?;
        let attempt = RedemptionAttempt {
            code_hash,
            within_range,
            now: self.clock.utc(),
        };
        let outcome = self
            .tokens
            .redeem(&attempt)
            .await
            .map_err(map_token_error)?
            .unwrap_or(QrVerifyOutcome::Invalid);

        info!(
            voucher_id = %target.voucher_id,
            within_range,
            outcome = ?outcome,
            "qr code presented"
        );
        Ok(outcome)
    }

    async fn issue_token(&self, request: IssueQrRequest) -> Result<IssuedQrCode, Error> {
        let code = PresentedCode::generate();
        let issue = TokenIssue {
            user_id: request.user_id,
            voucher_id: request.voucher_id,
            token_id: QrTokenId::random(),
            code_hash: code.hash(),
            ttl_sec: self.config.token_ttl_secs,
            now: self.clock.utc(),
        };
        match self.tokens.issue(&issue).await.map_err(map_token_error)? {
            TokenIssueOutcome::Issued(token) => {
                info!(voucher_id = %token.voucher_id, token_id = %token.id, "qr token issued");
                Ok(IssuedQrCode {
                    code: code.expose().to_owned(),
                    expires_at: token.expires_at(),
                })
            }
            TokenIssueOutcome::VoucherNotFound => Err(Error::not_found(format!(
                "voucher {} not found",
                request.voucher_id
            ))),
            TokenIssueOutcome::Rejected(rejection) => Err(rejection.into()),
        }
    }
}

#[cfg(test)]
#[path = "qr_redemption_service_tests.rs"]
mod tests;
