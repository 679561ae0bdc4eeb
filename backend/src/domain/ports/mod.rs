//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driven ports (`*Repository`, `*Store`, [`ProximityOracle`]) are
//! implemented by outbound adapters. Driving ports (`*Command`, `*Query`,
//! [`RequestThrottle`]) are implemented by domain services and consumed by
//! the HTTP layer.

mod macros;
pub(crate) use macros::define_port_error;

mod idempotency_store;
mod ledger_query;
mod ledger_repository;
mod offer_acceptance_command;
mod offer_repository;
mod proximity_oracle;
mod qr_redemption_command;
mod qr_token_repository;
mod rate_limit_store;
mod request_throttle;
mod voucher_query;
mod voucher_repository;
mod wallet_summary_query;

#[cfg(test)]
pub use idempotency_store::MockIdempotencyStore;
pub use idempotency_store::{FixtureIdempotencyStore, IdempotencyStore, IdempotencyStoreError};
#[cfg(test)]
pub use ledger_query::{MockLedgerCommand, MockLedgerQuery};
pub use ledger_query::{
    FixtureLedgerQuery, LedgerCommand, LedgerPage, LedgerPageRequest, LedgerQuery,
};
#[cfg(test)]
pub use ledger_repository::MockLedgerRepository;
pub use ledger_repository::{AppendOutcome, LedgerRepository, LedgerRepositoryError};
#[cfg(test)]
pub use offer_acceptance_command::MockOfferAcceptanceCommand;
pub use offer_acceptance_command::{
    AcceptOfferRequest, FixtureOfferAcceptanceCommand, OfferAcceptanceCommand,
};
#[cfg(test)]
pub use offer_repository::MockOfferRepository;
pub use offer_repository::{
    AcceptanceAttempt, AcceptanceOutcome, FixtureOfferRepository, OfferRepository,
    OfferRepositoryError,
};
#[cfg(test)]
pub use proximity_oracle::MockProximityOracle;
pub use proximity_oracle::{FixtureProximityOracle, ProximityOracle, ProximityOracleError};
#[cfg(test)]
pub use qr_redemption_command::MockQrRedemptionCommand;
pub use qr_redemption_command::{
    FixtureQrRedemptionCommand, IssueQrRequest, IssuedQrCode, QrRedemptionCommand,
    VerifyQrRequest,
};
#[cfg(test)]
pub use qr_token_repository::MockQrTokenRepository;
pub use qr_token_repository::{
    QrTokenRepository, QrTokenRepositoryError, RedemptionAttempt, RedemptionTarget, TokenIssue,
    TokenIssueOutcome,
};
#[cfg(test)]
pub use rate_limit_store::MockRateLimitStore;
pub use rate_limit_store::{RateLimitStore, RateLimitStoreError};
#[cfg(test)]
pub use request_throttle::MockRequestThrottle;
pub use request_throttle::{FixtureRequestThrottle, RequestThrottle};
#[cfg(test)]
pub use voucher_query::MockVoucherQuery;
pub use voucher_query::{FixtureVoucherQuery, VoucherPage, VoucherPageRequest, VoucherQuery};
#[cfg(test)]
pub use voucher_repository::MockVoucherRepository;
pub use voucher_repository::{FixtureVoucherRepository, VoucherRepository, VoucherRepositoryError};
#[cfg(test)]
pub use wallet_summary_query::MockWalletSummaryQuery;
pub use wallet_summary_query::{FixtureWalletSummaryQuery, WalletSummaryQuery};
