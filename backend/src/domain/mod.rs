//! Domain primitives, state machines, and services.
//!
//! Purpose: hold every rule that decides an economic effect (accepting an
//! offer, redeeming a QR code, moving points) as plain types and pure
//! functions, with I/O pushed behind the traits in [`ports`]. Adapters lock
//! rows and then ask this module what to write.
//!
//! Public surface:
//! - [`Error`] / [`ErrorCode`]: API error payload and its closed code set.
//! - [`IdempotencyService`]: claim-first exactly-once execution.
//! - [`FixedWindowRateLimiter`]: per-identity request budgets.
//! - [`OfferAcceptanceService`], [`QrRedemptionService`], [`LedgerService`],
//!   [`WalletSummaryService`], [`WalletVoucherService`]: driving port
//!   implementations.
//! - [`MaintenanceService`]: periodic clean-up.

pub mod error;
pub mod idempotency;
pub mod ids;
pub mod ledger;
pub mod offers;
pub mod ports;
pub mod qr;
pub mod rate_limit;
pub mod trace_id;
pub mod vouchers;
pub mod wallet;

mod idempotency_service;
mod ledger_service;
mod maintenance;
mod offer_acceptance_service;
mod qr_redemption_service;
mod rate_limit_service;
mod wallet_summary_service;
mod wallet_voucher_service;

pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::idempotency::{
    DefaultIdempotencyEnv, IDEMPOTENCY_TTL_HOURS_ENV, IdempotencyConfig, IdempotencyEnv,
    IdempotencyKey, IdempotencyKeyValidationError, IdempotencyLookupQuery,
    IdempotencyLookupResult, IdempotencyRecord, IdempotencyScope, IdempotencyState,
    IdempotentReply, ParseIdempotencyScopeError, PayloadHash, PayloadHashError, StoredResponse,
    canonicalize_and_hash, hash_payload,
};
pub use self::idempotency_service::IdempotencyService;
pub use self::ids::{IdValidationError, LedgerEntryId, OfferId, QrTokenId, UserId, VoucherId};
pub use self::ledger::{LedgerEntry, LedgerEntryDraft, LedgerEntryType, LedgerRuleViolation};
pub use self::ledger_service::LedgerService;
pub use self::maintenance::{MaintenanceReport, MaintenanceService};
pub use self::offer_acceptance_service::OfferAcceptanceService;
pub use self::offers::{
    AcceptancePlan, AcceptedOffer, InboxStatus, OFFER_ACCEPTED_STATUS, ParseInboxStatusError,
    plan_acceptance,
};
pub use self::qr::{
    DEFAULT_MAX_DISTANCE_METERS, DEFAULT_QR_TTL_SECS, GeoPoint, GeoPointError, IssueRejection,
    PresentedCode, PresentedCodeError, QrToken, QrTokenStatus, QrVerifyOutcome, RedemptionPlan,
    TokenHash, plan_issue, plan_redemption,
};
pub use self::qr_redemption_service::{QrRedemptionConfig, QrRedemptionService};
pub use self::rate_limit::{RateLimitCounter, RateLimitDecision, RateLimitKey, RateLimitPolicy};
pub use self::rate_limit_service::FixedWindowRateLimiter;
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
pub use self::vouchers::{
    ParseVoucherStatusError, Voucher, VoucherCard, VoucherListKey, VoucherStatus,
};
pub use self::wallet::{
    EXPIRING_HORIZON, STAMPS_PER_REWARD, StampCard, VoucherCounts, VoucherStats, WalletSummary,
};
pub use self::wallet_summary_service::WalletSummaryService;
pub use self::wallet_voucher_service::WalletVoucherService;

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use voucher_backend::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<()> {
///     Err(Error::unauthorized("login required"))
/// }
/// assert!(handler().is_err());
/// ```
pub type ApiResult<T> = Result<T, Error>;
