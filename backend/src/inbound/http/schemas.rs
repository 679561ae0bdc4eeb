//! OpenAPI schema definitions for domain types.
//!
//! Domain types remain framework-agnostic by not deriving `ToSchema`. This
//! module provides the schema definitions required for OpenAPI documentation
//! using utoipa's external schema registration.
//!
//! The schema wrappers mirror the serialised shape of their domain types but
//! live in the inbound adapter layer where framework concerns belong.

use utoipa::ToSchema;

/// OpenAPI schema for [`crate::domain::ErrorCode`].
#[derive(ToSchema)]
#[schema(as = crate::domain::ErrorCode)]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub enum ErrorCodeSchema {
    /// The request is malformed or fails validation.
    #[schema(rename = "invalid_param")]
    InvalidParam,
    /// A mutating request lacked an idempotency key.
    #[schema(rename = "missing_idempotency_key")]
    MissingIdempotencyKey,
    /// No session identity was presented.
    #[schema(rename = "unauthorized")]
    Unauthorized,
    /// The caller exhausted its request budget.
    #[schema(rename = "rate_limited")]
    RateLimited,
    /// The requested resource does not exist.
    #[schema(rename = "not_found")]
    NotFound,
    /// The offer, voucher, or token has expired.
    #[schema(rename = "expired")]
    Expired,
    /// The offer was accepted earlier.
    #[schema(rename = "already_accepted")]
    AlreadyAccepted,
    /// The voucher was redeemed earlier.
    #[schema(rename = "already_used")]
    AlreadyUsed,
    /// The token is not usable.
    #[schema(rename = "invalid_token")]
    InvalidToken,
    /// The request collides with other state.
    #[schema(rename = "conflict")]
    Conflict,
    /// An unexpected error occurred on the server.
    #[schema(rename = "server_error")]
    ServerError,
}

/// OpenAPI schema for [`crate::domain::Error`].
#[derive(ToSchema)]
#[schema(as = crate::domain::Error)]
#[serde(rename_all = "camelCase")]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct ErrorSchema {
    /// Stable machine-readable error code.
    #[schema(example = "invalid_param")]
    code: ErrorCodeSchema,
    /// Human-readable message returned to clients.
    #[schema(example = "limit must be at most 50")]
    message: String,
    /// Correlation identifier echoed in the `trace-id` header.
    #[schema(example = "6f1c1f43-8f0d-4c3c-9a0e-1d2b3c4d5e6f")]
    trace_id: Option<String>,
    /// Supplementary error details, such as `retryAfterSeconds`.
    details: Option<serde_json::Value>,
}

/// OpenAPI schema for [`crate::domain::QrVerifyOutcome`].
///
/// `result` is one of `success`, `already_used`, `expired`, `invalid`.
#[derive(ToSchema)]
#[schema(as = crate::domain::QrVerifyOutcome)]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct QrVerifyOutcomeSchema {
    /// Outcome tag.
    #[schema(example = "success")]
    result: String,
    /// Redeemed voucher, on success.
    #[schema(format = Uuid)]
    voucher_id: Option<String>,
    /// Redemption instant, when already used.
    used_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Expiry instant, when expired.
    expired_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// OpenAPI schema for [`crate::domain::ports::IssuedQrCode`].
#[derive(ToSchema)]
#[schema(as = crate::domain::ports::IssuedQrCode)]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct IssuedQrCodeSchema {
    /// Plaintext code to render as a QR image.
    code: String,
    /// Instant after which the code is rejected.
    expires_at: chrono::DateTime<chrono::Utc>,
}

/// OpenAPI schema for [`crate::domain::StampCard`].
#[derive(ToSchema)]
#[schema(as = crate::domain::StampCard)]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct StampCardSchema {
    count: u64,
    next_reward_in: u64,
}

/// OpenAPI schema for [`crate::domain::VoucherCounts`].
#[derive(ToSchema)]
#[schema(as = crate::domain::VoucherCounts)]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct VoucherCountsSchema {
    active: u64,
    expiring: u64,
    nearest_expire_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// OpenAPI schema for [`crate::domain::WalletSummary`].
#[derive(ToSchema)]
#[schema(as = crate::domain::WalletSummary)]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct WalletSummarySchema {
    /// Latest ledger balance.
    points: i64,
    /// Stamp card progress.
    stamps: StampCardSchema,
    /// Voucher counts.
    vouchers: VoucherCountsSchema,
}
