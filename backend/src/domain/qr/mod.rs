//! QR token primitives and the redemption state machine.
//!
//! - [`PresentedCode`]: plaintext code held only long enough to hash it.
//! - [`TokenHash`]: SHA-256 hex digest stored and looked up instead of the
//!   code.
//! - [`QrToken`]: single-use token linked to a voucher.
//! - [`plan_redemption`]: the pure decision applied inside the redemption
//!   transaction.
//! - [`plan_issue`]: whether a voucher may receive a fresh token.

mod code;
mod redemption;
mod token;

pub use code::{PresentedCode, PresentedCodeError, TokenHash};
pub use redemption::{
    GeoPoint, GeoPointError, IssueRejection, QrVerifyOutcome, RedemptionPlan,
    DEFAULT_MAX_DISTANCE_METERS, plan_issue, plan_redemption,
};
pub use token::{DEFAULT_QR_TTL_SECS, QrToken, QrTokenStatus};
