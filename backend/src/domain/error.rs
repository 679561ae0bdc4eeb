//! Domain-level error types.
//!
//! These errors are transport agnostic. Inbound adapters map them to HTTP
//! responses; the idempotency engine snapshots the replayable ones. The
//! taxonomy is closed: every [`ErrorCode`] has exactly one status code and a
//! fixed replay policy.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::TraceId;

/// Stable machine-readable error code describing the failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The request is malformed or fails validation.
    InvalidParam,
    /// A mutating request arrived without a usable `Idempotency-Key`.
    MissingIdempotencyKey,
    /// No user identity could be resolved for the request.
    Unauthorized,
    /// The caller exhausted its request budget for the current window.
    RateLimited,
    /// The requested resource does not exist for this caller.
    NotFound,
    /// The offer, voucher, or token is past its end of life.
    Expired,
    /// The offer was already accepted; informational.
    AlreadyAccepted,
    /// The voucher or token was already redeemed; informational.
    AlreadyUsed,
    /// The presented token is not usable.
    InvalidToken,
    /// The request collides with concurrent or prior state.
    Conflict,
    /// An unexpected infrastructure failure.
    ServerError,
}

impl ErrorCode {
    /// Transport status associated with the code.
    ///
    /// The mapping is total so adapters and cached snapshots agree.
    #[must_use]
    pub const fn status_code(self) -> u16 {
        match self {
            Self::InvalidParam | Self::MissingIdempotencyKey => 400,
            Self::Unauthorized => 401,
            Self::NotFound => 404,
            Self::AlreadyAccepted | Self::AlreadyUsed | Self::Conflict => 409,
            Self::Expired => 410,
            Self::InvalidToken => 422,
            Self::RateLimited => 429,
            Self::ServerError => 500,
        }
    }

    /// Whether the outcome is a deterministic terminal result that may be
    /// stored against an idempotency key and replayed.
    #[must_use]
    pub const fn is_replayable(self) -> bool {
        matches!(
            self,
            Self::AlreadyAccepted | Self::AlreadyUsed | Self::Expired | Self::InvalidToken
        )
    }

    /// Snake-case identifier used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidParam => "invalid_param",
            Self::MissingIdempotencyKey => "missing_idempotency_key",
            Self::Unauthorized => "unauthorized",
            Self::RateLimited => "rate_limited",
            Self::NotFound => "not_found",
            Self::Expired => "expired",
            Self::AlreadyAccepted => "already_accepted",
            Self::AlreadyUsed => "already_used",
            Self::InvalidToken => "invalid_token",
            Self::Conflict => "conflict",
            Self::ServerError => "server_error",
        }
    }
}

/// Domain error payload.
///
/// ## Invariants
/// - `message` must be non-empty once trimmed of whitespace.
///
/// # Examples
/// ```
/// use voucher_backend::domain::{Error, ErrorCode};
///
/// let err = Error::not_found("offer is not in your inbox");
/// assert_eq!(err.code(), ErrorCode::NotFound);
/// assert_eq!(err.code().status_code(), 404);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ErrorDto", into = "ErrorDto")]
pub struct Error {
    code: ErrorCode,
    message: String,
    trace_id: Option<String>,
    details: Option<Value>,
}

/// Validation errors emitted by the fallible constructors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ErrorValidationError {
    /// Message was blank.
    #[error("error message must not be empty")]
    EmptyMessage,
    /// Trace identifier was blank.
    #[error("trace identifier must not be empty")]
    EmptyTraceId,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(deny_unknown_fields)]
struct ErrorDto {
    code: ErrorCode,
    message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    trace_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl TryFrom<ErrorDto> for Error {
    type Error = ErrorValidationError;

    fn try_from(dto: ErrorDto) -> Result<Self, Self::Error> {
        let mut error = Self::try_new(dto.code, dto.message)?;
        error.trace_id = None;
        if let Some(id) = dto.trace_id {
            error = error.try_with_trace_id(id)?;
        }
        error.details = dto.details;
        Ok(error)
    }
}

impl From<Error> for ErrorDto {
    fn from(error: Error) -> Self {
        Self {
            code: error.code,
            message: error.message,
            trace_id: error.trace_id,
            details: error.details,
        }
    }
}

impl Error {
    /// Create a new error, falling back to the code's identifier when the
    /// message is blank.
    ///
    /// Captures the current trace identifier if one is in scope.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            code.as_str().to_owned()
        } else {
            message
        };
        Self {
            code,
            message,
            trace_id: TraceId::current().map(|id| id.to_string()),
            details: None,
        }
    }

    /// Fallible constructor that validates the message content.
    ///
    /// # Errors
    /// Returns [`ErrorValidationError::EmptyMessage`] for blank messages.
    pub fn try_new(
        code: ErrorCode,
        message: impl Into<String>,
    ) -> Result<Self, ErrorValidationError> {
        let message = message.into();
        if message.trim().is_empty() {
            return Err(ErrorValidationError::EmptyMessage);
        }
        Ok(Self::new(code, message))
    }

    /// Stable machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        self.code
    }

    /// Human-readable message returned to adapters.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Correlation identifier captured when the error was raised.
    #[must_use]
    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }

    /// Supplementary error details for adapters.
    #[must_use]
    pub const fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    /// Seconds until a rate-limited caller may retry, when known.
    #[must_use]
    pub fn retry_after_secs(&self) -> Option<u64> {
        self.details
            .as_ref()
            .and_then(|details| details.get("retryAfterSeconds"))
            .and_then(Value::as_u64)
    }

    /// Attach structured details to the error.
    ///
    /// # Examples
    /// ```
    /// use voucher_backend::domain::Error;
    /// use serde_json::json;
    ///
    /// let err = Error::invalid_param("bad").with_details(json!({ "field": "limit" }));
    /// assert!(err.details().is_some());
    /// ```
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Attach a trace identifier to the error.
    #[must_use]
    pub fn with_trace_id(mut self, id: impl Into<String>) -> Self {
        self.trace_id = Some(id.into());
        self
    }

    /// Attach a trace identifier, rejecting blank values.
    ///
    /// # Errors
    /// Returns [`ErrorValidationError::EmptyTraceId`] for blank identifiers.
    pub fn try_with_trace_id(self, id: impl Into<String>) -> Result<Self, ErrorValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ErrorValidationError::EmptyTraceId);
        }
        Ok(self.with_trace_id(id))
    }

    /// Drop the trace identifier so the payload can be replayed verbatim.
    #[must_use]
    pub fn without_trace_id(mut self) -> Self {
        self.trace_id = None;
        self
    }

    /// Convenience constructor for [`ErrorCode::InvalidParam`].
    pub fn invalid_param(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidParam, message)
    }

    /// Convenience constructor for [`ErrorCode::MissingIdempotencyKey`].
    pub fn missing_idempotency_key(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::MissingIdempotencyKey, message)
    }

    /// Convenience constructor for [`ErrorCode::Unauthorized`].
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// Construct a [`ErrorCode::RateLimited`] error carrying the retry delay.
    ///
    /// # Examples
    /// ```
    /// use voucher_backend::domain::Error;
    ///
    /// let err = Error::rate_limited("slow down", 12);
    /// assert_eq!(err.retry_after_secs(), Some(12));
    /// ```
    pub fn rate_limited(message: impl Into<String>, retry_after_secs: u64) -> Self {
        Self::new(ErrorCode::RateLimited, message)
            .with_details(json!({ "retryAfterSeconds": retry_after_secs }))
    }

    /// Convenience constructor for [`ErrorCode::NotFound`].
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Convenience constructor for [`ErrorCode::Expired`].
    pub fn expired(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Expired, message)
    }

    /// Convenience constructor for [`ErrorCode::AlreadyAccepted`].
    pub fn already_accepted(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AlreadyAccepted, message)
    }

    /// Convenience constructor for [`ErrorCode::AlreadyUsed`].
    pub fn already_used(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AlreadyUsed, message)
    }

    /// Convenience constructor for [`ErrorCode::InvalidToken`].
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidToken, message)
    }

    /// Convenience constructor for [`ErrorCode::Conflict`].
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    /// Convenience constructor for [`ErrorCode::ServerError`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServerError, message)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for Error {}
