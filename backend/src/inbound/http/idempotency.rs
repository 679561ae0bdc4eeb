//! Helpers for parsing idempotency headers in HTTP handlers.

use actix_web::http::header::HeaderMap;

use crate::domain::{Error, IdempotencyKey, IdempotencyKeyValidationError};

/// HTTP header name for idempotency keys.
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Response header reporting whether a keyed request was replayed.
pub const IDEMPOTENCY_STATUS_HEADER: &str = "X-Idempotency";

/// Extract the idempotency key from request headers.
pub fn extract_idempotency_key(
    headers: &HeaderMap,
) -> Result<Option<IdempotencyKey>, IdempotencyKeyValidationError> {
    let Some(header_value) = headers.get(IDEMPOTENCY_KEY_HEADER) else {
        return Ok(None);
    };

    let key_str = header_value
        .to_str()
        .map_err(|_| IdempotencyKeyValidationError::InvalidKey)?;

    key_str.parse().map(Some)
}

/// Extract a mandatory idempotency key.
///
/// A missing header is `missing_idempotency_key`; a malformed one is
/// `invalid_param`.
pub fn require_idempotency_key(headers: &HeaderMap) -> Result<IdempotencyKey, Error> {
    extract_idempotency_key(headers)
        .map_err(map_idempotency_key_error)?
        .ok_or_else(|| {
            Error::missing_idempotency_key(format!("{IDEMPOTENCY_KEY_HEADER} header is required"))
        })
}

/// Map idempotency key validation errors to domain errors.
pub fn map_idempotency_key_error(err: IdempotencyKeyValidationError) -> Error {
    match err {
        IdempotencyKeyValidationError::EmptyKey => {
            Error::missing_idempotency_key("idempotency-key header must not be empty")
        }
        IdempotencyKeyValidationError::InvalidKey => {
            Error::invalid_param("idempotency-key header must be a valid uuid")
        }
    }
}
