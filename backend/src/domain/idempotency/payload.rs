//! Canonical request fingerprints.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Errors raised while building a [`PayloadHash`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadHashError {
    /// Stored bytes had the wrong length.
    #[error("payload hash must be {expected} bytes, got {actual}")]
    InvalidLength {
        /// Expected number of bytes.
        expected: usize,
        /// Number of bytes found.
        actual: usize,
    },
    /// The request could not be rendered as JSON.
    #[error("failed to serialise canonical payload: {message}")]
    Serialization {
        /// Serializer message.
        message: String,
    },
}

/// SHA-256 digest of a canonicalised request payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PayloadHash([u8; 32]);

impl PayloadHash {
    /// Rebuild a hash from stored bytes.
    ///
    /// # Errors
    /// Returns [`PayloadHashError::InvalidLength`] unless exactly 32 bytes
    /// are supplied.
    pub fn try_from_bytes(bytes: &[u8]) -> Result<Self, PayloadHashError> {
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| PayloadHashError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            })?;
        Ok(Self(array))
    }

    /// Wrap a digest.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for PayloadHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Hash a JSON value after sorting object keys recursively.
///
/// Whitespace and key order never influence the digest; array order does.
///
/// # Errors
/// Returns [`PayloadHashError::Serialization`] if the value cannot be
/// rendered.
///
/// # Examples
/// ```
/// use serde_json::json;
/// use voucher_backend::domain::idempotency::canonicalize_and_hash;
///
/// let a = canonicalize_and_hash(&json!({"b": 2, "a": 1})).unwrap();
/// let b = canonicalize_and_hash(&json!({"a": 1, "b": 2})).unwrap();
/// assert_eq!(a, b);
/// ```
pub fn canonicalize_and_hash(value: &Value) -> Result<PayloadHash, PayloadHashError> {
    let bytes = serde_json::to_vec(&canonicalize(value)).map_err(|err| {
        PayloadHashError::Serialization {
            message: err.to_string(),
        }
    })?;
    Ok(PayloadHash::from_bytes(Sha256::digest(&bytes).into()))
}

/// Serialise `payload` and hash its canonical form.
///
/// # Errors
/// Returns [`PayloadHashError::Serialization`] when `payload` cannot be
/// converted to JSON.
pub fn hash_payload<T: Serialize>(payload: &T) -> Result<PayloadHash, PayloadHashError> {
    let value = serde_json::to_value(payload).map_err(|err| PayloadHashError::Serialization {
        message: err.to_string(),
    })?;
    canonicalize_and_hash(&value)
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by_key(|(key, _)| key.as_str());
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, nested)| (key.clone(), canonicalize(nested)))
                    .collect::<Map<String, Value>>(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}
