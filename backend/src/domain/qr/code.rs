//! Presented codes and their one-way hashes.

use std::fmt;

use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

const MAX_CODE_LEN: usize = 512;
const GENERATED_CODE_BYTES: usize = 32;

/// Validation errors for presented codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PresentedCodeError {
    /// No code was supplied.
    #[error("token must not be empty")]
    Empty,
    /// The code exceeded the accepted length.
    #[error("token must be at most {max} characters")]
    TooLong {
        /// Maximum accepted length.
        max: usize,
    },
}

/// Plaintext code scanned from a QR image.
///
/// The buffer is wiped on drop and never printed; hash it with
/// [`PresentedCode::hash`] before storage or logging.
pub struct PresentedCode(Zeroizing<String>);

impl PresentedCode {
    /// Accept a scanned code.
    ///
    /// # Errors
    /// Returns [`PresentedCodeError`] when the code is blank or oversized.
    pub fn new(raw: String) -> Result<Self, PresentedCodeError> {
        let raw = Zeroizing::new(raw);
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PresentedCodeError::Empty);
        }
        if trimmed.len() > MAX_CODE_LEN {
            return Err(PresentedCodeError::TooLong { max: MAX_CODE_LEN });
        }
        if trimmed.len() == raw.len() {
            return Ok(Self(raw));
        }
        Ok(Self(Zeroizing::new(trimmed.to_owned())))
    }

    /// Draw a fresh random code for token issuance.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = Zeroizing::new([0_u8; GENERATED_CODE_BYTES]);
        OsRng.fill_bytes(&mut *bytes);
        Self(Zeroizing::new(hex::encode(&*bytes)))
    }

    /// One-way digest used for storage and lookup.
    #[must_use]
    pub fn hash(&self) -> TokenHash {
        TokenHash(hex::encode(Sha256::digest(self.0.as_bytes())))
    }

    /// Reveal the plaintext; only for rendering a freshly issued code.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for PresentedCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PresentedCode(<redacted>)")
    }
}

/// Lowercase hex SHA-256 digest of a presented code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenHash(String);

impl TokenHash {
    /// Rebuild from a stored digest.
    #[must_use]
    pub const fn from_stored(digest: String) -> Self {
        Self(digest)
    }

    /// Digest text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
