//! Error types for the data sealer.

use thiserror::Error;

/// Errors raised while sealing or unsealing a token.
///
/// `Expired` is deliberately separate from the integrity failures so callers
/// can tell a stale token from a forged or corrupted one.
#[derive(Debug, Error)]
pub enum SealerError {
    /// `wrap` was called with an empty payload.
    #[error("plaintext must not be empty")]
    EmptyPlaintext,

    /// `wrap` was called with a payload above the size limit.
    #[error("plaintext is {len} bytes, at most {max} are allowed")]
    PlaintextTooLong { len: usize, max: usize },

    /// The token names a key version this sealer does not hold.
    #[error("unknown key version '{version}'")]
    UnknownKeyVersion { version: String },

    /// The token failed decoding, decryption, decompression or the MAC check.
    /// The reason is the same for all of them.
    #[error("sealed token is invalid: {reason}")]
    Invalid { reason: String },

    /// The token authenticated correctly but its expiration has passed.
    #[error("sealed token expired at {expired_at_ms} (now {now_ms})")]
    Expired { expired_at_ms: i64, now_ms: i64 },

    /// A primitive failed while producing a token.
    #[error("cryptographic failure: {0}")]
    Crypto(String),
}

impl SealerError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid {
            reason: reason.into(),
        }
    }

    /// Returns `true` when the token was authentic but expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        matches!(self, Self::Expired { .. })
    }
}

/// Errors raised while building key material from configuration.
#[derive(Debug, Error)]
pub enum SealerConfigError {
    #[error("at least one sealer key must be configured")]
    NoKeys,

    #[error("no key configured for current version '{version}'")]
    MissingCurrentKey { version: String },

    #[error("duplicate key version '{version}'")]
    DuplicateVersion { version: String },

    #[error("key version '{version}' is invalid: {reason}")]
    InvalidKey { version: String, reason: String },
}

impl SealerConfigError {
    pub(crate) fn invalid_key(version: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidKey {
            version: version.into(),
            reason: reason.into(),
        }
    }
}
