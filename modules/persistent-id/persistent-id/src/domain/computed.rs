//! Computed pairwise identifiers: a salted digest over issuer, relying party
//! and the principal's local id. Deterministic and storage-free.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use secrecy::ExposeSecret;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use super::error::PersistentIdError;
use super::model::PairwiseIdRequest;
use super::store::PairwiseIdStore;
use crate::config::{ComputedIdAlgorithm, ComputedIdConfig, IdEncoding};

/// Minimum salt length in bytes.
pub const MIN_SALT_LEN: usize = 16;

const SEPARATOR: &[u8] = b"!";

type HmacSha256 = Hmac<Sha256>;

pub struct ComputedIdStrategy {
    salt: Zeroizing<Vec<u8>>,
    algorithm: ComputedIdAlgorithm,
    encoding: IdEncoding,
}

impl std::fmt::Debug for ComputedIdStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputedIdStrategy")
            .field("salt", &"[REDACTED]")
            .field("algorithm", &self.algorithm)
            .field("encoding", &self.encoding)
            .finish()
    }
}

impl ComputedIdStrategy {
    /// # Errors
    ///
    /// Returns a configuration error if `salt` is shorter than [`MIN_SALT_LEN`].
    pub fn new(salt: impl Into<Vec<u8>>) -> Result<Self, PersistentIdError> {
        let salt = Zeroizing::new(salt.into());
        if salt.len() < MIN_SALT_LEN {
            return Err(PersistentIdError::configuration(format!(
                "salt must be at least {MIN_SALT_LEN} bytes, got {}",
                salt.len()
            )));
        }
        Ok(Self {
            salt,
            algorithm: ComputedIdAlgorithm::default(),
            encoding: IdEncoding::default(),
        })
    }

    /// # Errors
    ///
    /// Returns a configuration error if the configured salt is too short.
    pub fn from_config(cfg: &ComputedIdConfig) -> Result<Self, PersistentIdError> {
        Ok(Self::new(cfg.salt.expose_secret().as_bytes())?
            .with_algorithm(cfg.algorithm)
            .with_encoding(cfg.encoding))
    }

    #[must_use]
    pub fn with_algorithm(mut self, algorithm: ComputedIdAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    #[must_use]
    pub fn with_encoding(mut self, encoding: IdEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Derive the identifier for `(issuer_id, relying_party_id, local_id)`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistentIdError::MissingInput`] if any input is empty.
    pub fn compute(
        &self,
        issuer_id: &str,
        relying_party_id: &str,
        local_id: &str,
    ) -> Result<String, PersistentIdError> {
        if issuer_id.is_empty() {
            return Err(PersistentIdError::MissingInput("issuer_id"));
        }
        if relying_party_id.is_empty() {
            return Err(PersistentIdError::MissingInput("relying_party_id"));
        }
        if local_id.is_empty() {
            return Err(PersistentIdError::MissingInput("local_id"));
        }

        let parts = [
            issuer_id.as_bytes(),
            SEPARATOR,
            relying_party_id.as_bytes(),
            SEPARATOR,
            local_id.as_bytes(),
        ];

        let digest: Vec<u8> = match self.algorithm {
            ComputedIdAlgorithm::Sha256 => {
                let mut hasher = Sha256::new();
                hasher.update(self.salt.as_slice());
                for part in parts {
                    hasher.update(part);
                }
                hasher.finalize().to_vec()
            }
            ComputedIdAlgorithm::HmacSha256 => {
                let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.salt)
                    .map_err(|e| PersistentIdError::internal(format!("hmac key: {e}")))?;
                for part in parts {
                    mac.update(part);
                }
                mac.finalize().into_bytes().to_vec()
            }
        };

        Ok(match self.encoding {
            IdEncoding::Base64 => STANDARD.encode(digest),
            IdEncoding::Hex => hex::encode(digest),
        })
    }
}

#[async_trait]
impl PairwiseIdStore for ComputedIdStrategy {
    async fn get_or_issue(&self, request: &PairwiseIdRequest) -> Result<String, PersistentIdError> {
        self.compute(
            &request.issuer_id,
            &request.relying_party_id,
            &request.local_id,
        )
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    const SALT: &[u8] = b"thisIsSpinalTap!";

    #[test]
    fn matches_salted_sha256_construction() {
        let strategy = ComputedIdStrategy::new(SALT).unwrap();
        let id = strategy
            .compute("https://idp.example.org", "https://sp.example.org", "jdoe")
            .unwrap();

        let mut hasher = Sha256::new();
        hasher.update(SALT);
        hasher.update(b"https://idp.example.org!https://sp.example.org!jdoe");
        assert_eq!(id, STANDARD.encode(hasher.finalize()));
        assert_eq!(id.len(), 44);
    }

    #[test]
    fn deterministic_and_pairwise() {
        let strategy = ComputedIdStrategy::new(SALT).unwrap();
        let a = strategy.compute("idp", "sp1", "jdoe").unwrap();
        let b = strategy.compute("idp", "sp1", "jdoe").unwrap();
        let c = strategy.compute("idp", "sp2", "jdoe").unwrap();
        let d = strategy.compute("idp", "sp1", "asmith").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn salt_changes_output() {
        let a = ComputedIdStrategy::new(SALT).unwrap();
        let b = ComputedIdStrategy::new(b"anotherSaltValue".as_slice()).unwrap();
        assert_ne!(
            a.compute("idp", "sp", "jdoe").unwrap(),
            b.compute("idp", "sp", "jdoe").unwrap()
        );
    }

    #[test]
    fn short_salt_is_rejected() {
        let err = ComputedIdStrategy::new(b"short".as_slice()).unwrap_err();
        assert!(matches!(err, PersistentIdError::Configuration(_)));
    }

    #[test]
    fn empty_inputs_are_rejected() {
        let strategy = ComputedIdStrategy::new(SALT).unwrap();
        assert!(matches!(
            strategy.compute("", "sp", "jdoe"),
            Err(PersistentIdError::MissingInput("issuer_id"))
        ));
        assert!(matches!(
            strategy.compute("idp", "", "jdoe"),
            Err(PersistentIdError::MissingInput("relying_party_id"))
        ));
        assert!(matches!(
            strategy.compute("idp", "sp", ""),
            Err(PersistentIdError::MissingInput("local_id"))
        ));
    }

    #[test]
    fn hmac_and_hex_options() {
        let strategy = ComputedIdStrategy::new(SALT)
            .unwrap()
            .with_algorithm(ComputedIdAlgorithm::HmacSha256)
            .with_encoding(IdEncoding::Hex);
        let id = strategy.compute("idp", "sp", "jdoe").unwrap();

        let mut mac = <HmacSha256 as Mac>::new_from_slice(SALT).unwrap();
        mac.update(b"idp!sp!jdoe");
        assert_eq!(id, hex::encode(mac.finalize().into_bytes()));
        assert_eq!(id.len(), 64);
    }

    #[test]
    #[allow(clippy::use_debug)]
    fn debug_redacts_salt() {
        let strategy = ComputedIdStrategy::new(SALT).unwrap();
        assert!(!format!("{strategy:?}").contains("SpinalTap"));
    }
}
