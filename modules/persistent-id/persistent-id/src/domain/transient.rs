//! Crypto transient identifiers: the relying party and principal name sealed
//! into a short-lived token. Nothing is stored; the token decodes back to the
//! principal for the relying party it was issued to.
//!
//! The sealed payload is `len(rp) "!" rp "!" principal`. The length prefix
//! keeps the split unambiguous when either part contains `!`.

use std::sync::Arc;
use std::time::Duration;

use data_sealer::DataSealer;
use tracing::debug;

use super::error::PersistentIdError;

const SEPARATOR: char = '!';

#[derive(Clone)]
pub struct CryptoTransientIdGenerator {
    sealer: Arc<DataSealer>,
    lifetime: Duration,
}

impl CryptoTransientIdGenerator {
    #[must_use]
    pub fn new(sealer: Arc<DataSealer>, lifetime: Duration) -> Self {
        Self { sealer, lifetime }
    }

    /// Uses the sealer's default token lifetime.
    #[must_use]
    pub fn with_default_lifetime(sealer: Arc<DataSealer>) -> Self {
        let lifetime = sealer.default_lifetime();
        Self::new(sealer, lifetime)
    }

    #[must_use]
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Seal `principal_name` for `relying_party_id`.
    ///
    /// # Errors
    ///
    /// Returns `MissingInput` for empty inputs, `Sealer` if sealing fails.
    pub fn generate(
        &self,
        relying_party_id: &str,
        principal_name: &str,
    ) -> Result<String, PersistentIdError> {
        if relying_party_id.is_empty() {
            return Err(PersistentIdError::MissingInput("relying_party_id"));
        }
        if principal_name.is_empty() {
            return Err(PersistentIdError::MissingInput("principal_name"));
        }
        let payload = format!(
            "{}{SEPARATOR}{relying_party_id}{SEPARATOR}{principal_name}",
            relying_party_id.len()
        );
        Ok(self.sealer.wrap_for(&payload, self.lifetime)?)
    }

    /// Recover the principal name from a token presented by `relying_party_id`.
    ///
    /// # Errors
    ///
    /// - `Sealer` if the token is malformed, tampered with or expired
    /// - `RelyingPartyMismatch` if it was issued to another relying party
    pub fn decode(
        &self,
        transient_id: &str,
        relying_party_id: &str,
    ) -> Result<String, PersistentIdError> {
        let payload = self.sealer.unwrap(transient_id)?;

        match split_payload(&payload).filter(|(rp, _)| *rp == relying_party_id) {
            Some((_, principal)) => Ok(principal.to_owned()),
            None => {
                debug!(relying_party_id, "transient id presented by another relying party");
                Err(PersistentIdError::RelyingPartyMismatch {
                    relying_party_id: relying_party_id.to_owned(),
                })
            }
        }
    }
}

/// Splits a sealed payload into relying party and principal name.
fn split_payload(payload: &str) -> Option<(&str, &str)> {
    let (len, rest) = payload.split_once(SEPARATOR)?;
    let len: usize = len.parse().ok()?;
    let relying_party = rest.get(..len)?;
    let principal = rest.get(len..)?.strip_prefix(SEPARATOR)?;
    (!principal.is_empty()).then_some((relying_party, principal))
}
