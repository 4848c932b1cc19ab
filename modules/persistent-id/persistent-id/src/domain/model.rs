use time::OffsetDateTime;

use super::error::PersistentIdError;

/// Input to pairwise identifier issuance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairwiseIdRequest {
    /// Identity provider entity id.
    pub issuer_id: String,
    /// Relying party entity id.
    pub relying_party_id: String,
    /// Principal name, recorded for administration only.
    pub principal_name: String,
    /// Principal's stable local identifier; the value the id is derived from.
    pub local_id: String,
}

impl PairwiseIdRequest {
    pub fn new(
        issuer_id: impl Into<String>,
        relying_party_id: impl Into<String>,
        principal_name: impl Into<String>,
        local_id: impl Into<String>,
    ) -> Self {
        Self {
            issuer_id: issuer_id.into(),
            relying_party_id: relying_party_id.into(),
            principal_name: principal_name.into(),
            local_id: local_id.into(),
        }
    }

    /// Rejects requests with an empty issuer, relying party or local id.
    ///
    /// # Errors
    ///
    /// Returns [`PersistentIdError::MissingInput`] naming the empty field.
    pub fn validate(&self) -> Result<(), PersistentIdError> {
        if self.issuer_id.is_empty() {
            return Err(PersistentIdError::MissingInput("issuer_id"));
        }
        if self.relying_party_id.is_empty() {
            return Err(PersistentIdError::MissingInput("relying_party_id"));
        }
        if self.local_id.is_empty() {
            return Err(PersistentIdError::MissingInput("local_id"));
        }
        Ok(())
    }

    #[must_use]
    pub fn key(&self) -> PairwiseKey<'_> {
        PairwiseKey {
            issuer_id: &self.issuer_id,
            relying_party_id: &self.relying_party_id,
            local_id: &self.local_id,
        }
    }
}

/// The (issuer, relying party, local id) triple an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairwiseKey<'a> {
    pub issuer_id: &'a str,
    pub relying_party_id: &'a str,
    pub local_id: &'a str,
}

/// One stored identifier row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistentIdEntry {
    pub persistent_id: String,
    pub issuer_id: String,
    pub relying_party_id: String,
    pub local_id: String,
    pub principal_name: String,
    pub peer_provided_id: Option<String>,
    pub creation_time: OffsetDateTime,
    pub deactivation_time: Option<OffsetDateTime>,
}

impl PersistentIdEntry {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.deactivation_time.is_none()
    }
}
