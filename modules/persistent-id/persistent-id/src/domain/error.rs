use data_sealer::SealerError;
use sea_orm::DbErr;

/// Errors raised by the persistent identifier subsystem.
#[derive(Debug, thiserror::Error)]
pub enum PersistentIdError {
    /// Invalid strategy or store configuration (e.g. a short salt).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A required input (issuer, relying party, local id) was empty.
    #[error("missing required input '{0}'")]
    MissingInput(&'static str),

    /// Every candidate value collided with an existing entry.
    #[error("no free persistent id after {attempts} attempts")]
    CollisionExhausted { attempts: u32 },

    /// A transient id was presented by a relying party it was not issued to.
    #[error("transient id was not issued to relying party '{relying_party_id}'")]
    RelyingPartyMismatch { relying_party_id: String },

    #[error("database error: {0}")]
    Database(#[from] DbErr),

    #[error(transparent)]
    Sealer(#[from] SealerError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl PersistentIdError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
