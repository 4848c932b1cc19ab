use async_trait::async_trait;
use sea_orm::ConnectionTrait;
use time::OffsetDateTime;

use super::error::PersistentIdError;
use super::model::{PairwiseKey, PersistentIdEntry};

/// Persistence of issued identifiers.
///
/// Every method takes the connection (or transaction) to run on so the
/// service decides the transaction boundaries.
#[async_trait]
pub trait PersistentIdRepository: Send + Sync {
    /// The active entry for `key`, if any.
    async fn find_active<C: ConnectionTrait>(
        &self,
        conn: &C,
        key: PairwiseKey<'_>,
    ) -> Result<Option<PersistentIdEntry>, PersistentIdError>;

    /// The active entry carrying `persistent_id`, for any triple.
    async fn find_active_by_value<C: ConnectionTrait>(
        &self,
        conn: &C,
        persistent_id: &str,
    ) -> Result<Option<PersistentIdEntry>, PersistentIdError>;

    /// Number of entries (active or not) with `persistent_id` under the issuer / RP pair.
    async fn count_by_value<C: ConnectionTrait>(
        &self,
        conn: &C,
        issuer_id: &str,
        relying_party_id: &str,
        persistent_id: &str,
    ) -> Result<u64, PersistentIdError>;

    /// All entries for `key`, oldest first, including deactivated ones.
    async fn list<C: ConnectionTrait>(
        &self,
        conn: &C,
        key: PairwiseKey<'_>,
    ) -> Result<Vec<PersistentIdEntry>, PersistentIdError>;

    async fn count<C: ConnectionTrait>(
        &self,
        conn: &C,
        key: PairwiseKey<'_>,
    ) -> Result<u64, PersistentIdError>;

    /// Insert a new entry. A uniqueness violation surfaces as
    /// [`PersistentIdError::Database`].
    async fn insert<C: ConnectionTrait>(
        &self,
        conn: &C,
        entry: &PersistentIdEntry,
    ) -> Result<(), PersistentIdError>;

    /// Set the deactivation time of the active entry carrying `persistent_id`.
    /// Returns the number of rows changed.
    async fn deactivate<C: ConnectionTrait>(
        &self,
        conn: &C,
        persistent_id: &str,
        at: OffsetDateTime,
    ) -> Result<u64, PersistentIdError>;

    /// Record the peer-provided id on the active entry carrying `persistent_id`.
    /// Returns the number of rows changed.
    async fn set_peer_provided_id<C: ConnectionTrait>(
        &self,
        conn: &C,
        persistent_id: &str,
        peer_provided_id: &str,
    ) -> Result<u64, PersistentIdError>;
}
