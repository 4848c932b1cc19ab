use async_trait::async_trait;

use super::error::PersistentIdError;
use super::model::PairwiseIdRequest;

/// Source of pairwise identifiers consumed by the attribute resolver.
///
/// Implemented by [`ComputedIdStrategy`](super::computed::ComputedIdStrategy)
/// and [`StoredIdStore`](super::stored::StoredIdStore).
#[async_trait]
pub trait PairwiseIdStore: Send + Sync {
    /// Return the identifier for `request`, issuing one if none exists yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is incomplete or the backing store fails.
    async fn get_or_issue(&self, request: &PairwiseIdRequest) -> Result<String, PersistentIdError>;
}
