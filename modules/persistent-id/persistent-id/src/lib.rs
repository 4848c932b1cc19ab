#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Pairwise persistent identifiers.
//!
//! - [`ComputedIdStrategy`] - deterministic salted digest, nothing stored
//! - [`StoredIdStore`] - database-backed issuance with deactivation history
//! - [`CryptoTransientIdGenerator`] - short-lived sealed tokens
//!
//! [`PairwiseIdStore`] is the seam the attribute resolver consumes.

pub mod config;
pub mod domain;
pub mod infra;

pub use config::{
    CandidateSource, ComputedIdAlgorithm, ComputedIdConfig, IdEncoding, StoredIdConfig,
};
pub use domain::computed::{ComputedIdStrategy, MIN_SALT_LEN};
pub use domain::error::PersistentIdError;
pub use domain::model::{PairwiseIdRequest, PairwiseKey, PersistentIdEntry};
pub use domain::repo::PersistentIdRepository;
pub use domain::store::PairwiseIdStore;
pub use domain::stored::{DEFAULT_MAX_RETRIES, StoredIdStore};
pub use domain::transient::CryptoTransientIdGenerator;
pub use infra::storage::{Migrator, SeaOrmPersistentIdRepository};
