//! Stored pairwise identifiers.
//!
//! Issued values live in the `persistent_ids` table. At most one entry per
//! (issuer, relying party, local id) is active at a time. A partial unique
//! index enforces this, so several stores may share one database.
//! Deactivated entries are kept and their values are never handed out again
//! under the same issuer / relying party pair.

use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr, SqlErr, TransactionTrait};
use sea_orm_migration::MigratorTrait;
use time::OffsetDateTime;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::computed::ComputedIdStrategy;
use super::error::PersistentIdError;
use super::model::{PairwiseIdRequest, PersistentIdEntry};
use super::repo::PersistentIdRepository;
use super::store::PairwiseIdStore;
use crate::config::{CandidateSource, StoredIdConfig};
use crate::infra::storage::{Migrator, SeaOrmPersistentIdRepository};

pub const DEFAULT_MAX_RETRIES: u32 = 3;

enum Attempt {
    Issued(String),
    Existing(String),
    Collision,
}

pub struct StoredIdStore<R: PersistentIdRepository = SeaOrmPersistentIdRepository> {
    db: DatabaseConnection,
    repo: Arc<R>,
    computed: Option<ComputedIdStrategy>,
    max_retries: u32,
    // Serializes mutations within the process. Across processes the partial
    // unique index on the active triple decides the winner.
    write_lock: tokio::sync::Mutex<()>,
}

impl StoredIdStore<SeaOrmPersistentIdRepository> {
    /// Connect to the configured database and build the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or migrations fail, or if the
    /// computed candidate source (the default) has no valid `computed` section.
    pub async fn connect(cfg: &StoredIdConfig) -> Result<Self, PersistentIdError> {
        let computed = match (cfg.candidate, cfg.computed.as_ref()) {
            (CandidateSource::Computed, Some(c)) => Some(ComputedIdStrategy::from_config(c)?),
            (CandidateSource::Computed, None) => {
                return Err(PersistentIdError::configuration(
                    "stored ids need a computed section unless candidate = random",
                ));
            }
            (CandidateSource::Random, _) => None,
        };

        let mut opts = ConnectOptions::new(cfg.dsn.clone());
        opts.max_connections(cfg.max_connections.max(1))
            .sqlx_logging(false);
        let db = Database::connect(opts).await?;
        if cfg.run_migrations {
            Migrator::up(&db, None).await?;
        }

        let mut store = Self::new(db, Arc::new(SeaOrmPersistentIdRepository::new()))
            .with_max_retries(cfg.max_retries);
        store.computed = computed;
        Ok(store)
    }
}

impl<R: PersistentIdRepository> StoredIdStore<R> {
    #[must_use]
    pub fn new(db: DatabaseConnection, repo: Arc<R>) -> Self {
        Self {
            db,
            repo,
            computed: None,
            max_retries: DEFAULT_MAX_RETRIES,
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Use `strategy` for the first candidate instead of a random UUID.
    #[must_use]
    pub fn with_computed_strategy(mut self, strategy: ComputedIdStrategy) -> Self {
        self.computed = Some(strategy);
        self
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Return the active identifier for the request's triple, issuing a new
    /// one if none is active.
    ///
    /// # Errors
    ///
    /// - `MissingInput` if issuer, relying party or local id is empty
    /// - `CollisionExhausted` if every candidate collided
    /// - `Database` on storage failure
    #[instrument(
        skip_all,
        fields(issuer = %request.issuer_id, relying_party = %request.relying_party_id)
    )]
    pub async fn get_or_issue(
        &self,
        request: &PairwiseIdRequest,
    ) -> Result<String, PersistentIdError> {
        request.validate()?;

        if let Some(existing) = self.repo.find_active(&self.db, request.key()).await? {
            return Ok(existing.persistent_id);
        }

        let _guard = self.write_lock.lock().await;
        let attempts = self.max_retries.saturating_add(1);
        for attempt in 0..attempts {
            let candidate = self.candidate(request, attempt)?;
            match self.try_issue(request, candidate).await? {
                Attempt::Issued(value) => {
                    info!(attempt, "issued new persistent id");
                    return Ok(value);
                }
                Attempt::Existing(value) => {
                    debug!(attempt, "another writer issued the id first");
                    return Ok(value);
                }
                Attempt::Collision => {
                    warn!(attempt, "persistent id candidate collided, regenerating");
                }
            }
        }
        Err(PersistentIdError::CollisionExhausted { attempts })
    }

    fn candidate(
        &self,
        request: &PairwiseIdRequest,
        attempt: u32,
    ) -> Result<String, PersistentIdError> {
        match (&self.computed, attempt) {
            (Some(strategy), 0) => strategy.compute(
                &request.issuer_id,
                &request.relying_party_id,
                &request.local_id,
            ),
            _ => Ok(Uuid::new_v4().to_string()),
        }
    }

    async fn try_issue(
        &self,
        request: &PairwiseIdRequest,
        candidate: String,
    ) -> Result<Attempt, PersistentIdError> {
        let txn = self.db.begin().await?;

        if let Some(existing) = self.repo.find_active(&txn, request.key()).await? {
            txn.commit().await?;
            return Ok(Attempt::Existing(existing.persistent_id));
        }

        let taken = self
            .repo
            .count_by_value(&txn, &request.issuer_id, &request.relying_party_id, &candidate)
            .await?
            > 0
            || self.repo.find_active_by_value(&txn, &candidate).await?.is_some();
        if taken {
            txn.rollback().await?;
            return Ok(Attempt::Collision);
        }

        let entry = PersistentIdEntry {
            persistent_id: candidate,
            issuer_id: request.issuer_id.clone(),
            relying_party_id: request.relying_party_id.clone(),
            local_id: request.local_id.clone(),
            principal_name: request.principal_name.clone(),
            peer_provided_id: None,
            creation_time: OffsetDateTime::now_utc(),
            deactivation_time: None,
        };

        match self.repo.insert(&txn, &entry).await {
            Ok(()) => {
                txn.commit().await?;
                Ok(Attempt::Issued(entry.persistent_id))
            }
            Err(PersistentIdError::Database(e)) if is_unique_violation(&e) => {
                txn.rollback().await?;
                // Either the value is taken or another writer activated an entry
                // for this triple first.
                match self.repo.find_active(&self.db, request.key()).await? {
                    Some(existing) => Ok(Attempt::Existing(existing.persistent_id)),
                    None => Ok(Attempt::Collision),
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Deactivate the active entry carrying `persistent_id` as of `at`
    /// (default: now). Returns `false` if there was no active entry.
    ///
    /// # Errors
    ///
    /// Returns `Database` on storage failure.
    #[instrument(skip_all)]
    pub async fn deactivate(
        &self,
        persistent_id: &str,
        at: Option<OffsetDateTime>,
    ) -> Result<bool, PersistentIdError> {
        let _guard = self.write_lock.lock().await;
        let at = at.unwrap_or_else(OffsetDateTime::now_utc);
        let changed = self.repo.deactivate(&self.db, persistent_id, at).await?;
        if changed == 0 {
            debug!("no active entry to deactivate");
        }
        Ok(changed > 0)
    }

    /// Record the identifier a peer supplied for this entry.
    /// Returns `false` if there was no active entry.
    ///
    /// # Errors
    ///
    /// Returns `Database` on storage failure.
    pub async fn attach_peer_provided_id(
        &self,
        persistent_id: &str,
        peer_provided_id: &str,
    ) -> Result<bool, PersistentIdError> {
        let _guard = self.write_lock.lock().await;
        let changed = self
            .repo
            .set_peer_provided_id(&self.db, persistent_id, peer_provided_id)
            .await?;
        Ok(changed > 0)
    }

    /// # Errors
    ///
    /// Returns `Database` on storage failure.
    pub async fn find_active_by_value(
        &self,
        persistent_id: &str,
    ) -> Result<Option<PersistentIdEntry>, PersistentIdError> {
        self.repo.find_active_by_value(&self.db, persistent_id).await
    }

    /// # Errors
    ///
    /// Returns `Database` on storage failure.
    pub async fn find_active(
        &self,
        request: &PairwiseIdRequest,
    ) -> Result<Option<PersistentIdEntry>, PersistentIdError> {
        self.repo.find_active(&self.db, request.key()).await
    }

    /// Every entry for the request's triple, including deactivated ones.
    ///
    /// # Errors
    ///
    /// Returns `Database` on storage failure.
    pub async fn list(
        &self,
        request: &PairwiseIdRequest,
    ) -> Result<Vec<PersistentIdEntry>, PersistentIdError> {
        self.repo.list(&self.db, request.key()).await
    }

    /// # Errors
    ///
    /// Returns `Database` on storage failure.
    pub async fn count(&self, request: &PairwiseIdRequest) -> Result<u64, PersistentIdError> {
        self.repo.count(&self.db, request.key()).await
    }
}

fn is_unique_violation(e: &DbErr) -> bool {
    matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

#[async_trait]
impl<R: PersistentIdRepository> PairwiseIdStore for StoredIdStore<R> {
    async fn get_or_issue(&self, request: &PairwiseIdRequest) -> Result<String, PersistentIdError> {
        StoredIdStore::get_or_issue(self, request).await
    }
}
