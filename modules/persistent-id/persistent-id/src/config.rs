use secrecy::SecretString;
use serde::Deserialize;

/// Hash construction used by the computed strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComputedIdAlgorithm {
    /// `SHA-256(salt || issuer || "!" || rp || "!" || local_id)`
    #[default]
    Sha256,
    /// `HMAC-SHA-256(key = salt, issuer || "!" || rp || "!" || local_id)`
    HmacSha256,
}

/// Output encoding of the digest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdEncoding {
    /// Standard base64 with padding.
    #[default]
    Base64,
    /// Lowercase hex.
    Hex,
}

/// Configuration of the computed (salted hash) strategy.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComputedIdConfig {
    /// Secret salt; its UTF-8 bytes are mixed into the digest. At least 16 bytes.
    pub salt: SecretString,
    #[serde(default)]
    pub algorithm: ComputedIdAlgorithm,
    #[serde(default)]
    pub encoding: IdEncoding,
}

/// Where the stored strategy gets the first candidate value from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    /// Use the computed strategy (requires `computed`).
    #[default]
    Computed,
    /// Use a random UUID.
    Random,
}

/// Configuration of the stored (database-backed) strategy.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoredIdConfig {
    /// Database URL, e.g. `sqlite://ids.db?mode=rwc` or `postgres://...`.
    pub dsn: String,
    pub max_connections: u32,
    /// Run the bundled schema migrations on connect.
    pub run_migrations: bool,
    /// Extra attempts with a fresh random value after a collision.
    pub max_retries: u32,
    pub candidate: CandidateSource,
    pub computed: Option<ComputedIdConfig>,
}

impl Default for StoredIdConfig {
    fn default() -> Self {
        Self {
            dsn: "sqlite::memory:".to_owned(),
            max_connections: 1,
            run_migrations: true,
            max_retries: 3,
            candidate: CandidateSource::default(),
            computed: None,
        }
    }
}
