//! Configuration for the data sealer.

use secrecy::SecretString;
use serde::Deserialize;

fn default_token_lifetime_secs() -> u64 {
    600
}

/// Sealer configuration.
///
/// ```yaml
/// sealer:
///   current_version: "2"
///   token_lifetime_secs: 600
///   keys:
///     - version: "1"
///       cipher_key: "<base64, 32 bytes>"
///       mac_key: "<base64, 32 bytes>"
///     - version: "2"
///       cipher_key: "..."
///       mac_key: "..."
/// ```
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SealerConfig {
    /// Version used by `wrap`. Must name one of `keys`.
    pub current_version: String,

    /// All key versions that `unwrap` accepts, including retired ones.
    pub keys: Vec<SealerKeyConfig>,

    /// Lifetime applied by `DataSealer::wrap_for_default`.
    #[serde(default = "default_token_lifetime_secs")]
    pub token_lifetime_secs: u64,
}

/// One versioned key pair, both halves base64 (standard alphabet).
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SealerKeyConfig {
    pub version: String,
    /// AES-256 key, 32 bytes once decoded.
    pub cipher_key: SecretString,
    /// HMAC-SHA256 key, 32 bytes once decoded.
    pub mac_key: SecretString,
}
