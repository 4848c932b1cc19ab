//! Versioned key material.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use parking_lot::Mutex;
use secrecy::ExposeSecret;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::config::SealerConfig;
use crate::error::{SealerConfigError, SealerError};

/// AES-256 key length in bytes.
pub const CIPHER_KEY_LEN: usize = 32;

/// HMAC-SHA256 key length in bytes.
pub const MAC_KEY_LEN: usize = 32;

/// Separates the key version from the encoded body in a sealed token.
pub(crate) const VERSION_SEPARATOR: char = ':';

/// A cipher key and a MAC key sharing one version label.
///
/// Key bytes are wiped on drop and never printed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SealerKey {
    cipher_key: [u8; CIPHER_KEY_LEN],
    mac_key: [u8; MAC_KEY_LEN],
}

impl SealerKey {
    #[must_use]
    pub fn new(cipher_key: [u8; CIPHER_KEY_LEN], mac_key: [u8; MAC_KEY_LEN]) -> Self {
        Self {
            cipher_key,
            mac_key,
        }
    }

    /// Generates a fresh random key pair.
    #[must_use]
    pub fn generate() -> Self {
        Self::new(rand::random(), rand::random())
    }

    pub(crate) fn cipher_key(&self) -> &[u8] {
        &self.cipher_key
    }

    pub(crate) fn mac_key(&self) -> &[u8] {
        &self.mac_key
    }
}

impl fmt::Debug for SealerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SealerKey").finish_non_exhaustive()
    }
}

/// Source of versioned keys for a [`crate::DataSealer`].
///
/// `wrap` always uses [`KeyStrategy::current`]; `unwrap` looks up whatever
/// version the token names so tokens issued before a rotation stay readable.
pub trait KeyStrategy: Send + Sync {
    /// Returns the current version label and its key.
    ///
    /// # Errors
    ///
    /// Returns [`SealerError::UnknownKeyVersion`] if the current version has
    /// no key behind it.
    fn current(&self) -> Result<(String, Arc<SealerKey>), SealerError>;

    /// Returns the key for `version`.
    ///
    /// # Errors
    ///
    /// Returns [`SealerError::UnknownKeyVersion`] if the version is not held.
    fn key(&self, version: &str) -> Result<Arc<SealerKey>, SealerError>;
}

struct KeyRing {
    current: String,
    keys: HashMap<String, Arc<SealerKey>>,
}

/// In-memory key strategy with support for explicit rotation.
///
/// Readers never block: the key ring is swapped atomically, and rotations
/// are serialized against each other.
pub struct BasicKeyStrategy {
    ring: ArcSwap<KeyRing>,
    rotate_lock: Mutex<()>,
}

impl BasicKeyStrategy {
    /// Builds a strategy from versioned keys.
    ///
    /// # Errors
    ///
    /// - [`SealerConfigError::NoKeys`] if `keys` is empty
    /// - [`SealerConfigError::DuplicateVersion`] if a version repeats
    /// - [`SealerConfigError::InvalidKey`] if a version label is empty or contains `:`
    /// - [`SealerConfigError::MissingCurrentKey`] if `current_version` is not among `keys`
    pub fn new(
        current_version: impl Into<String>,
        keys: impl IntoIterator<Item = (String, SealerKey)>,
    ) -> Result<Self, SealerConfigError> {
        let current = current_version.into();
        let mut map = HashMap::new();
        for (version, key) in keys {
            validate_version(&version)?;
            if map.insert(version.clone(), Arc::new(key)).is_some() {
                return Err(SealerConfigError::DuplicateVersion { version });
            }
        }
        if map.is_empty() {
            return Err(SealerConfigError::NoKeys);
        }
        if !map.contains_key(&current) {
            return Err(SealerConfigError::MissingCurrentKey { version: current });
        }

        Ok(Self {
            ring: ArcSwap::from_pointee(KeyRing { current, keys: map }),
            rotate_lock: Mutex::new(()),
        })
    }

    /// Builds a strategy from [`SealerConfig`], decoding base64 key material.
    ///
    /// # Errors
    ///
    /// Returns [`SealerConfigError`] if a key does not decode to the expected
    /// length or the version set is inconsistent (see [`Self::new`]).
    pub fn from_config(cfg: &SealerConfig) -> Result<Self, SealerConfigError> {
        let mut keys = Vec::with_capacity(cfg.keys.len());
        for k in &cfg.keys {
            let cipher_key =
                decode_key::<CIPHER_KEY_LEN>(&k.version, k.cipher_key.expose_secret())?;
            let mac_key = decode_key::<MAC_KEY_LEN>(&k.version, k.mac_key.expose_secret())?;
            keys.push((k.version.clone(), SealerKey::new(cipher_key, mac_key)));
        }
        Self::new(cfg.current_version.clone(), keys)
    }

    /// Installs `key` under `version` and makes it current.
    ///
    /// Previously installed versions stay available for `unwrap`.
    ///
    /// # Errors
    ///
    /// Returns [`SealerConfigError::DuplicateVersion`] if `version` already
    /// exists, or [`SealerConfigError::InvalidKey`] for a malformed label.
    pub fn rotate(
        &self,
        version: impl Into<String>,
        key: SealerKey,
    ) -> Result<(), SealerConfigError> {
        let version = version.into();
        validate_version(&version)?;

        let _guard = self.rotate_lock.lock();
        let old = self.ring.load();
        if old.keys.contains_key(&version) {
            return Err(SealerConfigError::DuplicateVersion { version });
        }
        let mut keys = old.keys.clone();
        keys.insert(version.clone(), Arc::new(key));
        self.ring.store(Arc::new(KeyRing {
            current: version.clone(),
            keys,
        }));
        tracing::info!(key_version = %version, "Rotated data sealer key");
        Ok(())
    }

    /// Returns every held key version, sorted.
    #[must_use]
    pub fn versions(&self) -> Vec<String> {
        let mut versions: Vec<String> = self.ring.load().keys.keys().cloned().collect();
        versions.sort();
        versions
    }
}

impl KeyStrategy for BasicKeyStrategy {
    fn current(&self) -> Result<(String, Arc<SealerKey>), SealerError> {
        let ring = self.ring.load();
        let key = self.key(&ring.current)?;
        Ok((ring.current.clone(), key))
    }

    fn key(&self, version: &str) -> Result<Arc<SealerKey>, SealerError> {
        self.ring
            .load()
            .keys
            .get(version)
            .cloned()
            .ok_or_else(|| SealerError::UnknownKeyVersion {
                version: version.to_owned(),
            })
    }
}

fn validate_version(version: &str) -> Result<(), SealerConfigError> {
    if version.is_empty() {
        return Err(SealerConfigError::invalid_key(version, "version label is empty"));
    }
    if version.contains(VERSION_SEPARATOR) {
        return Err(SealerConfigError::invalid_key(
            version,
            format!("version label must not contain '{VERSION_SEPARATOR}'"),
        ));
    }
    Ok(())
}

fn decode_key<const N: usize>(version: &str, encoded: &str) -> Result<[u8; N], SealerConfigError> {
    let mut bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| SealerConfigError::invalid_key(version, format!("bad base64: {e}")))?;
    let result = <[u8; N]>::try_from(bytes.as_slice()).map_err(|_| {
        SealerConfigError::invalid_key(
            version,
            format!("expected {N} bytes, got {}", bytes.len()),
        )
    });
    bytes.zeroize();
    result
}
