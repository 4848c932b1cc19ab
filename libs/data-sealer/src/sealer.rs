//! Sealing and unsealing of opaque, expiring tokens.
//!
//! ## Token layout
//!
//! ```text
//! token      = key-version ":" base64url-nopad( iv(16) || AES-256-CBC(gzip(body)) )
//! body       = tag(32) || expiration(8, big-endian epoch millis) || UTF-8 payload
//! tag        = HMAC-SHA256(mac-key, iv || expiration || payload)
//! ```
//!
//! The tag covers the IV so that edits to bytes the decompressor would
//! otherwise ignore (gzip header fields) still fail authentication.

use std::io::{Read as _, Write as _};
use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut as _, BlockEncryptMut as _, KeyIvInit as _};
use flate2::Compression;
use flate2::bufread::GzDecoder;
use flate2::write::GzEncoder;
use hmac::{Hmac, Mac as _};
use sha2::Sha256;
use time::OffsetDateTime;

use crate::config::SealerConfig;
use crate::error::{SealerConfigError, SealerError};
use crate::key::{BasicKeyStrategy, KeyStrategy, SealerKey, VERSION_SEPARATOR};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// Initialization vector length (one AES block).
pub const IV_LEN: usize = 16;
/// Integrity tag length (HMAC-SHA256 output).
pub const TAG_LEN: usize = 32;
/// Longest payload `wrap` accepts, in bytes.
pub const MAX_PLAINTEXT_LEN: usize = 64 * 1024;
const EXPIRATION_LEN: usize = 8;
const BLOCK_LEN: usize = 16;
const MAX_BODY_LEN: usize = TAG_LEN + EXPIRATION_LEN + MAX_PLAINTEXT_LEN;

/// Issues and validates sealed tokens.
///
/// Key material is process-wide and read-only from the request path; the
/// sealer is cheap to share behind an `Arc`.
pub struct DataSealer {
    keys: Arc<dyn KeyStrategy>,
    default_lifetime: Duration,
}

impl DataSealer {
    #[must_use]
    pub fn new(keys: Arc<dyn KeyStrategy>) -> Self {
        Self {
            keys,
            default_lifetime: Duration::from_secs(600),
        }
    }

    /// Sets the lifetime used by [`Self::wrap_for_default`].
    #[must_use]
    pub fn with_default_lifetime(mut self, lifetime: Duration) -> Self {
        self.default_lifetime = lifetime;
        self
    }

    /// Builds a sealer over a [`BasicKeyStrategy`] loaded from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SealerConfigError`] if the key configuration is invalid.
    pub fn from_config(cfg: &SealerConfig) -> Result<Self, SealerConfigError> {
        let keys = BasicKeyStrategy::from_config(cfg)?;
        Ok(Self::new(Arc::new(keys))
            .with_default_lifetime(Duration::from_secs(cfg.token_lifetime_secs)))
    }

    #[must_use]
    pub fn default_lifetime(&self) -> Duration {
        self.default_lifetime
    }

    /// Seals `plaintext` until `expires_at_ms` (epoch milliseconds).
    ///
    /// # Errors
    ///
    /// - [`SealerError::EmptyPlaintext`] if `plaintext` is empty
    /// - [`SealerError::PlaintextTooLong`] above [`MAX_PLAINTEXT_LEN`] bytes
    /// - [`SealerError::Crypto`] if compression or encryption fails
    pub fn wrap(&self, plaintext: &str, expires_at_ms: i64) -> Result<String, SealerError> {
        if plaintext.is_empty() {
            return Err(SealerError::EmptyPlaintext);
        }
        if plaintext.len() > MAX_PLAINTEXT_LEN {
            return Err(SealerError::PlaintextTooLong {
                len: plaintext.len(),
                max: MAX_PLAINTEXT_LEN,
            });
        }

        let (version, key) = self.keys.current()?;
        let iv: [u8; IV_LEN] = rand::random();
        let payload = plaintext.as_bytes();

        let tag = compute_tag(&key, &iv, expires_at_ms, payload)?;
        let mut body = Vec::with_capacity(TAG_LEN + EXPIRATION_LEN + payload.len());
        body.extend_from_slice(&tag);
        body.extend_from_slice(&expires_at_ms.to_be_bytes());
        body.extend_from_slice(payload);

        let compressed = compress(&body)?;
        let ciphertext = Aes256CbcEnc::new_from_slices(key.cipher_key(), &iv)
            .map_err(|e| SealerError::Crypto(format!("cipher init: {e}")))?
            .encrypt_padded_vec_mut::<Pkcs7>(&compressed);

        let mut raw = Vec::with_capacity(IV_LEN + ciphertext.len());
        raw.extend_from_slice(&iv);
        raw.extend_from_slice(&ciphertext);

        tracing::trace!(key_version = %version, "Sealed token");
        Ok(format!(
            "{version}{VERSION_SEPARATOR}{}",
            URL_SAFE_NO_PAD.encode(raw)
        ))
    }

    /// Seals `plaintext` for `lifetime` from now.
    ///
    /// # Errors
    ///
    /// See [`Self::wrap`].
    pub fn wrap_for(&self, plaintext: &str, lifetime: Duration) -> Result<String, SealerError> {
        let lifetime_ms = i64::try_from(lifetime.as_millis()).unwrap_or(i64::MAX);
        self.wrap(plaintext, now_millis().saturating_add(lifetime_ms))
    }

    /// Seals `plaintext` for the configured default lifetime.
    ///
    /// # Errors
    ///
    /// See [`Self::wrap`].
    pub fn wrap_for_default(&self, plaintext: &str) -> Result<String, SealerError> {
        self.wrap_for(plaintext, self.default_lifetime)
    }

    /// Validates `token` and returns its payload.
    ///
    /// # Errors
    ///
    /// - [`SealerError::UnknownKeyVersion`] if the token's key version is not held
    /// - [`SealerError::Invalid`] on malformed, truncated or tampered input.
    ///   Every such failure carries the same reason; details go to the debug log.
    /// - [`SealerError::Expired`] if the token is authentic but expired
    pub fn unwrap(&self, token: &str) -> Result<String, SealerError> {
        self.unwrap_at(token, now_millis())
    }

    /// Like [`Self::unwrap`] but checks expiry against `now_ms`.
    ///
    /// # Errors
    ///
    /// See [`Self::unwrap`].
    pub fn unwrap_at(&self, token: &str, now_ms: i64) -> Result<String, SealerError> {
        let (version, encoded) = token
            .split_once(VERSION_SEPARATOR)
            .ok_or_else(|| rejected("missing key version"))?;
        let key = self.keys.key(version)?;

        let raw = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|e| rejected(format!("bad encoding: {e}")))?;
        if raw.len() < IV_LEN + BLOCK_LEN || (raw.len() - IV_LEN) % BLOCK_LEN != 0 {
            return Err(rejected("wrong length"));
        }
        let (iv, ciphertext) = raw.split_at(IV_LEN);

        let compressed = Aes256CbcDec::new_from_slices(key.cipher_key(), iv)
            .map_err(|e| SealerError::Crypto(format!("cipher init: {e}")))?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| rejected("bad padding"))?;
        let body = decompress(&compressed)?;

        if body.len() < TAG_LEN + EXPIRATION_LEN {
            return Err(rejected("body is truncated"));
        }
        let (tag, rest) = body.split_at(TAG_LEN);
        let (expiration, payload) = rest.split_at(EXPIRATION_LEN);
        let expires_at_ms = <[u8; EXPIRATION_LEN]>::try_from(expiration)
            .map(i64::from_be_bytes)
            .map_err(|_| rejected("body is truncated"))?;

        verify_tag(&key, iv, expires_at_ms, payload, tag)?;

        if now_ms > expires_at_ms {
            return Err(SealerError::Expired {
                expired_at_ms: expires_at_ms,
                now_ms,
            });
        }

        String::from_utf8(payload.to_vec()).map_err(|_| rejected("payload is not UTF-8"))
    }
}

/// Failures before the tag is verified must all look alike to the caller,
/// otherwise the token format becomes a padding oracle.
fn rejected(detail: impl Into<String>) -> SealerError {
    let detail: String = detail.into();
    tracing::debug!(%detail, "Sealed token rejected");
    SealerError::invalid("token rejected")
}

fn mac_for(
    key: &SealerKey,
    iv: &[u8],
    expires_at_ms: i64,
    payload: &[u8],
) -> Result<HmacSha256, SealerError> {
    let mut mac = HmacSha256::new_from_slice(key.mac_key())
        .map_err(|e| SealerError::Crypto(format!("mac init: {e}")))?;
    mac.update(iv);
    mac.update(&expires_at_ms.to_be_bytes());
    mac.update(payload);
    Ok(mac)
}

fn compute_tag(
    key: &SealerKey,
    iv: &[u8],
    expires_at_ms: i64,
    payload: &[u8],
) -> Result<[u8; TAG_LEN], SealerError> {
    let digest = mac_for(key, iv, expires_at_ms, payload)?
        .finalize()
        .into_bytes();
    let mut tag = [0u8; TAG_LEN];
    tag.copy_from_slice(&digest);
    Ok(tag)
}

fn verify_tag(
    key: &SealerKey,
    iv: &[u8],
    expires_at_ms: i64,
    payload: &[u8],
    tag: &[u8],
) -> Result<(), SealerError> {
    // verify_slice compares in constant time
    mac_for(key, iv, expires_at_ms, payload)?
        .verify_slice(tag)
        .map_err(|_| rejected("integrity check failed"))
}

fn compress(body: &[u8]) -> Result<Vec<u8>, SealerError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(body)
        .map_err(|e| SealerError::Crypto(format!("compression: {e}")))?;
    encoder
        .finish()
        .map_err(|e| SealerError::Crypto(format!("compression: {e}")))
}

fn decompress(compressed: &[u8]) -> Result<Vec<u8>, SealerError> {
    let mut out = Vec::new();
    let mut decoder = GzDecoder::new(compressed);
    // One byte past the limit tells an oversized body from one that fits exactly.
    (&mut decoder)
        .take(u64::try_from(MAX_BODY_LEN).unwrap_or(u64::MAX).saturating_add(1))
        .read_to_end(&mut out)
        .map_err(|e| rejected(format!("decompression failed: {e}")))?;
    if out.len() > MAX_BODY_LEN {
        return Err(rejected("decompressed body is too large"));
    }
    if !decoder.into_inner().is_empty() {
        return Err(rejected("trailing data after compressed body"));
    }
    Ok(out)
}

/// Current wall-clock time in epoch milliseconds.
#[must_use]
pub fn now_millis() -> i64 {
    let now = OffsetDateTime::now_utc();
    now.unix_timestamp()
        .saturating_mul(1000)
        .saturating_add(i64::from(now.millisecond()))
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn sealer() -> DataSealer {
        let keys =
            BasicKeyStrategy::new("1", vec![("1".to_owned(), SealerKey::generate())]).unwrap();
        DataSealer::new(Arc::new(keys))
    }

    fn decode(token: &str) -> (String, Vec<u8>) {
        let (version, body) = token.split_once(':').unwrap();
        (version.to_owned(), URL_SAFE_NO_PAD.decode(body).unwrap())
    }

    fn encode(version: &str, raw: &[u8]) -> String {
        format!("{version}:{}", URL_SAFE_NO_PAD.encode(raw))
    }

    #[test]
    fn round_trip_before_expiry() {
        let sealer = sealer();
        let token = sealer.wrap("alice!https://sp.example.org", 2_000).unwrap();
        assert!(token.starts_with("1:"));
        assert_eq!(
            sealer.unwrap_at(&token, 1_000).unwrap(),
            "alice!https://sp.example.org"
        );
        // expiry is inclusive
        assert!(sealer.unwrap_at(&token, 2_000).is_ok());
    }

    #[test]
    fn expired_token_is_distinguishable() {
        let sealer = sealer();
        let token = sealer.wrap("payload", 2_000).unwrap();
        let err = sealer.unwrap_at(&token, 2_001).unwrap_err();
        assert!(err.is_expired(), "unexpected error: {err}");
    }

    #[test]
    fn empty_plaintext_is_a_precondition_violation() {
        let err = sealer().wrap("", 2_000).unwrap_err();
        assert!(matches!(err, SealerError::EmptyPlaintext));
    }

    #[test]
    fn same_plaintext_produces_distinct_tokens() {
        let sealer = sealer();
        let a = sealer.wrap("payload", 2_000).unwrap();
        let b = sealer.wrap("payload", 2_000).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    #[allow(clippy::use_debug)]
    fn every_single_byte_flip_is_rejected() {
        let sealer = sealer();
        let token = sealer.wrap("a reasonably long payload value", 2_000).unwrap();
        let (version, raw) = decode(&token);

        for i in 0..raw.len() {
            let mut tampered = raw.clone();
            tampered[i] ^= 0x01;
            let result = sealer.unwrap_at(&encode(&version, &tampered), 1_000);
            match result {
                Err(SealerError::Invalid { .. }) => {}
                other => panic!("byte {i}: expected Invalid, got {other:?}"),
            }
        }
    }

    #[test]
    #[allow(clippy::use_debug)]
    fn truncated_tokens_are_rejected() {
        let sealer = sealer();
        let token = sealer.wrap("payload", 2_000).unwrap();
        let (version, raw) = decode(&token);

        for len in [0, 1, IV_LEN, IV_LEN + 1, raw.len() - 1] {
            let result = sealer.unwrap_at(&encode(&version, &raw[..len]), 1_000);
            assert!(
                matches!(result, Err(SealerError::Invalid { .. })),
                "len {len}: {result:?}"
            );
        }
        assert!(matches!(
            sealer.unwrap_at("no-separator", 1_000),
            Err(SealerError::Invalid { .. })
        ));
    }

    /// Encrypts `plaintext` (already block-aligned) with no padding, as an
    /// attacker probing the padding check would.
    fn raw_token(key: &SealerKey, plaintext: &[u8]) -> String {
        use cbc::cipher::block_padding::NoPadding;

        let iv = [7u8; IV_LEN];
        let ciphertext = Aes256CbcEnc::new_from_slices(key.cipher_key(), &iv)
            .unwrap()
            .encrypt_padded_vec_mut::<NoPadding>(plaintext);
        let mut raw = iv.to_vec();
        raw.extend_from_slice(&ciphertext);
        encode("1", &raw)
    }

    #[test]
    fn rejections_before_the_tag_check_are_indistinguishable() {
        let key = SealerKey::generate();
        let keys = BasicKeyStrategy::new("1", vec![("1".to_owned(), key.clone())]).unwrap();
        let sealer = DataSealer::new(Arc::new(keys));

        // Last byte 0 is never valid PKCS#7 padding.
        let bad_padding = raw_token(&key, &[0u8; 2 * BLOCK_LEN]);

        // Well-padded garbage that is not gzip.
        let mut not_gzip = vec![0xAB; BLOCK_LEN];
        not_gzip.extend_from_slice(&[u8::try_from(BLOCK_LEN).unwrap(); BLOCK_LEN]);
        let bad_compression = raw_token(&key, &not_gzip);

        // Valid framing with a wrong tag.
        let mut body = vec![0u8; TAG_LEN];
        body.extend_from_slice(&2_000i64.to_be_bytes());
        body.extend_from_slice(b"payload");
        let mut padded = compress(&body).unwrap();
        let pad = BLOCK_LEN - padded.len() % BLOCK_LEN;
        padded.extend(std::iter::repeat_n(u8::try_from(pad).unwrap(), pad));
        let bad_tag = raw_token(&key, &padded);

        let errors: Vec<String> = [bad_padding, bad_compression, bad_tag]
            .iter()
            .map(|t| {
                let err = sealer.unwrap_at(t, 1_000).unwrap_err();
                assert!(matches!(err, SealerError::Invalid { .. }));
                err.to_string()
            })
            .collect();
        assert_eq!(errors[0], errors[1]);
        assert_eq!(errors[1], errors[2]);
    }

    #[test]
    fn oversized_bodies_are_rejected() {
        let key = SealerKey::generate();
        let keys = BasicKeyStrategy::new("1", vec![("1".to_owned(), key.clone())]).unwrap();
        let sealer = DataSealer::new(Arc::new(keys));

        // Zeros compress well, so a small token can inflate past the limit.
        let mut padded = compress(&vec![0u8; MAX_BODY_LEN + 1]).unwrap();
        let pad = BLOCK_LEN - padded.len() % BLOCK_LEN;
        padded.extend(std::iter::repeat_n(u8::try_from(pad).unwrap(), pad));
        let err = sealer.unwrap_at(&raw_token(&key, &padded), 1_000).unwrap_err();
        assert!(matches!(err, SealerError::Invalid { .. }));

        let long = "x".repeat(MAX_PLAINTEXT_LEN + 1);
        assert!(matches!(
            sealer.wrap(&long, 2_000),
            Err(SealerError::PlaintextTooLong { .. })
        ));
    }

    #[test]
    fn unknown_version_is_rejected() {
        let sealer = sealer();
        let token = sealer.wrap("payload", 2_000).unwrap();
        let forged = token.replacen("1:", "7:", 1);
        assert!(matches!(
            sealer.unwrap_at(&forged, 1_000),
            Err(SealerError::UnknownKeyVersion { .. })
        ));
    }

    #[test]
    fn token_from_another_key_fails_integrity() {
        let a = sealer();
        let b = sealer();
        let token = a.wrap("payload", 2_000).unwrap();
        assert!(matches!(
            b.unwrap_at(&token, 1_000),
            Err(SealerError::Invalid { .. })
        ));
    }

    #[test]
    fn wrap_for_uses_wall_clock() {
        let sealer = sealer().with_default_lifetime(Duration::from_secs(60));
        let token = sealer.wrap_for_default("payload").unwrap();
        assert_eq!(sealer.unwrap(&token).unwrap(), "payload");
        assert_eq!(sealer.default_lifetime(), Duration::from_secs(60));
    }
}
