#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Data Sealer
//!
//! Authenticated encryption of short strings into opaque, time-limited
//! tokens. Used for crypto transient identifiers and any other state an
//! identity provider hands out and must later trust again.
//!
//! - [`DataSealer`] - `wrap` / `unwrap`
//! - [`KeyStrategy`] / [`BasicKeyStrategy`] - versioned keys with rotation
//! - [`SealerError`] - tampering vs. expiry, kept distinguishable
//!
//! ```ignore
//! let sealer = DataSealer::from_config(&cfg)?;
//! let token = sealer.wrap_for("alice", Duration::from_secs(300))?;
//! assert_eq!(sealer.unwrap(&token)?, "alice");
//! ```

pub mod config;
pub mod error;
pub mod key;
pub mod sealer;

pub use config::{SealerConfig, SealerKeyConfig};
pub use error::{SealerConfigError, SealerError};
pub use key::{BasicKeyStrategy, KeyStrategy, SealerKey};
pub use sealer::{DataSealer, MAX_PLAINTEXT_LEN, now_millis};
