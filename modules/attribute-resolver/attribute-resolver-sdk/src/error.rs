//! Error types for the attribute resolver API.

use thiserror::Error;

/// Errors returned to consumers of [`crate::AttributeResolverClient`].
///
/// Failures of individual, non-strict plugins never surface here; they only
/// show up as missing attributes in the result.
#[derive(Debug, Error)]
pub enum AttributeResolverError {
    /// The request lacked data the resolver needs (e.g. a principal).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A plugin marked to propagate errors failed, failing the whole request.
    #[error("resolution failed in plugin '{plugin_id}': {reason}")]
    ResolutionFailed { plugin_id: String, reason: String },

    /// The caller-imposed deadline elapsed.
    #[error("resolution timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    /// No initialized resolver is active.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}
