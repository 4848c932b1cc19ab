//! Domain errors for the attribute resolver.

use attribute_resolver_sdk::AttributeResolverError;
use data_sealer::SealerConfigError;
use persistent_id::PersistentIdError;

use super::lifecycle::LifecycleState;

/// Errors raised while configuring or initializing plugins and resolvers.
///
/// These block activation of the affected resolver.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("plugin '{plugin_id}': missing required parameter '{parameter}'")]
    MissingParameter {
        plugin_id: String,
        parameter: &'static str,
    },

    #[error("plugin '{plugin_id}': invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        plugin_id: String,
        parameter: &'static str,
        reason: String,
    },

    #[error("duplicate plugin id '{plugin_id}'")]
    DuplicatePlugin { plugin_id: String },

    #[error("plugin '{plugin_id}' depends on unknown plugin '{dependency}'")]
    UnknownDependency {
        plugin_id: String,
        dependency: String,
    },

    #[error("dependency cycle: {}", path.join(" -> "))]
    CyclicDependency { path: Vec<String> },

    #[error("plugin '{plugin_id}' cannot be configured in state {state}")]
    InvalidState {
        plugin_id: String,
        state: LifecycleState,
    },

    #[error("plugin '{plugin_id}': no {kind} registered under '{name}'")]
    UnknownCollaborator {
        plugin_id: String,
        kind: &'static str,
        name: String,
    },

    #[error(transparent)]
    PersistentId(#[from] PersistentIdError),

    #[error(transparent)]
    Sealer(#[from] SealerConfigError),
}

impl ConfigError {
    pub fn missing(plugin_id: &str, parameter: &'static str) -> Self {
        Self::MissingParameter {
            plugin_id: plugin_id.to_owned(),
            parameter,
        }
    }

    pub fn invalid(plugin_id: &str, parameter: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            plugin_id: plugin_id.to_owned(),
            parameter,
            reason: reason.into(),
        }
    }
}

/// Errors raised while resolving a request.
///
/// Unless the failing plugin (or a dependent) is marked to propagate errors,
/// the engine recovers from these by dropping the plugin's contribution.
#[derive(thiserror::Error, Debug)]
pub enum ResolutionError {
    #[error("plugin '{plugin_id}' failed: {reason}")]
    Plugin { plugin_id: String, reason: String },

    #[error("plugin '{plugin_id}' cannot handle {kind} values")]
    UnsupportedValue {
        plugin_id: String,
        kind: &'static str,
    },

    #[error("plugin '{plugin_id}' requires the {field} of the request")]
    MissingContext {
        plugin_id: String,
        field: &'static str,
    },

    #[error("plugin '{plugin_id}' depends on failed plugin '{dependency}'")]
    DependencyFailed {
        plugin_id: String,
        dependency: String,
    },

    #[error("dependency cycle detected at plugin '{plugin_id}'")]
    CyclicDependency { plugin_id: String },

    #[error("data connector '{plugin_id}' returned no attributes")]
    NoResult { plugin_id: String },

    #[error("plugin '{plugin_id}' cannot resolve in state {state}")]
    InvalidState {
        plugin_id: String,
        state: LifecycleState,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("resolution timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    #[error("resolver unavailable: {0}")]
    Unavailable(String),
}

impl ResolutionError {
    pub fn plugin(plugin_id: &str, reason: impl Into<String>) -> Self {
        Self::Plugin {
            plugin_id: plugin_id.to_owned(),
            reason: reason.into(),
        }
    }

    pub fn unsupported(plugin_id: &str, kind: &'static str) -> Self {
        Self::UnsupportedValue {
            plugin_id: plugin_id.to_owned(),
            kind,
        }
    }

    pub fn missing_context(plugin_id: &str, field: &'static str) -> Self {
        Self::MissingContext {
            plugin_id: plugin_id.to_owned(),
            field,
        }
    }

    /// Errors that abort the request no matter how the plugin is configured.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::CyclicDependency { .. }
                | Self::InvalidState { .. }
                | Self::InvalidRequest(_)
                | Self::Timeout { .. }
                | Self::Unavailable(_)
        )
    }

    /// Id of the plugin the error is attributed to, if any.
    #[must_use]
    pub fn plugin_id(&self) -> Option<&str> {
        match self {
            Self::Plugin { plugin_id, .. }
            | Self::UnsupportedValue { plugin_id, .. }
            | Self::MissingContext { plugin_id, .. }
            | Self::DependencyFailed { plugin_id, .. }
            | Self::CyclicDependency { plugin_id }
            | Self::NoResult { plugin_id }
            | Self::InvalidState { plugin_id, .. } => Some(plugin_id),
            Self::InvalidRequest(_) | Self::Timeout { .. } | Self::Unavailable(_) => None,
        }
    }
}

impl From<ResolutionError> for AttributeResolverError {
    fn from(e: ResolutionError) -> Self {
        match e {
            ResolutionError::InvalidRequest(msg) => Self::InvalidRequest(msg),
            ResolutionError::Timeout { timeout_ms } => Self::Timeout { timeout_ms },
            ResolutionError::Unavailable(msg) => Self::ServiceUnavailable(msg),
            ResolutionError::InvalidState { plugin_id, state } => {
                Self::ServiceUnavailable(format!("plugin '{plugin_id}' is {state}"))
            }
            other => {
                let reason = other.to_string();
                match other.plugin_id() {
                    Some(id) => Self::ResolutionFailed {
                        plugin_id: id.to_owned(),
                        reason,
                    },
                    None => Self::Internal(reason),
                }
            }
        }
    }
}
