//! Plugin model: dependencies, activation conditions and the closed set of
//! plugin kinds.

use std::collections::HashSet;

use attribute_resolver_sdk::ResolutionContext;

use super::connectors::DataConnector;
use super::definitions::AttributeDefinition;
use super::lifecycle::Lifecycle;

/// Reference from a plugin to one of its inputs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dependency {
    plugin_id: String,
    attribute_id: Option<String>,
}

impl Dependency {
    /// Depend on the attribute produced by another definition, or on the
    /// data connector attribute named like the depending plugin.
    #[must_use]
    pub fn on(plugin_id: impl Into<String>) -> Self {
        Self {
            plugin_id: plugin_id.into(),
            attribute_id: None,
        }
    }

    /// Depend on one named attribute of a data connector.
    #[must_use]
    pub fn attribute(plugin_id: impl Into<String>, attribute_id: impl Into<String>) -> Self {
        Self {
            plugin_id: plugin_id.into(),
            attribute_id: Some(attribute_id.into()),
        }
    }

    #[must_use]
    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    #[must_use]
    pub fn attribute_id(&self) -> Option<&str> {
        self.attribute_id.as_deref()
    }
}

/// Decides per request whether a plugin takes part in resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ActivationCondition {
    #[default]
    Always,
    RelyingPartyIn(HashSet<String>),
    IssuerIn(HashSet<String>),
    PrincipalIn(HashSet<String>),
}

impl ActivationCondition {
    #[must_use]
    pub fn is_active(&self, ctx: &ResolutionContext) -> bool {
        match self {
            Self::Always => true,
            Self::RelyingPartyIn(ids) => ctx
                .attribute_recipient_id()
                .is_some_and(|rp| ids.contains(rp)),
            Self::IssuerIn(ids) => ctx
                .attribute_issuer_id()
                .is_some_and(|issuer| ids.contains(issuer)),
            Self::PrincipalIn(names) => names.contains(ctx.principal()),
        }
    }
}

/// A resolver plugin.
pub enum Plugin {
    Definition(AttributeDefinition),
    Connector(DataConnector),
}

impl Plugin {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Definition(d) => d.id(),
            Self::Connector(c) => c.id(),
        }
    }

    #[must_use]
    pub fn dependencies(&self) -> &[Dependency] {
        match self {
            Self::Definition(d) => d.dependencies(),
            Self::Connector(c) => c.dependencies(),
        }
    }

    #[must_use]
    pub fn propagate_errors(&self) -> bool {
        match self {
            Self::Definition(d) => d.propagates_errors(),
            Self::Connector(c) => c.propagates_errors(),
        }
    }

    #[must_use]
    pub fn activation(&self) -> &ActivationCondition {
        match self {
            Self::Definition(d) => d.activation(),
            Self::Connector(c) => c.activation(),
        }
    }

    #[must_use]
    pub fn lifecycle(&self) -> &Lifecycle {
        match self {
            Self::Definition(d) => d.lifecycle(),
            Self::Connector(c) => c.lifecycle(),
        }
    }

    #[must_use]
    pub fn is_connector(&self) -> bool {
        matches!(self, Self::Connector(_))
    }

    /// Ids of every plugin this one needs, including a connector's failover.
    pub fn edges(&self) -> impl Iterator<Item = &str> {
        let failover = match self {
            Self::Connector(c) => c.failover(),
            Self::Definition(_) => None,
        };
        self.dependencies()
            .iter()
            .map(Dependency::plugin_id)
            .chain(failover)
    }
}
