//! Data connectors: plugins that fetch a set of attributes at once.

mod external;
mod pairwise_id;
mod static_connector;

use attribute_resolver_sdk::{Attribute, AttributeMap, ResolutionContext};

pub use external::{AttributeSource, ExternalConnector};
pub use pairwise_id::PairwiseIdConnector;
pub use static_connector::StaticConnector;

use super::error::{ConfigError, ResolutionError};
use super::lifecycle::Lifecycle;
use super::plugin::{ActivationCondition, Dependency};
use super::values::DependencyValues;

/// Keys attributes by id; attributes sharing an id are merged in order.
fn collect_by_id(attributes: impl IntoIterator<Item = Attribute>) -> AttributeMap {
    let mut map = AttributeMap::new();
    for attribute in attributes {
        match map.get_mut(attribute.id()) {
            Some(existing) => {
                for value in attribute.into_values() {
                    existing.push(value);
                }
            }
            None => {
                map.insert(attribute.id().to_owned(), attribute);
            }
        }
    }
    map
}

/// Where a connector gets its attributes from.
pub enum ConnectorSource {
    Static(StaticConnector),
    PairwiseId(PairwiseIdConnector),
    External(ExternalConnector),
}

impl ConnectorSource {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Static(_) => "static",
            Self::PairwiseId(_) => "pairwise_id",
            Self::External(_) => "external",
        }
    }

    fn initialize(&self, plugin_id: &str, dependency_names: &[String]) -> Result<(), ConfigError> {
        match self {
            Self::PairwiseId(c) => c.initialize(plugin_id, dependency_names),
            Self::Static(_) | Self::External(_) => Ok(()),
        }
    }

    async fn fetch(
        &self,
        plugin_id: &str,
        ctx: &ResolutionContext,
        inputs: &DependencyValues,
    ) -> Result<AttributeMap, ResolutionError> {
        match self {
            Self::Static(c) => Ok(c.fetch()),
            Self::PairwiseId(c) => c.fetch(plugin_id, ctx, inputs).await,
            Self::External(c) => c.fetch(plugin_id, ctx, inputs).await,
        }
    }
}

pub struct DataConnector {
    id: String,
    dependencies: Vec<Dependency>,
    source: ConnectorSource,
    failover: Option<String>,
    no_result_is_error: bool,
    propagate_errors: bool,
    activation: ActivationCondition,
    lifecycle: Lifecycle,
}

impl DataConnector {
    #[must_use]
    pub fn new(id: impl Into<String>, source: ConnectorSource) -> Self {
        Self {
            id: id.into(),
            dependencies: Vec::new(),
            source,
            failover: None,
            no_result_is_error: false,
            propagate_errors: false,
            activation: ActivationCondition::Always,
            lifecycle: Lifecycle::default(),
        }
    }

    #[must_use]
    pub fn with_dependency(mut self, dependency: Dependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    #[must_use]
    pub fn with_dependencies(mut self, dependencies: impl IntoIterator<Item = Dependency>) -> Self {
        self.dependencies.extend(dependencies);
        self
    }

    /// Connector whose result replaces this one's when it fails.
    #[must_use]
    pub fn with_failover(mut self, connector_id: impl Into<String>) -> Self {
        self.failover = Some(connector_id.into());
        self
    }

    /// Treat an empty result as a failure.
    #[must_use]
    pub fn no_result_is_error(mut self, no_result_is_error: bool) -> Self {
        self.no_result_is_error = no_result_is_error;
        self
    }

    #[must_use]
    pub fn propagate_errors(mut self, propagate_errors: bool) -> Self {
        self.propagate_errors = propagate_errors;
        self
    }

    #[must_use]
    pub fn with_activation(mut self, activation: ActivationCondition) -> Self {
        self.activation = activation;
        self
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidState`] once the connector is initialized.
    pub fn set_dependencies(&mut self, dependencies: Vec<Dependency>) -> Result<(), ConfigError> {
        self.lifecycle.ensure_configurable(&self.id)?;
        self.dependencies = dependencies;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidState`] once the connector is initialized.
    pub fn set_failover(&mut self, connector_id: Option<String>) -> Result<(), ConfigError> {
        self.lifecycle.ensure_configurable(&self.id)?;
        self.failover = connector_id;
        Ok(())
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    #[must_use]
    pub fn source(&self) -> &ConnectorSource {
        &self.source
    }

    #[must_use]
    pub fn failover(&self) -> Option<&str> {
        self.failover.as_deref()
    }

    #[must_use]
    pub fn is_no_result_error(&self) -> bool {
        self.no_result_is_error
    }

    #[must_use]
    pub fn propagates_errors(&self) -> bool {
        self.propagate_errors
    }

    #[must_use]
    pub fn activation(&self) -> &ActivationCondition {
        &self.activation
    }

    #[must_use]
    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub(crate) fn initialize(&mut self, dependency_names: &[String]) -> Result<(), ConfigError> {
        self.lifecycle.ensure_configurable(&self.id)?;
        self.source.initialize(&self.id, dependency_names)?;
        self.lifecycle.mark_initialized(&self.id)
    }

    pub(crate) async fn fetch(
        &self,
        ctx: &ResolutionContext,
        inputs: &DependencyValues,
    ) -> Result<AttributeMap, ResolutionError> {
        self.lifecycle.ensure_initialized(&self.id)?;
        let mut attributes = self.source.fetch(&self.id, ctx, inputs).await?;
        attributes.retain(|_, attribute| !attribute.is_empty());
        if attributes.is_empty() && self.no_result_is_error {
            return Err(ResolutionError::NoResult {
                plugin_id: self.id.clone(),
            });
        }
        Ok(attributes)
    }
}
