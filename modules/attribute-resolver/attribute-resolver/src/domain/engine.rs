//! Resolution engine: walks the plugin graph depth-first, once per plugin per
//! request.

use std::collections::BTreeMap;
use std::sync::Arc;

use attribute_resolver_sdk::{Attribute, AttributeMap, ResolutionContext};
use futures::future::BoxFuture;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::connectors::DataConnector;
use super::definitions::AttributeDefinition;
use super::error::{ConfigError, ResolutionError};
use super::graph;
use super::lifecycle::{Lifecycle, LifecycleState};
use super::plugin::Plugin;
use super::values::DependencyValues;
use super::work_context::{PluginOutcome, WorkContext};

type StepResult = Result<PluginOutcome, ResolutionError>;

/// What to do with attributes whose values are all `Empty`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyValuePolicy {
    /// Release them as they are.
    #[default]
    Release,
    /// Drop them from the result.
    Suppress,
}

/// A validated, initialized plugin graph.
///
/// Immutable once initialized; share it behind an `Arc` across requests.
pub struct Resolver {
    id: String,
    plugins: BTreeMap<String, Plugin>,
    empty_value_policy: EmptyValuePolicy,
    lifecycle: Lifecycle,
}

impl Resolver {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            plugins: BTreeMap::new(),
            empty_value_policy: EmptyValuePolicy::Release,
            lifecycle: Lifecycle::default(),
        }
    }

    #[must_use]
    pub fn with_empty_value_policy(mut self, policy: EmptyValuePolicy) -> Self {
        self.empty_value_policy = policy;
        self
    }

    /// # Errors
    ///
    /// Fails if the id is taken or the resolver is already initialized.
    pub fn add_definition(&mut self, definition: AttributeDefinition) -> Result<(), ConfigError> {
        self.add(Plugin::Definition(definition))
    }

    /// # Errors
    ///
    /// Fails if the id is taken or the resolver is already initialized.
    pub fn add_connector(&mut self, connector: DataConnector) -> Result<(), ConfigError> {
        self.add(Plugin::Connector(connector))
    }

    fn add(&mut self, plugin: Plugin) -> Result<(), ConfigError> {
        self.lifecycle.ensure_configurable(&self.id)?;
        if self.plugins.contains_key(plugin.id()) {
            return Err(ConfigError::DuplicatePlugin {
                plugin_id: plugin.id().to_owned(),
            });
        }
        self.plugins.insert(plugin.id().to_owned(), plugin);
        Ok(())
    }

    /// Validates the graph and initializes every plugin.
    ///
    /// # Errors
    ///
    /// Returns the first reference, cycle or plugin configuration error.
    pub fn initialize(&mut self) -> Result<(), ConfigError> {
        self.initialize_with(true)
    }

    fn initialize_with(&mut self, validate_graph: bool) -> Result<(), ConfigError> {
        self.lifecycle.ensure_configurable(&self.id)?;
        if validate_graph {
            graph::validate(&self.plugins)?;
        }

        let names: Vec<Vec<String>> = self
            .plugins
            .values()
            .map(|p| graph::dependency_names(p, &self.plugins))
            .collect();
        let mut failure = None;
        for (plugin, names) in self.plugins.values_mut().zip(names) {
            let res = match plugin {
                Plugin::Definition(d) => d.initialize(&names),
                Plugin::Connector(c) => c.initialize(&names),
            };
            if let Err(e) = res {
                failure = Some(e);
                break;
            }
        }
        if let Some(e) = failure {
            // Leave every plugin configurable so the resolver can be fixed and retried.
            for plugin in self.plugins.values() {
                plugin.lifecycle().roll_back();
            }
            return Err(e);
        }

        self.lifecycle.mark_initialized(&self.id)?;
        info!(
            resolver = %self.id,
            plugins = self.plugins.len(),
            "attribute resolver initialized"
        );
        Ok(())
    }

    /// Destroys the resolver and every plugin. Further calls fail.
    pub fn destroy(&self) {
        for plugin in self.plugins.values() {
            plugin.lifecycle().destroy();
        }
        self.lifecycle.destroy();
        debug!(resolver = %self.id, "attribute resolver destroyed");
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    #[must_use]
    pub fn empty_value_policy(&self) -> EmptyValuePolicy {
        self.empty_value_policy
    }

    #[must_use]
    pub fn plugin(&self, id: &str) -> Option<&Plugin> {
        self.plugins.get(id)
    }

    /// Ids of the definitions released when a request names none.
    pub fn releasable_ids(&self) -> impl Iterator<Item = &str> {
        self.plugins.values().filter_map(|p| match p {
            Plugin::Definition(d) if !d.is_dependency_only() => Some(d.id()),
            Plugin::Definition(_) | Plugin::Connector(_) => None,
        })
    }

    /// Resolves the requested attributes, or every releasable attribute when
    /// the context names none.
    ///
    /// # Errors
    ///
    /// - [`ResolutionError::InvalidRequest`] if the principal is empty
    /// - [`ResolutionError::InvalidState`] if the resolver is not initialized
    /// - any error of a plugin configured to propagate errors
    #[tracing::instrument(
        skip_all,
        fields(
            resolver = %self.id,
            principal = %ctx.principal(),
            relying_party = ctx.attribute_recipient_id().unwrap_or_default()
        )
    )]
    pub async fn resolve(&self, ctx: &ResolutionContext) -> Result<AttributeMap, ResolutionError> {
        self.lifecycle.ensure_initialized(&self.id)?;
        if ctx.principal().is_empty() {
            return Err(ResolutionError::InvalidRequest(
                "principal must not be empty".to_owned(),
            ));
        }

        let requested: Vec<&str> = match ctx.requested_attribute_ids() {
            Some(ids) => ids.iter().map(String::as_str).collect(),
            None => self.releasable_ids().collect(),
        };

        let mut work = WorkContext::default();
        let mut released = AttributeMap::with_capacity(requested.len());
        for id in requested {
            match self.plugins.get(id) {
                Some(Plugin::Definition(d)) if !d.is_dependency_only() => {}
                Some(Plugin::Definition(_)) => {
                    debug!(attribute_id = id, "dependency-only attribute is never released");
                    continue;
                }
                Some(Plugin::Connector(_)) | None => {
                    debug!(attribute_id = id, "no attribute definition for requested id");
                    continue;
                }
            }

            let outcome = self.resolve_plugin(id, ctx, &mut work).await?;
            if let PluginOutcome::Definition(Some(attribute)) = outcome.as_ref()
                && let Some(attribute) = self.releasable(attribute)
            {
                released.insert(id.to_owned(), attribute);
            }
        }

        debug!(released = released.len(), "attribute resolution finished");
        Ok(released)
    }

    fn releasable(&self, attribute: &Attribute) -> Option<Attribute> {
        if attribute.is_empty() {
            return None;
        }
        if self.empty_value_policy == EmptyValuePolicy::Suppress && attribute.only_empty_values()
        {
            debug!(
                attribute_id = attribute.id(),
                "attribute with only empty values suppressed"
            );
            return None;
        }
        Some(attribute.clone())
    }

    /// Resolves one plugin, consulting and filling the work context.
    fn resolve_plugin<'a>(
        &'a self,
        id: &'a str,
        ctx: &'a ResolutionContext,
        work: &'a mut WorkContext,
    ) -> BoxFuture<'a, Result<Arc<PluginOutcome>, ResolutionError>> {
        Box::pin(async move {
            if let Some(cached) = work.get(id) {
                debug!(plugin_id = id, "plugin result reused");
                return Ok(cached);
            }
            let Some(plugin) = self.plugins.get(id) else {
                return Err(ResolutionError::plugin(id, "no such plugin"));
            };
            if !work.begin(id) {
                return Err(ResolutionError::CyclicDependency {
                    plugin_id: id.to_owned(),
                });
            }

            let own = match self.execute(plugin, ctx, work).await {
                Ok(own) => own,
                Err(e) => {
                    work.abandon(id);
                    return Err(e);
                }
            };
            let outcome = match own {
                Ok(outcome) => outcome,
                Err(e) if e.is_fatal() || plugin.propagate_errors() => {
                    work.abandon(id);
                    return Err(e);
                }
                Err(e) => {
                    warn!(plugin_id = id, error = %e, "plugin failed, its contribution is dropped");
                    PluginOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            };
            Ok(work.finish(id, outcome))
        })
    }

    /// Runs the plugin's own step.
    ///
    /// The outer error already fails the request (a dependency propagated
    /// it). The inner result is the plugin's own outcome, which its
    /// configuration may recover from.
    async fn execute(
        &self,
        plugin: &Plugin,
        ctx: &ResolutionContext,
        work: &mut WorkContext,
    ) -> Result<StepResult, ResolutionError> {
        if !plugin.activation().is_active(ctx) {
            debug!(plugin_id = plugin.id(), "plugin inactive for this request");
            return Ok(Ok(match plugin {
                Plugin::Definition(_) => PluginOutcome::Definition(None),
                Plugin::Connector(_) => PluginOutcome::Connector(AttributeMap::new()),
            }));
        }

        let inputs = self.gather(plugin, ctx, work).await?;
        match plugin {
            Plugin::Definition(definition) => Ok(definition.derive(ctx, &inputs).map(|values| {
                let attribute = Attribute::with_values(definition.id(), values);
                PluginOutcome::Definition((!attribute.is_empty()).then_some(attribute))
            })),
            Plugin::Connector(connector) => match connector.fetch(ctx, &inputs).await {
                Ok(attributes) => Ok(Ok(PluginOutcome::Connector(attributes))),
                Err(e) => match connector.failover() {
                    Some(failover) if !e.is_fatal() => {
                        warn!(
                            plugin_id = connector.id(),
                            failover,
                            error = %e,
                            "data connector failed, using failover"
                        );
                        self.failover(connector.id(), failover, ctx, work).await
                    }
                    Some(_) | None => Ok(Err(e)),
                },
            },
        }
    }

    async fn failover(
        &self,
        primary: &str,
        failover: &str,
        ctx: &ResolutionContext,
        work: &mut WorkContext,
    ) -> Result<StepResult, ResolutionError> {
        let outcome = self.resolve_plugin(failover, ctx, work).await?;
        Ok(match outcome.as_ref() {
            PluginOutcome::Connector(attributes) => {
                Ok(PluginOutcome::Connector(attributes.clone()))
            }
            PluginOutcome::Failed { .. } | PluginOutcome::Definition(_) => {
                Err(ResolutionError::DependencyFailed {
                    plugin_id: primary.to_owned(),
                    dependency: failover.to_owned(),
                })
            }
        })
    }

    /// Resolves the dependencies of `owner` and collects their values.
    ///
    /// A failed dependency contributes no values, unless `owner` propagates
    /// errors, in which case it fails too.
    async fn gather(
        &self,
        owner: &Plugin,
        ctx: &ResolutionContext,
        work: &mut WorkContext,
    ) -> Result<DependencyValues, ResolutionError> {
        let keep_empty = match owner {
            Plugin::Definition(d) => d.keeps_empty_values(),
            Plugin::Connector(_) => false,
        };

        let mut named = Vec::with_capacity(owner.dependencies().len());
        for dep in owner.dependencies() {
            let outcome = self.resolve_plugin(dep.plugin_id(), ctx, work).await?;
            let target_is_connector = self
                .plugins
                .get(dep.plugin_id())
                .is_some_and(Plugin::is_connector);
            let name = graph::dependency_name(owner.id(), dep, target_is_connector);

            let values = match outcome.as_ref() {
                PluginOutcome::Definition(attribute) => attribute
                    .as_ref()
                    .map_or_else(Vec::new, |a| a.values().to_vec()),
                PluginOutcome::Connector(attributes) => match attributes.get(name) {
                    Some(a) => a.values().to_vec(),
                    None => {
                        debug!(
                            plugin_id = owner.id(),
                            connector = dep.plugin_id(),
                            attribute_id = name,
                            "data connector did not return the attribute"
                        );
                        Vec::new()
                    }
                },
                PluginOutcome::Failed { reason } => {
                    if owner.propagate_errors() {
                        return Err(ResolutionError::DependencyFailed {
                            plugin_id: owner.id().to_owned(),
                            dependency: dep.plugin_id().to_owned(),
                        });
                    }
                    debug!(
                        plugin_id = owner.id(),
                        dependency = dep.plugin_id(),
                        reason = %reason,
                        "failed dependency treated as empty"
                    );
                    Vec::new()
                }
            };
            named.push((name.to_owned(), values));
        }
        Ok(DependencyValues::new(named, keep_empty))
    }
}
