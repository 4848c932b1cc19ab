//! Attribute definitions: plugins that derive one named attribute from the
//! values of their dependencies.

mod context_derived;
mod regex_split;
mod saml_nameid;
mod scoped;
mod script;
mod template;
mod transient_id;

use attribute_resolver_sdk::{AttributeValue, ResolutionContext};

pub use context_derived::{ContextDerivedDefinition, ContextExtractor, ContextSource};
pub use regex_split::RegexSplitDefinition;
pub use saml_nameid::{QualifierSource, Saml1NameIdentifierDefinition, Saml2NameIdDefinition};
pub use scoped::{PrescopedDefinition, ScopedDefinition};
pub use script::{ScriptBindings, ScriptEvaluator, ScriptedDefinition};
pub use template::TemplateDefinition;
pub use transient_id::TransientIdDefinition;

use super::error::{ConfigError, ResolutionError};
use super::lifecycle::Lifecycle;
use super::plugin::{ActivationCondition, Dependency};
use super::values::DependencyValues;

/// How a definition turns dependency values into its own values.
pub enum DefinitionStrategy {
    /// Dependency values, unchanged.
    Simple,
    Scoped(ScopedDefinition),
    Prescoped(PrescopedDefinition),
    RegexSplit(RegexSplitDefinition),
    Template(TemplateDefinition),
    Scripted(ScriptedDefinition),
    Saml1NameIdentifier(Saml1NameIdentifierDefinition),
    Saml2NameId(Saml2NameIdDefinition),
    ContextDerived(ContextDerivedDefinition),
    TransientId(TransientIdDefinition),
}

impl DefinitionStrategy {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Scoped(_) => "scoped",
            Self::Prescoped(_) => "prescoped",
            Self::RegexSplit(_) => "regex_split",
            Self::Template(_) => "template",
            Self::Scripted(_) => "script",
            Self::Saml1NameIdentifier(_) => "saml1_name_identifier",
            Self::Saml2NameId(_) => "saml2_name_id",
            Self::ContextDerived(_) => "context_derived",
            Self::TransientId(_) => "transient_id",
        }
    }

    fn initialize(
        &mut self,
        plugin_id: &str,
        dependency_names: &[String],
    ) -> Result<(), ConfigError> {
        match self {
            Self::Scoped(s) => s.initialize(plugin_id),
            Self::Prescoped(s) => s.initialize(plugin_id),
            Self::RegexSplit(s) => s.initialize(plugin_id),
            Self::Template(s) => s.initialize(plugin_id, dependency_names),
            Self::Simple
            | Self::Scripted(_)
            | Self::Saml1NameIdentifier(_)
            | Self::Saml2NameId(_)
            | Self::ContextDerived(_)
            | Self::TransientId(_) => Ok(()),
        }
    }

    fn derive(
        &self,
        plugin_id: &str,
        ctx: &ResolutionContext,
        inputs: &DependencyValues,
    ) -> Result<Vec<AttributeValue>, ResolutionError> {
        match self {
            Self::Simple => Ok(inputs.merged().to_vec()),
            Self::Scoped(s) => s.derive(plugin_id, inputs),
            Self::Prescoped(s) => s.derive(plugin_id, inputs),
            Self::RegexSplit(s) => s.derive(plugin_id, inputs),
            Self::Template(s) => s.derive(plugin_id, inputs),
            Self::Scripted(s) => s.derive(plugin_id, ctx, inputs),
            Self::Saml1NameIdentifier(s) => s.derive(plugin_id, ctx, inputs),
            Self::Saml2NameId(s) => s.derive(plugin_id, ctx, inputs),
            Self::ContextDerived(s) => s.derive(plugin_id, ctx),
            Self::TransientId(s) => s.derive(plugin_id, ctx),
        }
    }
}

/// A plugin producing a single attribute named after its id.
pub struct AttributeDefinition {
    id: String,
    dependencies: Vec<Dependency>,
    strategy: DefinitionStrategy,
    dependency_only: bool,
    propagate_errors: bool,
    keep_empty_values: bool,
    activation: ActivationCondition,
    lifecycle: Lifecycle,
}

impl AttributeDefinition {
    #[must_use]
    pub fn new(id: impl Into<String>, strategy: DefinitionStrategy) -> Self {
        Self {
            id: id.into(),
            dependencies: Vec::new(),
            strategy,
            dependency_only: false,
            propagate_errors: false,
            keep_empty_values: false,
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

    /// Resolved for dependents but never released.
    #[must_use]
    pub fn dependency_only(mut self, dependency_only: bool) -> Self {
        self.dependency_only = dependency_only;
        self
    }

    /// A failure of this definition fails the whole request.
    #[must_use]
    pub fn propagate_errors(mut self, propagate_errors: bool) -> Self {
        self.propagate_errors = propagate_errors;
        self
    }

    /// Keep `Empty` dependency values instead of stripping them.
    #[must_use]
    pub fn keep_empty_values(mut self, keep_empty_values: bool) -> Self {
        self.keep_empty_values = keep_empty_values;
        self
    }

    #[must_use]
    pub fn with_activation(mut self, activation: ActivationCondition) -> Self {
        self.activation = activation;
        self
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidState`] once the definition is initialized.
    pub fn set_dependencies(&mut self, dependencies: Vec<Dependency>) -> Result<(), ConfigError> {
        self.lifecycle.ensure_configurable(&self.id)?;
        self.dependencies = dependencies;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidState`] once the definition is initialized.
    pub fn set_activation(&mut self, activation: ActivationCondition) -> Result<(), ConfigError> {
        self.lifecycle.ensure_configurable(&self.id)?;
        self.activation = activation;
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
    pub fn strategy(&self) -> &DefinitionStrategy {
        &self.strategy
    }

    #[must_use]
    pub fn is_dependency_only(&self) -> bool {
        self.dependency_only
    }

    #[must_use]
    pub fn propagates_errors(&self) -> bool {
        self.propagate_errors
    }

    #[must_use]
    pub fn keeps_empty_values(&self) -> bool {
        self.keep_empty_values
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
        self.strategy.initialize(&self.id, dependency_names)?;
        self.lifecycle.mark_initialized(&self.id)
    }

    pub(crate) fn derive(
        &self,
        ctx: &ResolutionContext,
        inputs: &DependencyValues,
    ) -> Result<Vec<AttributeValue>, ResolutionError> {
        self.lifecycle.ensure_initialized(&self.id)?;
        self.strategy.derive(&self.id, ctx, inputs)
    }
}
