use std::sync::Arc;

use attribute_resolver_sdk::{AttributeValue, ResolutionContext};

use crate::domain::error::ResolutionError;
use crate::domain::values::DependencyValues;

/// Evaluates a user-supplied script against the dependency values of a
/// definition. Whatever values it returns become the attribute's values.
///
/// Any `Fn(&ScriptBindings) -> anyhow::Result<Vec<AttributeValue>>` closure
/// is an evaluator.
pub trait ScriptEvaluator: Send + Sync {
    /// # Errors
    ///
    /// Any error fails the owning definition.
    fn evaluate(&self, bindings: &ScriptBindings<'_>) -> anyhow::Result<Vec<AttributeValue>>;
}

impl<F> ScriptEvaluator for F
where
    F: Fn(&ScriptBindings<'_>) -> anyhow::Result<Vec<AttributeValue>> + Send + Sync,
{
    fn evaluate(&self, bindings: &ScriptBindings<'_>) -> anyhow::Result<Vec<AttributeValue>> {
        self(bindings)
    }
}

/// Variables visible to a script.
pub struct ScriptBindings<'a> {
    plugin_id: &'a str,
    ctx: &'a ResolutionContext,
    inputs: &'a DependencyValues,
}

impl<'a> ScriptBindings<'a> {
    #[must_use]
    pub fn new(
        plugin_id: &'a str,
        ctx: &'a ResolutionContext,
        inputs: &'a DependencyValues,
    ) -> Self {
        Self {
            plugin_id,
            ctx,
            inputs,
        }
    }

    /// Id of the definition being resolved.
    #[must_use]
    pub fn plugin_id(&self) -> &str {
        self.plugin_id
    }

    #[must_use]
    pub fn context(&self) -> &ResolutionContext {
        self.ctx
    }

    #[must_use]
    pub fn principal(&self) -> &str {
        self.ctx.principal()
    }

    /// Values of the dependency bound under `name`.
    #[must_use]
    pub fn values(&self, name: &str) -> Vec<&AttributeValue> {
        self.inputs.values(name)
    }

    /// Every dependency value, de-duplicated.
    #[must_use]
    pub fn all_values(&self) -> &[AttributeValue] {
        self.inputs.merged()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.inputs.names()
    }
}

#[derive(Clone)]
pub struct ScriptedDefinition {
    evaluator: Arc<dyn ScriptEvaluator>,
}

impl ScriptedDefinition {
    #[must_use]
    pub fn new(evaluator: Arc<dyn ScriptEvaluator>) -> Self {
        Self { evaluator }
    }

    pub(super) fn derive(
        &self,
        plugin_id: &str,
        ctx: &ResolutionContext,
        inputs: &DependencyValues,
    ) -> Result<Vec<AttributeValue>, ResolutionError> {
        let bindings = ScriptBindings::new(plugin_id, ctx, inputs);
        self.evaluator
            .evaluate(&bindings)
            .map_err(|e| ResolutionError::plugin(plugin_id, format!("script failed: {e:#}")))
    }
}
