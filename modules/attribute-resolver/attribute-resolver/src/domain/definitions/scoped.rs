use attribute_resolver_sdk::AttributeValue;

use crate::domain::error::{ConfigError, ResolutionError};
use crate::domain::values::{DependencyValues, string_like};

/// Appends a fixed scope to every value.
#[derive(Debug, Clone)]
pub struct ScopedDefinition {
    scope: String,
}

impl ScopedDefinition {
    #[must_use]
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
        }
    }

    #[must_use]
    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub(super) fn initialize(&self, plugin_id: &str) -> Result<(), ConfigError> {
        if self.scope.is_empty() {
            return Err(ConfigError::missing(plugin_id, "scope"));
        }
        Ok(())
    }

    pub(super) fn derive(
        &self,
        plugin_id: &str,
        inputs: &DependencyValues,
    ) -> Result<Vec<AttributeValue>, ResolutionError> {
        let mut out = Vec::with_capacity(inputs.merged().len());
        for value in inputs.merged() {
            if let Some(s) = string_like(plugin_id, value)? {
                out.push(AttributeValue::scoped(s, self.scope.as_str()));
            }
        }
        Ok(out)
    }
}

/// Splits `value<delimiter>scope` strings into scoped values.
#[derive(Debug, Clone)]
pub struct PrescopedDefinition {
    delimiter: String,
}

impl Default for PrescopedDefinition {
    fn default() -> Self {
        Self::new("@")
    }
}

impl PrescopedDefinition {
    #[must_use]
    pub fn new(delimiter: impl Into<String>) -> Self {
        Self {
            delimiter: delimiter.into(),
        }
    }

    pub(super) fn initialize(&self, plugin_id: &str) -> Result<(), ConfigError> {
        if self.delimiter.is_empty() {
            return Err(ConfigError::missing(plugin_id, "delimiter"));
        }
        Ok(())
    }

    pub(super) fn derive(
        &self,
        plugin_id: &str,
        inputs: &DependencyValues,
    ) -> Result<Vec<AttributeValue>, ResolutionError> {
        let mut out = Vec::with_capacity(inputs.merged().len());
        for value in inputs.merged() {
            let Some(s) = string_like(plugin_id, value)? else {
                continue;
            };
            let (value, scope) = s.split_once(self.delimiter.as_str()).ok_or_else(|| {
                ResolutionError::plugin(
                    plugin_id,
                    format!("value '{s}' has no scope delimiter '{}'", self.delimiter),
                )
            })?;
            out.push(AttributeValue::scoped(value, scope));
        }
        Ok(out)
    }
}
