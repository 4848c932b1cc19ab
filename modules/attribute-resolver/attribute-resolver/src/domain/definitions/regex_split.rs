use attribute_resolver_sdk::{AttributeValue, EmptyValue};
use regex::{Regex, RegexBuilder};

use crate::domain::error::{ConfigError, ResolutionError};
use crate::domain::values::{DependencyValues, string_like};

/// Extracts part of each value with a regular expression.
///
/// The pattern must match the whole value. With a capture group the first
/// group is emitted, otherwise the whole value; non-matching values are
/// dropped.
#[derive(Debug, Clone)]
pub struct RegexSplitDefinition {
    pattern: String,
    case_sensitive: bool,
    regex: Option<Regex>,
}

impl RegexSplitDefinition {
    #[must_use]
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            case_sensitive: true,
            regex: None,
        }
    }

    #[must_use]
    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub(super) fn initialize(&mut self, plugin_id: &str) -> Result<(), ConfigError> {
        if self.pattern.is_empty() {
            return Err(ConfigError::missing(plugin_id, "regex"));
        }
        let regex = RegexBuilder::new(&format!("^(?:{})$", self.pattern))
            .case_insensitive(!self.case_sensitive)
            .build()
            .map_err(|e| ConfigError::invalid(plugin_id, "regex", e.to_string()))?;
        self.regex = Some(regex);
        Ok(())
    }

    pub(super) fn derive(
        &self,
        plugin_id: &str,
        inputs: &DependencyValues,
    ) -> Result<Vec<AttributeValue>, ResolutionError> {
        let regex = self
            .regex
            .as_ref()
            .ok_or_else(|| ResolutionError::plugin(plugin_id, "regex not compiled"))?;
        let has_group = regex.captures_len() > 1;

        let mut out = Vec::new();
        for value in inputs.merged() {
            let Some(s) = string_like(plugin_id, value)? else {
                continue;
            };
            let Some(caps) = regex.captures(s) else {
                tracing::debug!(plugin_id, value = s, "value does not match, dropped");
                continue;
            };
            let derived = if has_group {
                caps.get(1).map_or(AttributeValue::Empty(EmptyValue::ZeroLength), |m| {
                    AttributeValue::string(m.as_str())
                })
            } else {
                AttributeValue::string(s)
            };
            out.push(derived);
        }
        Ok(out)
    }
}
