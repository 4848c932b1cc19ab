//! Dependency values handed to a plugin's own resolution step.

use std::collections::HashSet;

use attribute_resolver_sdk::AttributeValue;

use super::error::ResolutionError;

/// Values of a plugin's dependencies for one request.
///
/// `named` keeps one entry per dependency in declaration order, keyed by the
/// attribute name the dependency supplies, with `Empty` values still in
/// place. `merged` is the concatenation of all of them with duplicates
/// removed, first occurrence wins.
#[derive(Debug, Clone, Default)]
pub struct DependencyValues {
    named: Vec<(String, Vec<AttributeValue>)>,
    merged: Vec<AttributeValue>,
    keep_empty: bool,
}

impl DependencyValues {
    /// Build from per-dependency values. `Empty` values are dropped unless
    /// `keep_empty` is set.
    #[must_use]
    pub fn new(named: Vec<(String, Vec<AttributeValue>)>, keep_empty: bool) -> Self {
        let mut seen = HashSet::new();
        let mut merged = Vec::new();
        for value in named.iter().flat_map(|(_, values)| values) {
            if (keep_empty || !value.is_empty_value()) && seen.insert(value) {
                merged.push(value.clone());
            }
        }

        Self {
            named,
            merged,
            keep_empty,
        }
    }

    /// All values, de-duplicated, in first-seen order.
    #[must_use]
    pub fn merged(&self) -> &[AttributeValue] {
        &self.merged
    }

    /// Values supplied under `name`. Repeated names are concatenated.
    #[must_use]
    pub fn values(&self, name: &str) -> Vec<&AttributeValue> {
        self.positional(name)
            .into_iter()
            .filter(|v| self.keep_empty || !v.is_empty_value())
            .collect()
    }

    /// Like [`Self::values`] but `Empty` values keep their slot, so
    /// position `i` lines up across dependencies.
    #[must_use]
    pub fn positional(&self, name: &str) -> Vec<&AttributeValue> {
        self.named
            .iter()
            .filter(|(n, _)| n == name)
            .flat_map(|(_, values)| values)
            .collect()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.named.iter().any(|(n, _)| n == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.named.iter().map(|(n, _)| n.as_str())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.merged.is_empty()
    }
}

/// Textual content of a string-like value.
///
/// `Ok(None)` for `Empty` values, which callers skip. `Bytes` and `Opaque`
/// values are not string-like and fail the plugin.
///
/// # Errors
///
/// Returns [`ResolutionError::UnsupportedValue`] for `Bytes` and `Opaque` values.
pub fn string_like<'v>(
    plugin_id: &str,
    value: &'v AttributeValue,
) -> Result<Option<&'v str>, ResolutionError> {
    match value {
        AttributeValue::String(s) | AttributeValue::Scoped { value: s, .. } => Ok(Some(s)),
        AttributeValue::Empty(_) => Ok(None),
        AttributeValue::Bytes(_) | AttributeValue::Opaque(_) => {
            Err(ResolutionError::unsupported(plugin_id, value.kind()))
        }
    }
}
