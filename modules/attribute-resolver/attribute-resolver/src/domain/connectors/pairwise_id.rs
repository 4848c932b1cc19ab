use std::sync::Arc;

use attribute_resolver_sdk::{Attribute, AttributeMap, AttributeValue, ResolutionContext};
use persistent_id::{PairwiseIdRequest, PairwiseIdStore};

use crate::domain::error::{ConfigError, ResolutionError};
use crate::domain::values::{DependencyValues, string_like};

/// Emits a relying-party specific identifier derived from the principal's
/// local identifier.
///
/// The local identifier is read from the dependency named
/// `source_attribute`; issuer and relying party come from the request.
#[derive(Clone)]
pub struct PairwiseIdConnector {
    store: Arc<dyn PairwiseIdStore>,
    source_attribute: String,
    generated_attribute_id: String,
}

impl PairwiseIdConnector {
    #[must_use]
    pub fn new(
        store: Arc<dyn PairwiseIdStore>,
        source_attribute: impl Into<String>,
        generated_attribute_id: impl Into<String>,
    ) -> Self {
        Self {
            store,
            source_attribute: source_attribute.into(),
            generated_attribute_id: generated_attribute_id.into(),
        }
    }

    #[must_use]
    pub fn source_attribute(&self) -> &str {
        &self.source_attribute
    }

    #[must_use]
    pub fn generated_attribute_id(&self) -> &str {
        &self.generated_attribute_id
    }

    pub(super) fn initialize(
        &self,
        plugin_id: &str,
        dependency_names: &[String],
    ) -> Result<(), ConfigError> {
        if self.source_attribute.is_empty() {
            return Err(ConfigError::missing(plugin_id, "source_attribute"));
        }
        if self.generated_attribute_id.is_empty() {
            return Err(ConfigError::missing(plugin_id, "generated_attribute_id"));
        }
        if !dependency_names.iter().any(|n| *n == self.source_attribute) {
            return Err(ConfigError::invalid(
                plugin_id,
                "source_attribute",
                format!("no dependency supplies '{}'", self.source_attribute),
            ));
        }
        Ok(())
    }

    pub(super) async fn fetch(
        &self,
        plugin_id: &str,
        ctx: &ResolutionContext,
        inputs: &DependencyValues,
    ) -> Result<AttributeMap, ResolutionError> {
        let issuer = ctx
            .attribute_issuer_id()
            .ok_or_else(|| ResolutionError::missing_context(plugin_id, "attribute issuer id"))?;
        let relying_party = ctx
            .attribute_recipient_id()
            .ok_or_else(|| ResolutionError::missing_context(plugin_id, "attribute recipient id"))?;

        let mut local_ids = Vec::new();
        for value in inputs.values(&self.source_attribute) {
            if let Some(s) = string_like(plugin_id, value)? {
                local_ids.push(s);
            }
        }
        let local_id = match local_ids.as_slice() {
            [] => {
                tracing::debug!(
                    plugin_id,
                    source = %self.source_attribute,
                    "source attribute has no value, no identifier generated"
                );
                return Ok(AttributeMap::new());
            }
            [single] => *single,
            many => {
                return Err(ResolutionError::plugin(
                    plugin_id,
                    format!(
                        "source attribute '{}' has {} values, expected one",
                        self.source_attribute,
                        many.len()
                    ),
                ));
            }
        };

        let request = PairwiseIdRequest::new(issuer, relying_party, ctx.principal(), local_id);
        let id = self
            .store
            .get_or_issue(&request)
            .await
            .map_err(|e| ResolutionError::plugin(plugin_id, e.to_string()))?;

        let attribute = Attribute::with_values(
            self.generated_attribute_id.clone(),
            [AttributeValue::String(id)],
        );
        Ok(AttributeMap::from([(
            self.generated_attribute_id.clone(),
            attribute,
        )]))
    }
}
