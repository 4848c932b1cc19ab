use std::sync::Arc;

use attribute_resolver_sdk::{AttributeValue, ResolutionContext};
use persistent_id::CryptoTransientIdGenerator;

use crate::domain::error::ResolutionError;

/// Emits a sealed, short-lived identifier for the principal, bound to the
/// relying party of the request.
#[derive(Clone)]
pub struct TransientIdDefinition {
    generator: Arc<CryptoTransientIdGenerator>,
}

impl TransientIdDefinition {
    #[must_use]
    pub fn new(generator: Arc<CryptoTransientIdGenerator>) -> Self {
        Self { generator }
    }

    pub(super) fn derive(
        &self,
        plugin_id: &str,
        ctx: &ResolutionContext,
    ) -> Result<Vec<AttributeValue>, ResolutionError> {
        let relying_party = ctx
            .attribute_recipient_id()
            .ok_or_else(|| ResolutionError::missing_context(plugin_id, "attribute recipient id"))?;
        if ctx.principal().is_empty() {
            return Err(ResolutionError::missing_context(plugin_id, "principal"));
        }
        let id = self
            .generator
            .generate(relying_party, ctx.principal())
            .map_err(|e| ResolutionError::plugin(plugin_id, e.to_string()))?;
        Ok(vec![AttributeValue::String(id)])
    }
}
