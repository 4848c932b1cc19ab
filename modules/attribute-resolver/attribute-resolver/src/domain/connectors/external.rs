use std::sync::Arc;

use async_trait::async_trait;
use attribute_resolver_sdk::{Attribute, AttributeMap, ResolutionContext};

use crate::domain::error::ResolutionError;
use crate::domain::values::DependencyValues;

use super::collect_by_id;

/// A directory, database or HTTP backend queried by a data connector.
///
/// Implementations own their I/O timeouts; the engine never interrupts a
/// fetch in flight.
#[async_trait]
pub trait AttributeSource: Send + Sync {
    /// Fetch attributes for the principal of `ctx`.
    ///
    /// # Errors
    ///
    /// Any error fails the owning connector.
    async fn fetch(
        &self,
        ctx: &ResolutionContext,
        inputs: &DependencyValues,
    ) -> anyhow::Result<Vec<Attribute>>;
}

#[derive(Clone)]
pub struct ExternalConnector {
    source: Arc<dyn AttributeSource>,
}

impl ExternalConnector {
    #[must_use]
    pub fn new(source: Arc<dyn AttributeSource>) -> Self {
        Self { source }
    }

    pub(super) async fn fetch(
        &self,
        plugin_id: &str,
        ctx: &ResolutionContext,
        inputs: &DependencyValues,
    ) -> Result<AttributeMap, ResolutionError> {
        let attributes = self
            .source
            .fetch(ctx, inputs)
            .await
            .map_err(|e| ResolutionError::plugin(plugin_id, format!("{e:#}")))?;
        Ok(collect_by_id(attributes))
    }
}
