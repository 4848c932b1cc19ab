//! Local (in-process) client for the attribute resolver.

use std::sync::Arc;

use async_trait::async_trait;
use attribute_resolver_sdk::{
    AttributeMap, AttributeResolverClient, AttributeResolverError, ResolutionContext,
};

use super::error::ResolutionError;
use super::service::ResolverService;

/// Local client wrapping the service.
pub struct AttributeResolverLocalClient {
    svc: Arc<ResolverService>,
}

impl AttributeResolverLocalClient {
    #[must_use]
    pub fn new(svc: Arc<ResolverService>) -> Self {
        Self { svc }
    }
}

fn log_and_convert(op: &str, e: ResolutionError) -> AttributeResolverError {
    tracing::error!(operation = op, error = ?e, "attribute_resolver call failed");
    e.into()
}

#[async_trait]
impl AttributeResolverClient for AttributeResolverLocalClient {
    async fn resolve(
        &self,
        ctx: &ResolutionContext,
    ) -> Result<AttributeMap, AttributeResolverError> {
        self.svc
            .resolve(ctx)
            .await
            .map_err(|e| log_and_convert("resolve", e))
    }
}
