use std::sync::Arc;

use attribute_resolver_sdk::{AttributeValue, ResolutionContext};

use crate::domain::error::ResolutionError;

/// Pulls values out of the request context rather than from dependencies.
pub trait ContextExtractor: Send + Sync {
    /// # Errors
    ///
    /// Any error fails the owning definition.
    fn extract(&self, ctx: &ResolutionContext) -> anyhow::Result<Vec<AttributeValue>>;
}

impl<F> ContextExtractor for F
where
    F: Fn(&ResolutionContext) -> anyhow::Result<Vec<AttributeValue>> + Send + Sync,
{
    fn extract(&self, ctx: &ResolutionContext) -> anyhow::Result<Vec<AttributeValue>> {
        self(ctx)
    }
}

#[derive(Clone)]
pub enum ContextSource {
    /// The principal being resolved.
    PrincipalName,
    /// How the subject authenticated.
    AuthenticationMethod,
    /// An attribute carried on the subject context.
    SubjectAttribute(String),
    Extractor(Arc<dyn ContextExtractor>),
}

#[derive(Clone)]
pub struct ContextDerivedDefinition {
    source: ContextSource,
}

impl ContextDerivedDefinition {
    #[must_use]
    pub fn new(source: ContextSource) -> Self {
        Self { source }
    }

    pub(super) fn derive(
        &self,
        plugin_id: &str,
        ctx: &ResolutionContext,
    ) -> Result<Vec<AttributeValue>, ResolutionError> {
        match &self.source {
            ContextSource::PrincipalName => Ok(if ctx.principal().is_empty() {
                Vec::new()
            } else {
                vec![AttributeValue::string(ctx.principal())]
            }),
            ContextSource::AuthenticationMethod => Ok(ctx
                .subject()
                .and_then(|s| s.authentication_method())
                .map(|m| vec![AttributeValue::string(m)])
                .unwrap_or_default()),
            ContextSource::SubjectAttribute(name) => Ok(ctx
                .subject()
                .and_then(|s| s.attribute(name))
                .map(<[AttributeValue]>::to_vec)
                .unwrap_or_default()),
            ContextSource::Extractor(extractor) => extractor.extract(ctx).map_err(|e| {
                ResolutionError::plugin(plugin_id, format!("context extraction failed: {e:#}"))
            }),
        }
    }
}
