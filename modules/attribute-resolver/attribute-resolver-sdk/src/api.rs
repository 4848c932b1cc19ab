//! Public API trait for the attribute resolver.

use async_trait::async_trait;

use crate::context::ResolutionContext;
use crate::error::AttributeResolverError;
use crate::models::AttributeMap;

/// Request-time entry point of the attribute resolver.
///
/// ```ignore
/// let ctx = ResolutionContext::builder()
///     .principal("jdoe")
///     .attribute_issuer_id("https://idp.example.org")
///     .attribute_recipient_id("https://sp.example.org")
///     .build();
/// let attributes = resolver.resolve(&ctx).await?;
/// ```
#[async_trait]
pub trait AttributeResolverClient: Send + Sync {
    /// Resolve the attributes to release for `ctx`.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` if the context lacks a principal
    /// - `ResolutionFailed` if a strict plugin failed
    /// - `Timeout` if the configured deadline elapsed
    /// - `ServiceUnavailable` if no resolver is active
    async fn resolve(
        &self,
        ctx: &ResolutionContext,
    ) -> Result<AttributeMap, AttributeResolverError>;
}
