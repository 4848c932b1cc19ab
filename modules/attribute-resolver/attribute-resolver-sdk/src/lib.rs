//! Attribute Resolver SDK
//!
//! This crate provides the public API of the attribute resolver:
//!
//! - [`AttributeResolverClient`] - request-time entry point
//! - [`Attribute`] / [`AttributeValue`] - resolved data model
//! - [`ResolutionContext`] - per-request inputs (principal, issuer, relying party)
//! - [`AttributeResolverError`] - error types

pub mod api;
pub mod context;
pub mod error;
pub mod models;

pub use api::AttributeResolverClient;
pub use context::{ResolutionContext, ResolutionContextBuilder, SubjectContext};
pub use error::AttributeResolverError;
pub use models::{
    Attribute, AttributeMap, AttributeValue, EmptyValue, OpaqueValue, Saml1NameIdentifier,
    Saml2NameId,
};
