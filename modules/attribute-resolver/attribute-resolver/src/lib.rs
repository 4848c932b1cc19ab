//! Attribute Resolver
//!
//! Resolves the attributes released to a relying party by walking a static
//! graph of attribute definitions and data connectors, once per plugin per
//! request.
//!
//! - [`domain::Resolver`] - graph validation and resolution
//! - [`domain::ResolverService`] - hot reload and request timeout
//! - [`domain::AttributeResolverLocalClient`] - the SDK client
//! - [`config::load_config`] - YAML plus environment configuration
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod config;
pub mod domain;

pub use config::{AttributeResolverConfig, load_config};
pub use domain::{
    AttributeResolverLocalClient, Collaborators, ConfigError, EmptyValuePolicy, ResolutionError,
    Resolver, ResolverService, build_resolver,
};
