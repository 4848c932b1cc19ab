//! Domain layer for the attribute resolver.

pub mod builder;
pub mod collaborators;
pub mod connectors;
pub mod definitions;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod local_client;
pub mod plugin;
pub mod service;
pub mod values;

mod graph;
mod work_context;

pub use builder::build_resolver;
pub use collaborators::Collaborators;
pub use engine::{EmptyValuePolicy, Resolver};
pub use error::{ConfigError, ResolutionError};
pub use lifecycle::LifecycleState;
pub use local_client::AttributeResolverLocalClient;
pub use plugin::{ActivationCondition, Dependency, Plugin};
pub use service::ResolverService;
pub use values::DependencyValues;
