//! Hot-reloadable resolver service.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use arc_swap::ArcSwap;
use attribute_resolver_sdk::{AttributeMap, ResolutionContext};
use tracing::{info, warn};

use crate::config::AttributeResolverConfig;

use super::builder::build_resolver;
use super::collaborators::Collaborators;
use super::engine::Resolver;
use super::error::{ConfigError, ResolutionError};

struct Loaded {
    resolver: Arc<Resolver>,
    timeout: Option<Duration>,
}

/// Serves requests from the active resolver and swaps in a new one on
/// reload. Requests already running keep the resolver they started with.
pub struct ResolverService {
    active: ArcSwap<Loaded>,
    collaborators: Collaborators,
    closed: AtomicBool,
}

impl ResolverService {
    /// Wraps an initialized resolver.
    #[must_use]
    pub fn new(resolver: Resolver, timeout: Option<Duration>) -> Self {
        Self {
            active: ArcSwap::from_pointee(Loaded {
                resolver: Arc::new(resolver),
                timeout,
            }),
            collaborators: Collaborators::default(),
            closed: AtomicBool::new(false),
        }
    }

    /// # Errors
    ///
    /// Returns the first configuration error; no service is created.
    pub async fn from_config(
        cfg: &AttributeResolverConfig,
        collaborators: Collaborators,
    ) -> Result<Self, ConfigError> {
        let resolver = build_resolver(cfg, &collaborators).await?;
        Ok(Self {
            active: ArcSwap::from_pointee(Loaded {
                resolver: Arc::new(resolver),
                timeout: cfg.timeout_ms.map(Duration::from_millis),
            }),
            collaborators,
            closed: AtomicBool::new(false),
        })
    }

    /// Builds a resolver from `cfg` and makes it active.
    ///
    /// # Errors
    ///
    /// On any configuration error the previous resolver stays active.
    pub async fn reload(&self, cfg: &AttributeResolverConfig) -> Result<(), ConfigError> {
        let resolver = match build_resolver(cfg, &self.collaborators).await {
            Ok(resolver) => resolver,
            Err(e) => {
                warn!(
                    resolver = %cfg.id,
                    error = %e,
                    "reload rejected, previous attribute resolver stays active"
                );
                return Err(e);
            }
        };
        self.active.store(Arc::new(Loaded {
            resolver: Arc::new(resolver),
            timeout: cfg.timeout_ms.map(Duration::from_millis),
        }));
        info!(resolver = %cfg.id, "attribute resolver reloaded");
        Ok(())
    }

    /// Destroys the active resolver. Later requests fail with
    /// [`ResolutionError::Unavailable`]; shutdown is final.
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
        self.active.load().resolver.destroy();
        info!("attribute resolver service shut down");
    }

    #[must_use]
    pub fn resolver(&self) -> Arc<Resolver> {
        Arc::clone(&self.active.load().resolver)
    }

    /// # Errors
    ///
    /// Returns [`ResolutionError::Unavailable`] after shutdown,
    /// [`ResolutionError::Timeout`] if the configured deadline elapses,
    /// otherwise whatever [`Resolver::resolve`] returns.
    pub async fn resolve(&self, ctx: &ResolutionContext) -> Result<AttributeMap, ResolutionError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ResolutionError::Unavailable("service is shut down".to_owned()));
        }
        let loaded = self.active.load_full();
        match loaded.timeout {
            Some(timeout) => tokio::time::timeout(timeout, loaded.resolver.resolve(ctx))
                .await
                .map_err(|_| ResolutionError::Timeout {
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                })?,
            None => loaded.resolver.resolve(ctx).await,
        }
    }
}
