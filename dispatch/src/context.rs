//! DispatchContext - one registry, engine and router owned together.
//!
//! Every piece of mutable dispatch state (metrics, breakers, rate windows,
//! registry slots, routing counters) hangs off this value, so independent
//! contexts never observe each other.

use crate::capability_registry::CapabilityRegistry;
use crate::config::{ConfigError, DispatchConfig};
use crate::execution::{CacheBackend, ExecutionEngine};
use crate::routing::AdaptiveCollectionRouter;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub struct DispatchContext {
    config: DispatchConfig,
    registry: Arc<CapabilityRegistry>,
    engine: ExecutionEngine,
    router: AdaptiveCollectionRouter,
}

impl Default for DispatchContext {
    fn default() -> Self {
        Self::new(DispatchConfig::default())
    }
}

impl DispatchContext {
    /// Context without a result cache.
    pub fn new(config: DispatchConfig) -> Self {
        let registry = Arc::new(CapabilityRegistry::new());
        let engine = ExecutionEngine::new(registry.clone(), config.engine.clone());
        let router = AdaptiveCollectionRouter::new(config.router.clone());
        info!(
            circuit_threshold = config.engine.circuit_failure_threshold,
            cache_ttl_secs = config.engine.cache_ttl_secs,
            "dispatch context ready"
        );
        Self {
            config,
            registry,
            engine,
            router,
        }
    }

    pub fn with_cache(config: DispatchConfig, cache: Arc<dyn CacheBackend>) -> Self {
        let mut context = Self::new(config);
        context.engine = context.engine.with_cache(cache);
        context
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Ok(Self::new(DispatchConfig::from_file(path)?))
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<CapabilityRegistry> {
        &self.registry
    }

    pub fn engine(&self) -> &ExecutionEngine {
        &self.engine
    }

    pub fn router(&self) -> &AdaptiveCollectionRouter {
        &self.router
    }
}
