//! Resilient dispatch layer.
//!
//! Sits between a conversational orchestrator and two kinds of downstream
//! resources:
//!
//! - **Capabilities**: named, versioned units of async work held in a
//!   [`CapabilityRegistry`] and invoked through the [`ExecutionEngine`], which
//!   wraps each call with caching, per-caller rate limiting, auth checks,
//!   schema validation, circuit breaking, timeouts and bounded retry.
//! - **Knowledge collections**: the [`AdaptiveCollectionRouter`] scores a free
//!   text query against curated domain keywords, picks a primary collection,
//!   attaches a confidence score and expands to a fallback chain when unsure.
//!
//! [`DispatchContext`] owns one of each, built from a [`DispatchConfig`].

pub mod capability_registry;
pub mod config;
pub mod context;
pub mod error;
pub mod execution;
pub mod logging;
pub mod routing;

pub use capability_registry::{
    factory, CallerClass, Capability, CapabilityConfig, CapabilityFactory, CapabilityMetadata,
    CapabilityOutput, CapabilityQuery, CapabilityRegistry, PayloadSchema, SemanticVersion,
};
pub use config::{ConfigError, DispatchConfig, EngineConfig, RouterConfig};
pub use context::DispatchContext;
pub use error::{CacheError, CapabilityError, ExecutionFailure, FailureKind, RegistryError};
pub use execution::{
    CacheBackend, CircuitStatus, ExecuteOptions, ExecutionEngine, InMemoryCacheBackend,
    MetricsSnapshot, WarmUpReport,
};
pub use routing::{
    AdaptiveCollectionRouter, Collection, Domain, FallbackStats, RoutingAnalysis, RoutingDecision,
};
