//! Capability execution: the resilience pipeline wrapped around every call.

pub mod cache;
pub mod circuit_breaker;
pub mod engine;
pub mod metrics;
pub mod rate_limit;
pub mod types;

pub use cache::{cache_key, CacheBackend, InMemoryCacheBackend};
pub use circuit_breaker::{CircuitBreaker, CircuitStatus};
pub use engine::ExecutionEngine;
pub use metrics::{ExecutionMetrics, MetricsRecorder, MetricsSnapshot};
pub use rate_limit::RateLimiter;
pub use types::{ExecuteOptions, WarmUpReport};
