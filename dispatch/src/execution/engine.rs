//! ExecutionEngine - invokes registered capabilities with caching, rate
//! limiting, circuit breaking, timeouts and bounded retry.
//!
//! # Pipeline
//! ```text
//! resolve -> circuit -> rate limit -> auth -> schema -> cache
//!         -> attempt loop { validate hook -> timeout(execute) -> backoff }
//! ```
//! Every stage short-circuits with a classified [`ExecutionFailure`] carried in
//! the returned [`CapabilityOutput`]; nothing is returned as `Err`.
//!
//! Validation failures are never retried and never reach the breaker. A
//! timeout ends the call without retrying but does count as a breaker failure.

use super::cache::{cache_key, CacheBackend};
use super::circuit_breaker::{CircuitBreaker, CircuitStatus};
use super::metrics::{MetricsRecorder, MetricsSnapshot};
use super::rate_limit::RateLimiter;
use super::types::{ExecuteOptions, WarmUpReport};
use crate::capability_registry::{Capability, CapabilityOutput, CapabilityRegistry};
use crate::config::EngineConfig;
use crate::error::ExecutionFailure;
use chrono::Utc;
use futures::future::join_all;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

pub struct ExecutionEngine {
    registry: Arc<CapabilityRegistry>,
    cache: Option<Arc<dyn CacheBackend>>,
    config: EngineConfig,
    metrics: MetricsRecorder,
    circuit_breaker: CircuitBreaker,
    rate_limiter: RateLimiter,
}

impl ExecutionEngine {
    pub fn new(registry: Arc<CapabilityRegistry>, config: EngineConfig) -> Self {
        Self {
            circuit_breaker: CircuitBreaker::new(
                config.circuit_failure_threshold,
                config.circuit_cooldown(),
            ),
            rate_limiter: RateLimiter::new(config.rate_limit_window()),
            metrics: MetricsRecorder::new(),
            cache: None,
            registry,
            config,
        }
    }

    /// Enable result caching through the given backend.
    pub fn with_cache(mut self, cache: Arc<dyn CacheBackend>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn registry(&self) -> &Arc<CapabilityRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Options seeded from the configured defaults.
    pub fn default_options(&self) -> ExecuteOptions {
        ExecuteOptions {
            use_cache: self.config.default_use_cache,
            retry_count: self.config.default_retry_count,
            ..ExecuteOptions::default()
        }
    }

    #[instrument(skip(self, input, options), fields(caller = ?options.caller_id))]
    pub async fn execute(
        &self,
        name: &str,
        input: Value,
        options: &ExecuteOptions,
    ) -> CapabilityOutput {
        let Some(capability) = self.registry.get(name).await else {
            debug!("capability not found");
            return CapabilityOutput::from_failure(ExecutionFailure::NotFound {
                name: name.to_string(),
            });
        };
        // Aliases share state with the canonical name
        let name = capability.metadata().name.clone();

        if let Err(failure) = self.admit(&capability, &name, &input, options) {
            return CapabilityOutput::from_failure(failure);
        }

        let key = match (&self.cache, options.use_cache) {
            (Some(cache), true) => {
                let key = cache_key(&name, &input);
                if let Some(hit) = self.cache_lookup(cache.as_ref(), &name, &key).await {
                    return hit;
                }
                Some(key)
            }
            _ => None,
        };

        self.run_attempts(&capability, &name, &input, options, key.as_deref())
            .await
    }

    /// Circuit, rate-limit, auth and schema checks, in that order.
    fn admit(
        &self,
        capability: &Arc<dyn Capability>,
        name: &str,
        input: &Value,
        options: &ExecuteOptions,
    ) -> Result<(), ExecutionFailure> {
        let metadata = capability.metadata();

        if self.circuit_breaker.is_open(name) {
            debug!(capability = %name, "rejected: circuit open");
            return Err(ExecutionFailure::CircuitOpen {
                name: name.to_string(),
            });
        }

        if let Some(limit) = metadata.rate_limit {
            let key = RateLimiter::window_key(name, options.caller_id.as_deref());
            if !self.rate_limiter.try_acquire(&key, limit) {
                warn!(capability = %name, window = %key, limit, "rate limit exceeded");
                return Err(ExecutionFailure::RateLimited {
                    name: name.to_string(),
                    limit,
                    window_secs: self.rate_limiter.window().as_secs(),
                });
            }
        }

        if metadata.requires_auth && options.caller_id.is_none() {
            return Err(ExecutionFailure::AuthRequired {
                name: name.to_string(),
                reason: "caller identity required".to_string(),
            });
        }
        if metadata.requires_admin && !options.caller_is_admin {
            return Err(ExecutionFailure::AuthRequired {
                name: name.to_string(),
                reason: "admin privileges required".to_string(),
            });
        }

        if let Some(class) = options.caller_class {
            if !metadata.allows_caller(class) {
                return Err(ExecutionFailure::AuthRequired {
                    name: name.to_string(),
                    reason: format!("caller class {:?} not allowed", class),
                });
            }
        }

        capability
            .input_schema()
            .validate(input)
            .map_err(|reason| ExecutionFailure::ValidationFailed {
                name: name.to_string(),
                reason,
            })
    }

    async fn cache_lookup(
        &self,
        cache: &dyn CacheBackend,
        name: &str,
        key: &str,
    ) -> Option<CapabilityOutput> {
        match cache.get(key).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<CapabilityOutput>(&bytes) {
                Ok(output) => {
                    self.metrics.record_cache_hit(name);
                    debug!(capability = %name, "cache hit");
                    return Some(output.with_metadata("cached", Value::Bool(true)));
                }
                Err(e) => warn!(capability = %name, error = %e, "discarding unreadable cache entry"),
            },
            Ok(None) => {}
            Err(e) => warn!(capability = %name, error = %e, "cache backend read failed"),
        }
        self.metrics.record_cache_miss(name);
        None
    }

    async fn run_attempts(
        &self,
        capability: &Arc<dyn Capability>,
        name: &str,
        input: &Value,
        options: &ExecuteOptions,
        cache_key: Option<&str>,
    ) -> CapabilityOutput {
        let max_attempts = options.retry_count.saturating_add(1);
        let timeout = options
            .timeout_override
            .unwrap_or_else(|| capability.metadata().default_timeout());
        let mut last_error = String::new();

        for attempt in 0..max_attempts {
            let started = Instant::now();

            if !capability.validate(input).await {
                return CapabilityOutput::from_failure(ExecutionFailure::ValidationFailed {
                    name: name.to_string(),
                    reason: "rejected by capability validator".to_string(),
                });
            }

            match tokio::time::timeout(timeout, capability.execute(input)).await {
                Ok(Ok(output)) => {
                    let elapsed = started.elapsed();
                    self.metrics.record_success(name, elapsed);
                    self.circuit_breaker.record_success(name);
                    let output = self.finish(capability, output, elapsed, attempt + 1);
                    if let Some(key) = cache_key {
                        self.cache_store(name, key, &output).await;
                    }
                    return output;
                }
                Ok(Err(e)) => {
                    last_error = e.to_string();
                    self.metrics
                        .record_failure(name, started.elapsed(), &last_error);
                    self.circuit_breaker.record_failure(name);
                    warn!(
                        capability = %name,
                        attempt = attempt + 1,
                        max_attempts,
                        error = %last_error,
                        "capability execution failed"
                    );

                    if attempt + 1 < max_attempts {
                        let delay = self.backoff(attempt);
                        debug!(capability = %name, delay_ms = delay.as_millis() as u64, "retrying after backoff");
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(_) => {
                    self.metrics
                        .record_failure(name, started.elapsed(), "timeout");
                    self.circuit_breaker.record_failure(name);
                    warn!(capability = %name, timeout_ms = timeout.as_millis() as u64, "capability timed out");
                    return CapabilityOutput::from_failure(ExecutionFailure::Timeout {
                        name: name.to_string(),
                        timeout,
                    });
                }
            }
        }

        CapabilityOutput::from_failure(ExecutionFailure::ExecutionFailed {
            name: name.to_string(),
            attempts: max_attempts,
            last_error,
        })
    }

    /// `backoff_base * 2^attempt`: 1s, 2s, 4s, ... with the default base.
    fn backoff(&self, attempt: u32) -> Duration {
        self.config
            .backoff_base()
            .saturating_mul(2u32.saturating_pow(attempt))
    }

    fn finish(
        &self,
        capability: &Arc<dyn Capability>,
        mut output: CapabilityOutput,
        elapsed: Duration,
        attempts: u32,
    ) -> CapabilityOutput {
        let metadata = capability.metadata();

        if output.success {
            if let Err(reason) = capability.output_schema().validate(&output.data) {
                warn!(capability = %metadata.name, %reason, "output does not match declared schema");
            }
        }

        output
            .metadata
            .insert("execution_time".to_string(), json!(elapsed.as_secs_f64()));
        output
            .metadata
            .insert("version".to_string(), json!(metadata.version.to_string()));
        output
            .metadata
            .insert("timestamp".to_string(), json!(Utc::now().to_rfc3339()));
        output
            .metadata
            .insert("attempts".to_string(), json!(attempts));
        output
    }

    /// Write-through for successful outputs only.
    async fn cache_store(&self, name: &str, key: &str, output: &CapabilityOutput) {
        let Some(cache) = &self.cache else {
            return;
        };
        if !output.success {
            return;
        }
        let bytes = match serde_json::to_vec(output) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(capability = %name, error = %e, "could not serialize output for cache");
                return;
            }
        };
        if let Err(e) = cache.set_with_ttl(key, bytes, self.config.cache_ttl()).await {
            warn!(capability = %name, error = %e, "cache backend write failed");
        }
    }

    /// Re-run `on_load` for each capability ahead of traffic.
    ///
    /// Failures are collected per capability and never abort the batch.
    pub async fn warm_up(&self, names: &[&str]) -> WarmUpReport {
        let outcomes = join_all(names.iter().map(|name| async move {
            let result = match self.registry.get(name).await {
                Some(capability) => capability.on_load().await.map_err(|e| e.to_string()),
                None => Err("capability not found".to_string()),
            };
            (name.to_string(), result)
        }))
        .await;

        let mut report = WarmUpReport::default();
        for (name, result) in outcomes {
            match result {
                Ok(()) => {
                    info!(capability = %name, "capability warmed up");
                    report.warmed.push(name);
                }
                Err(error) => {
                    warn!(capability = %name, %error, "warm-up failed");
                    report.failed.push((name, error));
                }
            }
        }
        report
    }

    pub fn get_metrics(&self, name: &str) -> Option<MetricsSnapshot> {
        self.metrics.snapshot(name)
    }

    pub fn get_all_metrics(&self) -> BTreeMap<String, MetricsSnapshot> {
        self.metrics.snapshot_all()
    }

    pub fn circuit_status(&self, name: &str) -> CircuitStatus {
        self.circuit_breaker.status(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability_registry::{factory, CapabilityMetadata, SemanticVersion};
    use crate::error::CapabilityError;
    use async_trait::async_trait;

    struct Flaky {
        metadata: CapabilityMetadata,
        valid: bool,
    }

    #[async_trait]
    impl Capability for Flaky {
        fn metadata(&self) -> &CapabilityMetadata {
            &self.metadata
        }

        async fn execute(&self, _input: &Value) -> Result<CapabilityOutput, CapabilityError> {
            Err(CapabilityError::Execution("upstream 503".to_string()))
        }

        async fn validate(&self, _input: &Value) -> bool {
            self.valid
        }
    }

    async fn engine_with(valid: bool) -> ExecutionEngine {
        let registry = Arc::new(CapabilityRegistry::new());
        registry
            .register(
                factory(move |_| {
                    Ok(Flaky {
                        metadata: CapabilityMetadata::new(
                            "crm.lookup",
                            SemanticVersion::new(1, 0, 0),
                        ),
                        valid,
                    })
                }),
                Value::Null,
            )
            .await
            .unwrap();
        ExecutionEngine::new(registry, EngineConfig::default())
    }

    #[test]
    fn test_backoff_doubles() {
        let engine = ExecutionEngine::new(
            Arc::new(CapabilityRegistry::new()),
            EngineConfig::default(),
        );
        assert_eq!(engine.backoff(0), Duration::from_secs(1));
        assert_eq!(engine.backoff(1), Duration::from_secs(2));
        assert_eq!(engine.backoff(2), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_validate_hook_failure_is_not_retried() {
        let engine = engine_with(false).await;
        let out = engine
            .execute("crm.lookup", Value::Null, &ExecuteOptions::new().with_retries(3))
            .await;

        assert_eq!(
            out.failure.map(|f| f.kind()),
            Some(crate::error::FailureKind::ValidationFailed)
        );
        assert_eq!(engine.circuit_status("crm.lookup"), CircuitStatus::Closed);
        assert!(engine.get_metrics("crm.lookup").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_failed_attempt_is_recorded() {
        let engine = engine_with(true).await;
        let out = engine
            .execute("crm.lookup", Value::Null, &ExecuteOptions::new().with_retries(1))
            .await;

        assert!(!out.success);
        let metrics = engine.get_metrics("crm.lookup").unwrap();
        assert_eq!(metrics.calls, 2);
        assert_eq!(metrics.failures, 2);
        assert_eq!(
            metrics.last_error.as_deref(),
            Some("Execution error: upstream 503")
        );
    }
}
