//! Configuration types for the dispatch layer.
//!
//! Defaults reproduce the production constants: a breaker that opens after 5
//! consecutive failures for 60s, 60s rate-limit windows, one hour cache TTL,
//! 1s base backoff, and 0.7 / 0.3 routing confidence bands.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::routing::Domain;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub engine: EngineConfig,
    pub router: RouterConfig,
}

/// Execution engine tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Consecutive failures before the breaker opens
    pub circuit_failure_threshold: u32,
    /// Seconds after the last failure before the breaker resets
    pub circuit_cooldown_secs: u64,
    /// Trailing window used for per-caller rate limits
    pub rate_limit_window_secs: u64,
    /// Time-to-live handed to the cache backend on write
    pub cache_ttl_secs: u64,
    /// Backoff before retry N is `backoff_base_secs * 2^N`
    pub backoff_base_secs: f64,
    pub default_use_cache: bool,
    pub default_retry_count: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            circuit_failure_threshold: 5,
            circuit_cooldown_secs: 60,
            rate_limit_window_secs: 60,
            cache_ttl_secs: 3600,
            backoff_base_secs: 1.0,
            default_use_cache: true,
            default_retry_count: 0,
        }
    }
}

impl EngineConfig {
    pub fn circuit_cooldown(&self) -> Duration {
        Duration::from_secs(self.circuit_cooldown_secs)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_secs_f64(self.backoff_base_secs.max(0.0))
    }
}

/// Collection router tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Confidence at or above which only the primary collection is returned
    pub high_confidence: f64,
    /// Confidence below which the full fallback chain is returned
    pub low_confidence: f64,
    pub max_fallbacks: usize,
    /// Per-domain keyword lists replacing the built-in curated ones
    pub keywords: BTreeMap<String, Vec<String>>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            high_confidence: 0.7,
            low_confidence: 0.3,
            max_fallbacks: 3,
            keywords: BTreeMap::new(),
        }
    }
}

impl DispatchConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: DispatchConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `DISPATCH_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides from an arbitrary key lookup (environment, secrets, tests).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parse<T: std::str::FromStr>(key: &str, raw: String) -> Result<T, ConfigError>
        where
            T::Err: std::fmt::Display,
        {
            raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })
        }

        macro_rules! override_field {
            ($key:literal, $field:expr) => {
                if let Some(raw) = lookup($key) {
                    $field = parse($key, raw)?;
                }
            };
        }

        override_field!(
            "DISPATCH_CIRCUIT_FAILURE_THRESHOLD",
            self.engine.circuit_failure_threshold
        );
        override_field!(
            "DISPATCH_CIRCUIT_COOLDOWN_SECS",
            self.engine.circuit_cooldown_secs
        );
        override_field!(
            "DISPATCH_RATE_LIMIT_WINDOW_SECS",
            self.engine.rate_limit_window_secs
        );
        override_field!("DISPATCH_CACHE_TTL_SECS", self.engine.cache_ttl_secs);
        override_field!("DISPATCH_BACKOFF_BASE_SECS", self.engine.backoff_base_secs);
        override_field!("DISPATCH_USE_CACHE", self.engine.default_use_cache);
        override_field!("DISPATCH_RETRY_COUNT", self.engine.default_retry_count);
        override_field!("DISPATCH_ROUTER_HIGH_CONFIDENCE", self.router.high_confidence);
        override_field!("DISPATCH_ROUTER_LOW_CONFIDENCE", self.router.low_confidence);
        override_field!("DISPATCH_ROUTER_MAX_FALLBACKS", self.router.max_fallbacks);

        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: &str| ConfigError::InvalidValue {
            key: key.to_string(),
            message: message.to_string(),
        };

        if self.engine.circuit_failure_threshold == 0 {
            return Err(invalid(
                "engine.circuit_failure_threshold",
                "must be at least 1",
            ));
        }
        if self.engine.rate_limit_window_secs == 0 {
            return Err(invalid("engine.rate_limit_window_secs", "must be positive"));
        }
        if !self.engine.backoff_base_secs.is_finite() || self.engine.backoff_base_secs < 0.0 {
            return Err(invalid(
                "engine.backoff_base_secs",
                "must be a non-negative number",
            ));
        }

        let band = 0.0..=1.0;
        if !band.contains(&self.router.low_confidence) || !band.contains(&self.router.high_confidence)
        {
            return Err(invalid("router", "confidence thresholds must lie in [0, 1]"));
        }
        if self.router.low_confidence >= self.router.high_confidence {
            return Err(invalid(
                "router.low_confidence",
                "must be lower than router.high_confidence",
            ));
        }
        for domain in self.router.keywords.keys() {
            if Domain::from_name(domain).is_none() {
                return Err(ConfigError::InvalidValue {
                    key: format!("router.keywords.{}", domain),
                    message: "unknown domain".to_string(),
                });
            }
        }

        Ok(())
    }
}
