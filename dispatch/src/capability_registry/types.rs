//! Capability descriptors, the capability trait and query filters.

use super::schema::PayloadSchema;
use super::versioning::SemanticVersion;
use crate::error::{CapabilityError, ExecutionFailure};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

/// Free-form configuration handed to a capability factory.
pub type CapabilityConfig = Value;

/// Classes of orchestrator callers that may invoke a capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallerClass {
    /// Low-latency model tier used for quick conversational turns
    FastModel,
    /// Full reasoning model tier
    FullModel,
}

/// Immutable descriptor of a registered capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityMetadata {
    /// Globally unique dotted name (e.g. "gmail.send")
    pub name: String,
    pub version: SemanticVersion,
    pub description: String,
    pub category: String,
    pub tags: Vec<String>,
    pub requires_auth: bool,
    pub requires_admin: bool,
    /// Maximum calls per rolling rate-limit window, if limited
    pub rate_limit: Option<u32>,
    /// Expected execution time in seconds; the default timeout is twice this
    pub estimated_time: f64,
    pub allowed_callers: Vec<CallerClass>,
    /// Secondary lookup key kept for callers using an older name
    pub legacy_alias: Option<String>,
}

impl CapabilityMetadata {
    pub fn new(name: impl Into<String>, version: SemanticVersion) -> Self {
        Self {
            name: name.into(),
            version,
            description: String::new(),
            category: "general".to_string(),
            tags: Vec::new(),
            requires_auth: false,
            requires_admin: false,
            rate_limit: None,
            estimated_time: 1.0,
            allowed_callers: vec![CallerClass::FastModel, CallerClass::FullModel],
            legacy_alias: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn requiring_auth(mut self) -> Self {
        self.requires_auth = true;
        self
    }

    pub fn requiring_admin(mut self) -> Self {
        self.requires_admin = true;
        self
    }

    pub fn with_rate_limit(mut self, calls_per_window: u32) -> Self {
        self.rate_limit = Some(calls_per_window);
        self
    }

    pub fn with_estimated_time(mut self, seconds: f64) -> Self {
        self.estimated_time = seconds;
        self
    }

    pub fn with_allowed_callers(mut self, callers: Vec<CallerClass>) -> Self {
        self.allowed_callers = callers;
        self
    }

    pub fn with_legacy_alias(mut self, alias: impl Into<String>) -> Self {
        self.legacy_alias = Some(alias.into());
        self
    }

    /// Timeout applied when the caller does not override it.
    ///
    /// Negative or NaN estimates give a zero timeout; estimates beyond what a
    /// `Duration` can hold give `Duration::MAX`.
    pub fn default_timeout(&self) -> Duration {
        let secs = (self.estimated_time * 2.0).max(0.0);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    pub fn allows_caller(&self, caller: CallerClass) -> bool {
        self.allowed_callers.contains(&caller)
    }
}

/// Result of a capability invocation as seen by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityOutput {
    pub success: bool,
    pub data: Value,
    pub error: Option<String>,
    /// Classified engine failure; never serialized into the cache
    #[serde(skip)]
    pub failure: Option<ExecutionFailure>,
    pub metadata: Map<String, Value>,
}

impl CapabilityOutput {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data,
            error: None,
            failure: None,
            metadata: Map::new(),
        }
    }

    /// Unsuccessful result reported by the capability itself (it did not raise).
    pub fn unsuccessful(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Value::Null,
            error: Some(message.into()),
            failure: None,
            metadata: Map::new(),
        }
    }

    pub fn from_failure(failure: ExecutionFailure) -> Self {
        let mut metadata = Map::new();
        metadata.insert(
            "failure_kind".to_string(),
            Value::String(failure.kind().as_str().to_string()),
        );
        metadata.insert(
            "capability".to_string(),
            Value::String(failure.capability().to_string()),
        );
        Self {
            success: false,
            data: Value::Null,
            error: Some(failure.to_string()),
            failure: Some(failure),
            metadata,
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// A named, versioned unit of business logic.
///
/// Implementations only need `metadata` and `execute`; schemas default to
/// accepting anything and the hooks default to no-ops.
#[async_trait]
pub trait Capability: Send + Sync {
    fn metadata(&self) -> &CapabilityMetadata;

    fn input_schema(&self) -> PayloadSchema {
        PayloadSchema::any()
    }

    fn output_schema(&self) -> PayloadSchema {
        PayloadSchema::any()
    }

    async fn execute(&self, input: &Value) -> Result<CapabilityOutput, CapabilityError>;

    /// Capability-specific check run before every attempt.
    async fn validate(&self, _input: &Value) -> bool {
        true
    }

    async fn on_load(&self) -> Result<(), CapabilityError> {
        Ok(())
    }

    async fn on_unload(&self) -> Result<(), CapabilityError> {
        Ok(())
    }
}

/// Builds a live capability instance from its configuration.
///
/// The registry keeps the factory alongside the config so `reload` can rebuild
/// the instance without process restart.
pub type CapabilityFactory =
    Arc<dyn Fn(CapabilityConfig) -> Result<Arc<dyn Capability>, CapabilityError> + Send + Sync>;

/// Wrap a constructor closure into a [`CapabilityFactory`].
pub fn factory<F, C>(build: F) -> CapabilityFactory
where
    F: Fn(CapabilityConfig) -> Result<C, CapabilityError> + Send + Sync + 'static,
    C: Capability + 'static,
{
    Arc::new(move |config| build(config).map(|c| Arc::new(c) as Arc<dyn Capability>))
}

/// Filters for [`CapabilityRegistry::list`](super::CapabilityRegistry::list).
///
/// Semantics:
/// - category: exact match, case-insensitive.
/// - tags_any: OR across provided tags. Empty means no tag filtering.
/// - caller: the capability must allow this caller class.
#[derive(Debug, Clone, Default)]
pub struct CapabilityQuery {
    pub category: Option<String>,
    pub tags_any: Vec<String>,
    pub caller: Option<CallerClass>,
}

impl CapabilityQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags_any = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_caller(mut self, caller: CallerClass) -> Self {
        self.caller = Some(caller);
        self
    }

    pub fn matches(&self, metadata: &CapabilityMetadata) -> bool {
        if let Some(ref category) = self.category {
            if !metadata.category.eq_ignore_ascii_case(category) {
                return false;
            }
        }

        if !self.tags_any.is_empty()
            && !self
                .tags_any
                .iter()
                .any(|t| metadata.tags.iter().any(|mt| mt.eq_ignore_ascii_case(t)))
        {
            return false;
        }

        if let Some(caller) = self.caller {
            if !metadata.allows_caller(caller) {
                return false;
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> CapabilityMetadata {
        CapabilityMetadata::new("gmail.send", SemanticVersion::new(1, 2, 0))
            .with_category("communication")
            .with_tags(["email", "outbound"])
            .with_estimated_time(2.5)
            .with_allowed_callers(vec![CallerClass::FullModel])
    }

    #[test]
    fn test_default_timeout_is_twice_estimate() {
        assert_eq!(sample().default_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_default_timeout_saturates_on_extreme_estimates() {
        let huge = sample().with_estimated_time(1e20);
        assert_eq!(huge.default_timeout(), Duration::MAX);
        let infinite = sample().with_estimated_time(f64::INFINITY);
        assert_eq!(infinite.default_timeout(), Duration::MAX);
        let nan = sample().with_estimated_time(f64::NAN);
        assert_eq!(nan.default_timeout(), Duration::ZERO);
        let negative = sample().with_estimated_time(-3.0);
        assert_eq!(negative.default_timeout(), Duration::ZERO);
    }

    #[test]
    fn test_query_filters() {
        let meta = sample();
        assert!(CapabilityQuery::new().matches(&meta));
        assert!(CapabilityQuery::new()
            .with_category("Communication")
            .matches(&meta));
        assert!(!CapabilityQuery::new().with_category("crm").matches(&meta));
        assert!(CapabilityQuery::new()
            .with_tags(["calendar", "EMAIL"])
            .matches(&meta));
        assert!(!CapabilityQuery::new().with_tags(["calendar"]).matches(&meta));
        assert!(!CapabilityQuery::new()
            .with_caller(CallerClass::FastModel)
            .matches(&meta));
    }

    #[test]
    fn test_failure_output_carries_kind() {
        let out = CapabilityOutput::from_failure(ExecutionFailure::NotFound {
            name: "x.y".to_string(),
        });
        assert!(!out.success);
        assert_eq!(out.metadata.get("failure_kind"), Some(&json!("not_found")));
        assert_eq!(out.error.as_deref(), Some("Capability 'x.y' not found"));
    }
}
