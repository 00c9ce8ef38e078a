//! Error types for the dispatch layer.
//!
//! Capability implementations raise [`CapabilityError`]; the execution engine
//! classifies those into an [`ExecutionFailure`] that is carried inside the
//! returned output instead of crossing the `execute()` boundary as an `Err`.

use std::time::Duration;
use thiserror::Error;

/// Errors raised by a capability implementation or its lifecycle hooks.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CapabilityError {
    #[error("Execution error: {0}")]
    Execution(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised by registry lifecycle operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Capability '{0}' not found")]
    NotFound(String),
    #[error("Failed to instantiate capability: {0}")]
    InstantiationFailed(String),
    #[error("on_load hook failed for capability '{name}': {message}")]
    OnLoadFailed { name: String, message: String },
    #[error("Invalid version: {0}")]
    InvalidVersion(String),
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),
}

/// Errors surfaced by a cache backend.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    Backend(String),
    #[error("Cache serialization error: {0}")]
    Serde(String),
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        CacheError::Serde(e.to_string())
    }
}

/// Terminal conditions of a single `execute()` call.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExecutionFailure {
    #[error("Capability '{name}' not found")]
    NotFound { name: String },

    #[error("Circuit breaker OPEN for capability '{name}' - requests blocked")]
    CircuitOpen { name: String },

    #[error("Rate limit exceeded for capability '{name}' ({limit} calls per {window_secs}s)")]
    RateLimited {
        name: String,
        limit: u32,
        window_secs: u64,
    },

    #[error("Authentication required for capability '{name}': {reason}")]
    AuthRequired { name: String, reason: String },

    #[error("Input validation failed for capability '{name}': {reason}")]
    ValidationFailed { name: String, reason: String },

    #[error("Capability '{name}' timed out after {}ms", .timeout.as_millis())]
    Timeout { name: String, timeout: Duration },

    #[error("Capability '{name}' execution failed after {attempts} attempts: {last_error}")]
    ExecutionFailed {
        name: String,
        attempts: u32,
        last_error: String,
    },
}

/// Discriminant of [`ExecutionFailure`], convenient for branching and metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    NotFound,
    CircuitOpen,
    RateLimited,
    AuthRequired,
    ValidationFailed,
    Timeout,
    ExecutionFailed,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::NotFound => "not_found",
            FailureKind::CircuitOpen => "circuit_open",
            FailureKind::RateLimited => "rate_limited",
            FailureKind::AuthRequired => "auth_required",
            FailureKind::ValidationFailed => "validation_failed",
            FailureKind::Timeout => "timeout",
            FailureKind::ExecutionFailed => "execution_failed",
        }
    }
}

impl ExecutionFailure {
    pub fn kind(&self) -> FailureKind {
        match self {
            ExecutionFailure::NotFound { .. } => FailureKind::NotFound,
            ExecutionFailure::CircuitOpen { .. } => FailureKind::CircuitOpen,
            ExecutionFailure::RateLimited { .. } => FailureKind::RateLimited,
            ExecutionFailure::AuthRequired { .. } => FailureKind::AuthRequired,
            ExecutionFailure::ValidationFailed { .. } => FailureKind::ValidationFailed,
            ExecutionFailure::Timeout { .. } => FailureKind::Timeout,
            ExecutionFailure::ExecutionFailed { .. } => FailureKind::ExecutionFailed,
        }
    }

    /// Capability name the failure refers to.
    pub fn capability(&self) -> &str {
        match self {
            ExecutionFailure::NotFound { name }
            | ExecutionFailure::CircuitOpen { name }
            | ExecutionFailure::RateLimited { name, .. }
            | ExecutionFailure::AuthRequired { name, .. }
            | ExecutionFailure::ValidationFailed { name, .. }
            | ExecutionFailure::Timeout { name, .. }
            | ExecutionFailure::ExecutionFailed { name, .. } => name,
        }
    }

    /// Retry-later signals.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ExecutionFailure::RateLimited { .. } | ExecutionFailure::CircuitOpen { .. }
        )
    }

    /// Failures the caller can fix by changing the request.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            ExecutionFailure::AuthRequired { .. } | ExecutionFailure::ValidationFailed { .. }
        )
    }

    /// Backend-health signals worth surfacing to an operator.
    pub fn is_backend_fault(&self) -> bool {
        matches!(
            self,
            ExecutionFailure::Timeout { .. } | ExecutionFailure::ExecutionFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_classification() {
        let limited = ExecutionFailure::RateLimited {
            name: "pricing.get".to_string(),
            limit: 2,
            window_secs: 60,
        };
        assert!(limited.is_transient());
        assert!(!limited.is_backend_fault());
        assert_eq!(limited.kind().as_str(), "rate_limited");
        assert_eq!(limited.capability(), "pricing.get");

        let timeout = ExecutionFailure::Timeout {
            name: "gmail.send".to_string(),
            timeout: Duration::from_millis(1500),
        };
        assert!(timeout.is_backend_fault());
        assert_eq!(
            timeout.to_string(),
            "Capability 'gmail.send' timed out after 1500ms"
        );
    }

    #[test]
    fn test_execution_failed_message_reports_attempts() {
        let failure = ExecutionFailure::ExecutionFailed {
            name: "crm.lookup".to_string(),
            attempts: 3,
            last_error: "boom".to_string(),
        };
        assert!(failure.to_string().contains("after 3 attempts"));
    }
}
