//! Options and reports for the execution engine.

use crate::capability_registry::CallerClass;
use serde::Serialize;
use std::time::Duration;

/// Per-call options for [`ExecutionEngine::execute`](super::ExecutionEngine::execute).
#[derive(Debug, Clone, PartialEq)]
pub struct ExecuteOptions {
    pub use_cache: bool,
    /// Caller identity; also scopes the rate-limit window
    pub caller_id: Option<String>,
    pub caller_is_admin: bool,
    /// Model tier issuing the call; checked against `allowed_callers`
    pub caller_class: Option<CallerClass>,
    /// Replaces the default `2 x estimated_time` timeout
    pub timeout_override: Option<Duration>,
    /// Extra attempts after the first one for non-timeout failures
    pub retry_count: u32,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            caller_id: None,
            caller_is_admin: false,
            caller_class: None,
            timeout_override: None,
            retry_count: 0,
        }
    }
}

impl ExecuteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_caller(mut self, caller_id: impl Into<String>) -> Self {
        self.caller_id = Some(caller_id.into());
        self
    }

    pub fn as_admin(mut self) -> Self {
        self.caller_is_admin = true;
        self
    }

    pub fn from_class(mut self, caller_class: CallerClass) -> Self {
        self.caller_class = Some(caller_class);
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_override = Some(timeout);
        self
    }

    pub fn with_retries(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }
}

/// Outcome of [`ExecutionEngine::warm_up`](super::ExecutionEngine::warm_up).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WarmUpReport {
    pub warmed: Vec<String>,
    /// (capability, error message)
    pub failed: Vec<(String, String)>,
}

impl WarmUpReport {
    pub fn all_warmed(&self) -> bool {
        self.failed.is_empty()
    }
}
