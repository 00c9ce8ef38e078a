//! Per-capability execution statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct ExecutionMetrics {
    pub calls: u64,
    pub successes: u64,
    pub failures: u64,
    pub total_time: Duration,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub last_error: Option<String>,
    pub last_success: Option<DateTime<Utc>>,
}

impl ExecutionMetrics {
    fn record_success(&mut self, elapsed: Duration) {
        self.calls += 1;
        self.successes += 1;
        self.total_time += elapsed;
        self.last_success = Some(Utc::now());
    }

    fn record_failure(&mut self, elapsed: Duration, error: &str) {
        self.calls += 1;
        self.failures += 1;
        self.total_time += elapsed;
        self.last_error = Some(error.to_string());
    }

    pub fn avg_time(&self) -> f64 {
        if self.calls == 0 {
            0.0
        } else {
            self.total_time.as_secs_f64() / self.calls as f64
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.calls == 0 {
            0.0
        } else {
            self.successes as f64 / self.calls as f64
        }
    }

    /// Hits relative to successes plus hits. Failures and misses are not in
    /// the denominator; dashboards built on this figure depend on it.
    pub fn cache_hit_rate(&self) -> f64 {
        let denominator = self.successes + self.cache_hits;
        if denominator == 0 {
            0.0
        } else {
            self.cache_hits as f64 / denominator as f64
        }
    }
}

/// Read-only view handed to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub name: String,
    pub calls: u64,
    pub successes: u64,
    pub failures: u64,
    pub total_time: f64,
    pub avg_time: f64,
    pub success_rate: f64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_hit_rate: f64,
    pub last_error: Option<String>,
    pub last_success: Option<DateTime<Utc>>,
}

impl MetricsSnapshot {
    fn from_metrics(name: &str, m: &ExecutionMetrics) -> Self {
        Self {
            name: name.to_string(),
            calls: m.calls,
            successes: m.successes,
            failures: m.failures,
            total_time: m.total_time.as_secs_f64(),
            avg_time: m.avg_time(),
            success_rate: m.success_rate(),
            cache_hits: m.cache_hits,
            cache_misses: m.cache_misses,
            cache_hit_rate: m.cache_hit_rate(),
            last_error: m.last_error.clone(),
            last_success: m.last_success,
        }
    }
}

/// Accumulated metrics keyed by canonical capability name.
#[derive(Debug, Default)]
pub struct MetricsRecorder {
    metrics: Mutex<HashMap<String, ExecutionMetrics>>,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_entry<R>(&self, name: &str, f: impl FnOnce(&mut ExecutionMetrics) -> R) -> R {
        let mut metrics = self.metrics.lock().unwrap_or_else(PoisonError::into_inner);
        f(metrics.entry(name.to_string()).or_default())
    }

    pub fn record_success(&self, name: &str, elapsed: Duration) {
        self.with_entry(name, |m| m.record_success(elapsed));
    }

    pub fn record_failure(&self, name: &str, elapsed: Duration, error: &str) {
        self.with_entry(name, |m| m.record_failure(elapsed, error));
    }

    pub fn record_cache_hit(&self, name: &str) {
        self.with_entry(name, |m| m.cache_hits += 1);
    }

    pub fn record_cache_miss(&self, name: &str) {
        self.with_entry(name, |m| m.cache_misses += 1);
    }

    pub fn snapshot(&self, name: &str) -> Option<MetricsSnapshot> {
        let metrics = self.metrics.lock().unwrap_or_else(PoisonError::into_inner);
        metrics
            .get(name)
            .map(|m| MetricsSnapshot::from_metrics(name, m))
    }

    pub fn snapshot_all(&self) -> BTreeMap<String, MetricsSnapshot> {
        let metrics = self.metrics.lock().unwrap_or_else(PoisonError::into_inner);
        metrics
            .iter()
            .map(|(name, m)| (name.clone(), MetricsSnapshot::from_metrics(name, m)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_metrics_recording() {
        let recorder = MetricsRecorder::new();
        recorder.record_success("crm.lookup", Duration::from_millis(100));
        recorder.record_success("crm.lookup", Duration::from_millis(200));
        recorder.record_failure("crm.lookup", Duration::from_millis(300), "boom");

        let snap = recorder.snapshot("crm.lookup").unwrap();
        assert_eq!(snap.calls, 3);
        assert_eq!(snap.successes, 2);
        assert_eq!(snap.failures, 1);
        assert!((snap.avg_time - 0.2).abs() < 1e-9);
        assert!((snap.success_rate - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(snap.last_error.as_deref(), Some("boom"));
        assert!(snap.last_success.is_some());
    }

    #[test]
    fn test_rates_guard_zero_denominators() {
        let m = ExecutionMetrics::default();
        assert_eq!(m.avg_time(), 0.0);
        assert_eq!(m.success_rate(), 0.0);
        assert_eq!(m.cache_hit_rate(), 0.0);
    }

    #[test]
    fn test_cache_hit_rate_ignores_failures_and_misses() {
        let recorder = MetricsRecorder::new();
        recorder.record_success("pricing.get", Duration::from_millis(10));
        recorder.record_failure("pricing.get", Duration::from_millis(10), "x");
        recorder.record_cache_miss("pricing.get");
        recorder.record_cache_miss("pricing.get");
        recorder.record_cache_hit("pricing.get");

        let snap = recorder.snapshot("pricing.get").unwrap();
        assert_eq!(snap.cache_hit_rate, 0.5);
        assert!(recorder.snapshot("unknown").is_none());
        assert_eq!(recorder.snapshot_all().len(), 1);
    }
}
