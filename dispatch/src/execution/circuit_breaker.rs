//! Circuit breaker - stops invoking capabilities that keep failing.
//!
//! A record is created lazily on the first failure and removed on the next
//! success or once the cooldown has elapsed since the last recorded failure.
//! The breaker is open iff `consecutive_failures >= threshold` and the last
//! failure is younger than the cooldown.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;

#[derive(Debug, Clone)]
struct CircuitState {
    consecutive_failures: u32,
    last_failure: Instant,
}

/// Diagnostic view of one breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CircuitStatus {
    Closed,
    /// Failures recorded but below the threshold
    Degraded { consecutive_failures: u32 },
    Open { retry_after_ms: u64 },
}

#[derive(Debug)]
pub struct CircuitBreaker {
    failure_threshold: u32,
    cooldown: Duration,
    circuits: Mutex<HashMap<String, CircuitState>>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            failure_threshold,
            cooldown,
            circuits: Mutex::new(HashMap::new()),
        }
    }

    /// Whether calls must be rejected right now. Expired records are dropped.
    pub fn is_open(&self, name: &str) -> bool {
        matches!(self.status(name), CircuitStatus::Open { .. })
    }

    pub fn status(&self, name: &str) -> CircuitStatus {
        let mut circuits = self.circuits.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(state) = circuits.get(name) else {
            return CircuitStatus::Closed;
        };

        let since_failure = state.last_failure.elapsed();
        if since_failure >= self.cooldown {
            circuits.remove(name);
            return CircuitStatus::Closed;
        }

        if state.consecutive_failures >= self.failure_threshold {
            CircuitStatus::Open {
                retry_after_ms: (self.cooldown - since_failure).as_millis() as u64,
            }
        } else {
            CircuitStatus::Degraded {
                consecutive_failures: state.consecutive_failures,
            }
        }
    }

    /// Returns the consecutive failure count after this failure.
    pub fn record_failure(&self, name: &str) -> u32 {
        let mut circuits = self.circuits.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        let state = circuits
            .entry(name.to_string())
            .or_insert_with(|| CircuitState {
                consecutive_failures: 0,
                last_failure: now,
            });
        state.consecutive_failures += 1;
        state.last_failure = now;

        if state.consecutive_failures == self.failure_threshold {
            warn!(
                capability = %name,
                failures = state.consecutive_failures,
                cooldown_secs = self.cooldown.as_secs(),
                "Circuit breaker opened"
            );
        }
        state.consecutive_failures
    }

    pub fn record_success(&self, name: &str) {
        let mut circuits = self.circuits.lock().unwrap_or_else(PoisonError::into_inner);
        circuits.remove(name);
    }

    pub fn consecutive_failures(&self, name: &str) -> u32 {
        let circuits = self.circuits.lock().unwrap_or_else(PoisonError::into_inner);
        circuits.get(name).map_or(0, |s| s.consecutive_failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_circuit_state_transitions() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(60));
        assert!(!breaker.is_open("svc"));

        breaker.record_failure("svc");
        breaker.record_failure("svc");
        assert_eq!(
            breaker.status("svc"),
            CircuitStatus::Degraded {
                consecutive_failures: 2
            }
        );

        // Third failure should open circuit
        breaker.record_failure("svc");
        assert!(breaker.is_open("svc"));
        assert!(!breaker.is_open("other"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_resets_record() {
        let breaker = CircuitBreaker::new(2, Duration::from_secs(60));
        breaker.record_failure("svc");
        breaker.record_failure("svc");
        assert!(breaker.is_open("svc"));

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(breaker.is_open("svc"));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(!breaker.is_open("svc"));
        assert_eq!(breaker.consecutive_failures("svc"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_clears_failures() {
        let breaker = CircuitBreaker::new(5, Duration::from_secs(60));
        for _ in 0..4 {
            breaker.record_failure("svc");
        }
        breaker.record_success("svc");
        assert_eq!(breaker.consecutive_failures("svc"), 0);
        assert_eq!(breaker.status("svc"), CircuitStatus::Closed);
    }
}
