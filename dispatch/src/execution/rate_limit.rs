//! Sliding-window rate limiter keyed by `capability:caller`.
//!
//! Each window is the ordered list of accepted call instants, pruned to the
//! trailing window on every check. A rejected check appends nothing, so the
//! window never holds more entries than the configured limit.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Idle windows are swept when a new key arrives and this many are tracked.
const SWEEP_THRESHOLD: usize = 64;

#[derive(Debug)]
pub struct RateLimiter {
    window: Duration,
    windows: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// `capability:caller`, or just the capability name for anonymous callers.
    pub fn window_key(capability: &str, caller: Option<&str>) -> String {
        match caller {
            Some(caller) => format!("{}:{}", capability, caller),
            None => capability.to_string(),
        }
    }

    /// Record a call if the window has room. Returns false when at capacity.
    pub fn try_acquire(&self, key: &str, limit: u32) -> bool {
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();

        if !windows.contains_key(key) && windows.len() >= SWEEP_THRESHOLD {
            windows.retain(|_, calls| {
                calls
                    .back()
                    .is_some_and(|last| now.duration_since(*last) < self.window)
            });
        }

        let calls = windows.entry(key.to_string()).or_default();
        while let Some(oldest) = calls.front() {
            if now.duration_since(*oldest) >= self.window {
                calls.pop_front();
            } else {
                break;
            }
        }

        if calls.len() >= limit as usize {
            if calls.is_empty() {
                windows.remove(key);
            }
            return false;
        }
        calls.push_back(now);
        true
    }

    /// Number of keys currently holding a window.
    pub fn tracked_keys(&self) -> usize {
        self.windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Calls currently counted in the window, without pruning.
    pub fn in_window(&self, key: &str) -> usize {
        let windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        windows.get(key).map_or(0, |calls| {
            calls
                .iter()
                .filter(|t| now.duration_since(**t) < self.window)
                .count()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_key() {
        assert_eq!(RateLimiter::window_key("pricing.get", Some("u1")), "pricing.get:u1");
        assert_eq!(RateLimiter::window_key("pricing.get", None), "pricing.get");
    }

    #[tokio::test(start_paused = true)]
    async fn test_sliding_window() {
        let limiter = RateLimiter::new(Duration::from_secs(60));
        assert!(limiter.try_acquire("k", 2));
        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(limiter.try_acquire("k", 2));
        assert!(!limiter.try_acquire("k", 2));
        assert_eq!(limiter.in_window("k"), 2);

        // first call ages out, second still inside the window
        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(limiter.try_acquire("k", 2));
        assert!(!limiter.try_acquire("k", 2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_caller_windows_are_dropped() {
        let limiter = RateLimiter::new(Duration::from_secs(60));
        for caller in 0..SWEEP_THRESHOLD {
            assert!(limiter.try_acquire(&format!("cap:{}", caller), 5));
        }
        assert_eq!(limiter.tracked_keys(), SWEEP_THRESHOLD);

        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(limiter.try_acquire("cap:fresh", 5));
        assert_eq!(limiter.tracked_keys(), 1);
    }

    #[test]
    fn test_zero_limit_leaves_no_window() {
        let limiter = RateLimiter::new(Duration::from_secs(60));
        assert!(!limiter.try_acquire("cap:a", 0));
        assert_eq!(limiter.tracked_keys(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_callers_have_separate_windows() {
        let limiter = RateLimiter::new(Duration::from_secs(60));
        assert!(limiter.try_acquire("cap:a", 1));
        assert!(!limiter.try_acquire("cap:a", 1));
        assert!(limiter.try_acquire("cap:b", 1));
    }
}
