//! Result cache backends and deterministic cache keys.
//!
//! The engine only needs `get` and `set_with_ttl`; expiry is the backend's job.
//! [`InMemoryCacheBackend`] is the in-process store used when no external cache
//! is wired in.

use crate::error::CacheError;
use async_trait::async_trait;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    async fn set_with_ttl(&self, key: &str, value: Vec<u8>, ttl: Duration)
        -> Result<(), CacheError>;
}

/// Deterministic key for `(capability, input)`.
///
/// Object keys are sorted before hashing so logically equal payloads map to
/// the same entry regardless of field order.
pub fn cache_key(capability: &str, input: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(capability.as_bytes());
    hasher.update([0u8]);
    hasher.update(canonical_json(input).as_bytes());
    format!("capability:{}:{:x}", capability, hasher.finalize())
}

fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let fields: Vec<String> = keys
                .into_iter()
                .map(|k| format!("{}:{}", Value::String(k.clone()), canonical_json(&map[k])))
                .collect();
            format!("{{{}}}", fields.join(","))
        }
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", items.join(","))
        }
        other => other.to_string(),
    }
}

struct CacheEntry {
    value: Vec<u8>,
    created_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_live(&self) -> bool {
        self.created_at.elapsed() < self.ttl
    }
}

/// Bounded in-process cache with per-entry TTL.
pub struct InMemoryCacheBackend {
    entries: Mutex<HashMap<String, CacheEntry>>,
    max_entries: usize,
}

impl Default for InMemoryCacheBackend {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl InMemoryCacheBackend {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_entries: max_entries.max(1),
        }
    }

    pub fn len(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.values().filter(|e| e.is_live()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheBackend for InMemoryCacheBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let live = match entries.get(key) {
            Some(entry) if entry.is_live() => Some(entry.value.clone()),
            Some(_) => None,
            None => return Ok(None),
        };
        if live.is_none() {
            entries.remove(key);
        }
        Ok(live)
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        // Evict expired entries if at capacity
        if entries.len() >= self.max_entries && !entries.contains_key(key) {
            entries.retain(|_, entry| entry.is_live());
        }

        // If still at capacity, evict oldest
        if entries.len() >= self.max_entries && !entries.contains_key(key) {
            if let Some(oldest_key) = entries
                .iter()
                .min_by_key(|(_, entry)| entry.created_at)
                .map(|(k, _)| k.clone())
            {
                entries.remove(&oldest_key);
            }
        }

        entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                created_at: Instant::now(),
                ttl,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cache_key_ignores_field_order() {
        let a = json!({"to": "x", "body": {"b": 1, "a": 2}});
        let b = json!({"body": {"a": 2, "b": 1}, "to": "x"});
        assert_eq!(cache_key("gmail.send", &a), cache_key("gmail.send", &b));
    }

    #[test]
    fn test_cache_key_distinguishes_capability_and_input() {
        let input = json!({"q": 1});
        assert_ne!(cache_key("a.b", &input), cache_key("a.c", &input));
        assert_ne!(cache_key("a.b", &input), cache_key("a.b", &json!({"q": 2})));
        assert!(cache_key("a.b", &input).starts_with("capability:a.b:"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire() {
        let cache = InMemoryCacheBackend::new(8);
        cache
            .set_with_ttl("k", b"v".to_vec(), Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some(b"v".to_vec()));

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(cache.get("k").await.unwrap(), None);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_oldest_entry_evicted_at_capacity() {
        let cache = InMemoryCacheBackend::new(2);
        let ttl = Duration::from_secs(3600);
        cache.set_with_ttl("a", vec![1], ttl).await.unwrap();
        tokio::time::advance(Duration::from_millis(5)).await;
        cache.set_with_ttl("b", vec![2], ttl).await.unwrap();
        tokio::time::advance(Duration::from_millis(5)).await;
        cache.set_with_ttl("c", vec![3], ttl).await.unwrap();

        assert_eq!(cache.get("a").await.unwrap(), None);
        assert_eq!(cache.get("b").await.unwrap(), Some(vec![2]));
        assert_eq!(cache.len(), 2);
    }
}
