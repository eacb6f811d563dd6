//! Oracle response cache
//!
//! Entries are keyed by (subject, version): the subject identifies the
//! request, the version the generator that answered it. The cache is owned
//! by whoever builds the gateway and shared through `Arc`.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub subject: String,
    pub version: String,
}

impl CacheKey {
    pub fn new(subject: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            version: version.into(),
        }
    }

    /// Key for a prompt sent for `purpose` to the generator `version`
    pub fn for_prompt(purpose: &str, prompt: &str, version: &str) -> Self {
        let digest = Sha256::digest(prompt.as_bytes());
        Self::new(format!("{}:{}", purpose, hex::encode(digest)), version)
    }
}

#[derive(Debug)]
struct CacheEntry {
    value: String,
    stored_at: Instant,
}

#[derive(Debug)]
pub struct ResponseCache {
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh value for `key`; expired entries are evicted on read.
    pub fn get(&self, key: &CacheKey) -> Option<String> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let expired = match entries.get(key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => {
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.remove(key);
        }
        None
    }

    pub fn insert(&self, key: CacheKey, value: impl Into<String>) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            key,
            CacheEntry {
                value: value.into(),
                stored_at: Instant::now(),
            },
        );
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|_, entry| entry.stored_at.elapsed() < self.ttl);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_depends_on_prompt_purpose_and_version() {
        let a = CacheKey::for_prompt("expand", "prompt", "model-a");
        assert_eq!(a, CacheKey::for_prompt("expand", "prompt", "model-a"));
        assert_ne!(a, CacheKey::for_prompt("expand", "other", "model-a"));
        assert_ne!(a, CacheKey::for_prompt("enhance", "prompt", "model-a"));
        assert_ne!(a, CacheKey::for_prompt("expand", "prompt", "model-b"));
        assert!(a.subject.starts_with("expand:"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_ttl() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        let key = CacheKey::new("s", "v");
        cache.insert(key.clone(), "[1]");
        assert_eq!(cache.get(&key).as_deref(), Some("[1]"));

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(cache.get(&key), None);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let cache = ResponseCache::new(Duration::from_secs(10));
        cache.insert(CacheKey::new("old", "v"), "1");
        tokio::time::advance(Duration::from_secs(11)).await;
        cache.insert(CacheKey::new("new", "v"), "2");

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }
}
