use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::{CacheResult, CacheStore};

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map(|at| now >= at).unwrap_or(false)
    }
}

/// Process-local cache with the same TTL semantics as the Redis store.
/// Used in tests and as an embedded fallback.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Entry>>, anyhow::Error> {
        self.entries
            .lock()
            .map_err(|e| anyhow::anyhow!("cache mutex poisoned: {}", e))
    }
}

/// Glob match supporting only the `*` wildcard, the subset Redis KEYS
/// patterns use here.
fn key_matches(pattern: &str, key: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == key;
    }

    let mut rest = key;
    if !rest.starts_with(parts[0]) {
        return false;
    }
    rest = &rest[parts[0].len()..];

    let last = parts[parts.len() - 1];
    for part in &parts[1..parts.len() - 1] {
        if part.is_empty() {
            continue;
        }
        match rest.find(part) {
            Some(idx) => rest = &rest[idx + part.len()..],
            None => return false,
        }
    }

    last.is_empty() || rest.ends_with(last)
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let now = Instant::now();
        let mut entries = self.lock()?;
        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl_seconds: i64) -> CacheResult<()> {
        let expires_at = if ttl_seconds > 0 {
            Some(Instant::now() + Duration::from_secs(ttl_seconds as u64))
        } else {
            None
        };
        self.lock()?.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        Ok(self.get(key).await?.is_some())
    }

    async fn keys(&self, pattern: &str) -> CacheResult<Vec<String>> {
        let now = Instant::now();
        let mut entries = self.lock()?;
        entries.retain(|_, entry| !entry.is_expired(now));
        Ok(entries
            .keys()
            .filter(|key| key_matches(pattern, key))
            .cloned()
            .collect())
    }

    async fn health_check(&self) -> CacheResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_matches_wildcards() {
        assert!(key_matches("org:1:user:*", "org:1:user:2:groups"));
        assert!(key_matches("*:role:7:*", "org:1:group:3:role:7:x"));
        assert!(key_matches("org:*:stats", "org:abc:stats"));
        assert!(key_matches("exact", "exact"));

        assert!(!key_matches("org:1:user:*", "org:2:user:9"));
        assert!(!key_matches("org:*:stats", "org:abc:hierarchy"));
        assert!(!key_matches("exact", "exactly"));
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let cache = MemoryCache::new();
        cache.set("a", "1", 60).await.unwrap();
        assert_eq!(cache.get("a").await.unwrap(), Some("1".to_string()));
        assert!(cache.exists("a").await.unwrap());

        cache.delete("a").await.unwrap();
        assert_eq!(cache.get("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_keys_by_pattern() {
        let cache = MemoryCache::new();
        cache.set("org:1:hierarchy", "h", 60).await.unwrap();
        cache.set("org:1:user:9:groups", "g", 60).await.unwrap();
        cache.set("org:2:hierarchy", "h", 60).await.unwrap();

        let mut keys = cache.keys("org:1:*").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["org:1:hierarchy", "org:1:user:9:groups"]);
    }

    #[tokio::test]
    async fn test_expired_entry_misses() {
        let cache = MemoryCache::new();
        cache.set("gone", "x", 60).await.unwrap();
        // Force the deadline into the past.
        cache.lock().unwrap().get_mut("gone").unwrap().expires_at =
            Some(Instant::now() - Duration::from_secs(1));

        assert_eq!(cache.get("gone").await.unwrap(), None);
        assert!(cache.keys("gone").await.unwrap().is_empty());
    }
}
