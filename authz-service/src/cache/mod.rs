//! Cache layer: string-valued TTL cache contract plus typed JSON helpers.

pub mod keys;
pub mod memory;
pub mod redis;

pub use memory::MemoryCache;
pub use redis::RedisCache;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub type CacheResult<T> = Result<T, anyhow::Error>;

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;
    async fn set(&self, key: &str, value: &str, ttl_seconds: i64) -> CacheResult<()>;
    async fn delete(&self, key: &str) -> CacheResult<()>;
    async fn exists(&self, key: &str) -> CacheResult<bool>;
    /// Keys matching a glob-style pattern (`*` wildcard).
    async fn keys(&self, pattern: &str) -> CacheResult<Vec<String>>;
    async fn health_check(&self) -> CacheResult<()>;
}

/// Typed read. A stored value that no longer deserializes to `T` is deleted
/// and reported as a miss so the caller repopulates it.
pub async fn get_json<T: DeserializeOwned>(
    cache: &dyn CacheStore,
    key: &str,
) -> CacheResult<Option<T>> {
    let Some(raw) = cache.get(key).await? else {
        return Ok(None);
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Cached value has wrong shape, evicting");
            cache.delete(key).await?;
            Ok(None)
        }
    }
}

pub async fn set_json<T: Serialize>(
    cache: &dyn CacheStore,
    key: &str,
    value: &T,
    ttl_seconds: i64,
) -> CacheResult<()> {
    let raw = serde_json::to_string(value)?;
    cache.set(key, &raw, ttl_seconds).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_json_self_heals_on_type_mismatch() {
        let cache = MemoryCache::new();
        cache.set("k", "not json at all", 60).await.unwrap();

        let got: Option<Vec<u32>> = get_json(&cache, "k").await.unwrap();
        assert!(got.is_none());
        // The bad entry must be gone.
        assert!(!cache.exists("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_json_round_trip() {
        let cache = MemoryCache::new();
        set_json(&cache, "nums", &vec![1u32, 2, 3], 60).await.unwrap();

        let got: Option<Vec<u32>> = get_json(&cache, "nums").await.unwrap();
        assert_eq!(got, Some(vec![1, 2, 3]));
    }
}
