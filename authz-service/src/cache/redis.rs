use async_trait::async_trait;
use redis::{aio::ConnectionManager, Client};

use super::{CacheResult, CacheStore};

#[derive(Clone)]
pub struct RedisCache {
    _client: Client,
    manager: ConnectionManager,
}

impl RedisCache {
    pub async fn new(config: &crate::config::RedisConfig) -> Result<Self, anyhow::Error> {
        tracing::info!(url = %config.url, "Connecting to Redis");
        let client = Client::open(config.url.clone())?;

        // ConnectionManager reconnects on its own after drops.
        let manager = client.get_connection_manager().await.map_err(|e| {
            tracing::error!("Failed to get Redis connection manager: {}", e);
            anyhow::anyhow!("Failed to connect to Redis: {}", e)
        })?;

        tracing::info!("Successfully connected to Redis");

        Ok(Self {
            _client: client,
            manager,
        })
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.manager.clone();
        redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to get cache key {}: {}", key, e))
    }

    async fn set(&self, key: &str, value: &str, ttl_seconds: i64) -> CacheResult<()> {
        let mut conn = self.manager.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl_seconds)
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to set cache key {}: {}", key, e))
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.manager.clone();
        redis::cmd("DEL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to delete cache key {}: {}", key, e))
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        let mut conn = self.manager.clone();
        let exists: bool = redis::cmd("EXISTS")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to check cache key {}: {}", key, e))?;
        Ok(exists)
    }

    async fn keys(&self, pattern: &str) -> CacheResult<Vec<String>> {
        let mut conn = self.manager.clone();
        redis::cmd("KEYS")
            .arg(pattern)
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to scan pattern {}: {}", pattern, e))
    }

    async fn health_check(&self) -> CacheResult<()> {
        let mut conn = self.manager.clone();
        redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Redis health check failed: {}", e))
    }
}
