use crate::models::CacheStats;
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur with cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Cache miss: {0}")]
    CacheMiss(String),
}

/// Multi-tier cache manager
///
/// L1 is an in-process moka cache; L2 is Redis and shared across instances.
/// Without Redis the service runs on L1 alone. Every entry carries its own
/// TTL so the feed and preference snapshots can expire at different rates.
pub struct CacheManager {
    redis: Option<Arc<tokio::sync::Mutex<ConnectionManager>>>,
    l1_cache: moka::future::Cache<String, (Vec<u8>, Duration)>,
}

/// Per-entry expiry for the L1 tier
struct EntryTtl;

impl moka::Expiry<String, (Vec<u8>, Duration)> for EntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &(Vec<u8>, Duration),
        _created_at: std::time::Instant,
    ) -> Option<Duration> {
        Some(value.1)
    }
}

impl CacheManager {
    /// Create a cache manager backed by Redis
    pub async fn new(redis_url: &str, l1_size: u64) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        let redis = redis::aio::ConnectionManager::new(client).await?;

        Ok(Self {
            redis: Some(Arc::new(tokio::sync::Mutex::new(redis))),
            l1_cache: Self::build_l1(l1_size),
        })
    }

    /// Create an in-process only cache manager
    pub fn in_memory(l1_size: u64) -> Self {
        Self {
            redis: None,
            l1_cache: Self::build_l1(l1_size),
        }
    }

    fn build_l1(l1_size: u64) -> moka::future::Cache<String, (Vec<u8>, Duration)> {
        moka::future::CacheBuilder::new(l1_size)
            .expire_after(EntryTtl)
            .build()
    }

    pub fn has_redis(&self) -> bool {
        self.redis.is_some()
    }

    /// Get a value from cache (L1 first, then L2)
    pub async fn get<T>(&self, key: &str) -> Result<T, CacheError>
    where
        T: for<'de> Deserialize<'de>,
    {
        if let Some((bytes, _)) = self.l1_cache.get(key).await {
            tracing::trace!("L1 cache hit: {}", key);
            return Ok(serde_json::from_slice(&bytes)?);
        }

        let Some(redis) = &self.redis else {
            tracing::trace!("Cache miss: {}", key);
            return Err(CacheError::CacheMiss(key.to_string()));
        };

        let mut conn = redis.lock().await;
        let (value, ttl): (Option<String>, i64) = redis::pipe()
            .cmd("GET")
            .arg(key)
            .cmd("TTL")
            .arg(key)
            .query_async(&mut *conn)
            .await?;
        drop(conn);

        if let Some(json) = value {
            tracing::trace!("L2 cache hit: {}", key);

            // Populate L1 for the remaining lifetime only
            if ttl > 0 {
                let bytes = json.as_bytes().to_vec();
                self.l1_cache
                    .insert(key.to_string(), (bytes, Duration::from_secs(ttl as u64)))
                    .await;
            }

            return Ok(serde_json::from_str(&json)?);
        }

        tracing::trace!("Cache miss: {}", key);
        Err(CacheError::CacheMiss(key.to_string()))
    }

    /// Set a value in both tiers with the given TTL
    pub async fn set<T>(&self, key: &str, value: &T, ttl_secs: u64) -> Result<(), CacheError>
    where
        T: Serialize,
    {
        let json = serde_json::to_string(value)?;

        let bytes = json.as_bytes().to_vec();
        self.l1_cache
            .insert(key.to_string(), (bytes, Duration::from_secs(ttl_secs)))
            .await;

        if let Some(redis) = &self.redis {
            let mut conn = redis.lock().await;
            redis::cmd("SETEX")
                .arg(key)
                .arg(ttl_secs)
                .arg(json)
                .query_async::<()>(&mut *conn)
                .await?;
        }

        tracing::trace!("Cache set: {} (ttl {}s)", key, ttl_secs);
        Ok(())
    }

    /// Delete a value from both cache tiers
    pub async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.l1_cache.invalidate(key).await;
        if let Some(redis) = &self.redis {
            let mut conn = redis.lock().await;
            redis::cmd("DEL")
                .arg(key)
                .query_async::<()>(&mut *conn)
                .await?;
        }
        Ok(())
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            l1_size: self.l1_cache.entry_count(),
            redis_enabled: self.redis.is_some(),
        }
    }
}

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    /// Last feed successfully read from the database
    pub fn last_good_catalog() -> String {
        "deals:catalog:last_good".to_string()
    }

    /// Derived preferences for an anonymous user
    pub fn preferences(anon_id: &str) -> String {
        format!("prefs:{}", anon_id)
    }

    /// Badge stats for an anonymous user
    pub fn badges(anon_id: &str) -> String {
        format!("badges:{}", anon_id)
    }
}
