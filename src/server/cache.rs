//! Cache abstraction backing the status cache (TTL 300s) and the rate limiter's fixed-window
//! counters. Two backends: an in-process `MemoryCache` for single-instance/test deployments,
//! and a `RedisCache` for multi-instance ones — selected by `cache.backend` in configuration.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::error;

use crate::config::CacheConfig;
use crate::errors::{LicenseError, LicenseResult};

#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> LicenseResult<Option<String>>;
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> LicenseResult<()>;
    async fn delete(&self, key: &str) -> LicenseResult<()>;
    /// Atomically increments a counter (creating it with `ttl` if absent) and returns the
    /// post-increment value. Used by the fixed-window rate limiter.
    async fn incr(&self, key: &str, ttl: Duration) -> LicenseResult<u64>;

    fn backend_name(&self) -> &'static str;

    /// Round-trips a throwaway key. Used by the readiness/health endpoints.
    async fn ping(&self) -> bool {
        self.set("__ping__", "1", Duration::from_secs(5)).await.is_ok()
    }
}

pub async fn build_cache(config: &CacheConfig) -> LicenseResult<Arc<dyn Cache>> {
    match config.backend.as_str() {
        "memory" => Ok(Arc::new(MemoryCache::default())),
        #[cfg(feature = "server")]
        "redis" => Ok(Arc::new(RedisCache::connect(&config.redis_url).await?)),
        other => Err(LicenseError::Config(format!("unsupported cache backend: {other}"))),
    }
}

// ===========================================================================
// In-process backend
// ===========================================================================

struct Entry {
    value: String,
    expires_at: Instant,
}

#[derive(Default)]
pub struct MemoryCache {
    entries: StdMutex<HashMap<String, Entry>>,
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> LicenseResult<Option<String>> {
        let mut entries = self.entries.lock().expect("memory cache poisoned");
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> LicenseResult<()> {
        let mut entries = self.entries.lock().expect("memory cache poisoned");
        entries.insert(
            key.to_string(),
            Entry { value: value.to_string(), expires_at: Instant::now() + ttl },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> LicenseResult<()> {
        self.entries.lock().expect("memory cache poisoned").remove(key);
        Ok(())
    }

    async fn incr(&self, key: &str, ttl: Duration) -> LicenseResult<u64> {
        let mut entries = self.entries.lock().expect("memory cache poisoned");
        let now = Instant::now();
        let count = match entries.get(key) {
            Some(entry) if entry.expires_at > now => {
                let next: u64 = entry.value.parse().unwrap_or(0) + 1;
                next
            }
            _ => 1,
        };
        let expires_at = match entries.get(key) {
            Some(entry) if entry.expires_at > now => entry.expires_at,
            _ => now + ttl,
        };
        entries.insert(key.to_string(), Entry { value: count.to_string(), expires_at });
        Ok(count)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

// ===========================================================================
// Redis backend
// ===========================================================================

#[cfg(feature = "server")]
pub struct RedisCache {
    conn: tokio::sync::Mutex<redis::aio::ConnectionManager>,
}

#[cfg(feature = "server")]
impl RedisCache {
    pub async fn connect(url: &str) -> LicenseResult<Self> {
        let client = redis::Client::open(url).map_err(|e| {
            error!("failed to build redis client: {e}");
            LicenseError::Cache(format!("invalid redis url: {e}"))
        })?;
        let conn = client.get_connection_manager().await.map_err(|e| {
            error!("failed to connect to redis: {e}");
            LicenseError::Cache(format!("redis connection failed: {e}"))
        })?;
        Ok(Self { conn: tokio::sync::Mutex::new(conn) })
    }
}

#[cfg(feature = "server")]
#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> LicenseResult<Option<String>> {
        use redis::AsyncCommands;
        let mut conn = self.conn.lock().await;
        conn.get(key).await.map_err(|e| LicenseError::Cache(e.to_string()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> LicenseResult<()> {
        use redis::AsyncCommands;
        let mut conn = self.conn.lock().await;
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1))
            .await
            .map_err(|e| LicenseError::Cache(e.to_string()))
    }

    async fn delete(&self, key: &str) -> LicenseResult<()> {
        use redis::AsyncCommands;
        let mut conn = self.conn.lock().await;
        conn.del::<_, ()>(key).await.map_err(|e| LicenseError::Cache(e.to_string()))
    }

    async fn incr(&self, key: &str, ttl: Duration) -> LicenseResult<u64> {
        use redis::AsyncCommands;
        let mut conn = self.conn.lock().await;
        let count: u64 = conn.incr(key, 1).await.map_err(|e| LicenseError::Cache(e.to_string()))?;
        if count == 1 {
            let _: () = conn
                .expire(key, ttl.as_secs().max(1) as i64)
                .await
                .map_err(|e| LicenseError::Cache(e.to_string()))?;
        }
        Ok(count)
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}

// ===========================================================================
// Status cache
// ===========================================================================

/// Caches the serialized status response for a license key, keyed by a truncated SHA-256 of
/// the raw key text. Populated read-through on a cache miss; invalidated explicitly by event
/// handlers rather than relying on TTL alone for correctness (TTL is a staleness backstop).
pub struct StatusCache {
    cache: Arc<dyn Cache>,
    ttl: Duration,
}

fn status_cache_key(license_key_hash_prefix: &str) -> String {
    format!("status:{license_key_hash_prefix}")
}

impl StatusCache {
    pub fn new(cache: Arc<dyn Cache>, ttl_secs: u64) -> Self {
        Self { cache, ttl: Duration::from_secs(ttl_secs) }
    }

    pub async fn get(&self, license_key_hash_prefix: &str) -> LicenseResult<Option<serde_json::Value>> {
        let raw = self.cache.get(&status_cache_key(license_key_hash_prefix)).await?;
        Ok(raw.and_then(|s| serde_json::from_str(&s).ok()))
    }

    pub async fn set(&self, license_key_hash_prefix: &str, value: &serde_json::Value) -> LicenseResult<()> {
        let serialized = serde_json::to_string(value)
            .map_err(|e| LicenseError::Internal(format!("status cache serialize failed: {e}")))?;
        self.cache.set(&status_cache_key(license_key_hash_prefix), &serialized, self.ttl).await
    }

    pub async fn invalidate(&self, license_key_hash_prefix: &str) -> LicenseResult<()> {
        self.cache.delete(&status_cache_key(license_key_hash_prefix)).await
    }

    pub fn backend_name(&self) -> &'static str {
        self.cache.backend_name()
    }

    pub async fn ping(&self) -> bool {
        self.cache.ping().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_cache_roundtrip() {
        let cache = MemoryCache::default();
        cache.set("k", "v", Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn memory_cache_expires() {
        let cache = MemoryCache::default();
        cache.set("k", "v", Duration::from_millis(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn memory_cache_delete() {
        let cache = MemoryCache::default();
        cache.set("k", "v", Duration::from_secs(60)).await.unwrap();
        cache.delete("k").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn memory_cache_incr_counts_within_window() {
        let cache = MemoryCache::default();
        assert_eq!(cache.incr("rl:key", Duration::from_secs(60)).await.unwrap(), 1);
        assert_eq!(cache.incr("rl:key", Duration::from_secs(60)).await.unwrap(), 2);
        assert_eq!(cache.incr("rl:key", Duration::from_secs(60)).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn status_cache_get_set_invalidate() {
        let cache = StatusCache::new(Arc::new(MemoryCache::default()), 300);
        assert!(cache.get("abc123").await.unwrap().is_none());
        cache.set("abc123", &serde_json::json!({"status": "valid"})).await.unwrap();
        assert_eq!(cache.get("abc123").await.unwrap().unwrap()["status"], "valid");
        cache.invalidate("abc123").await.unwrap();
        assert!(cache.get("abc123").await.unwrap().is_none());
    }
}
