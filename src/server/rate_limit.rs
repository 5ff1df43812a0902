//! Per-API-key fixed-window rate limiting.
//!
//! Unlike an IP-based limiter, the key is the authenticated API key (or, for unauthenticated
//! requests, rejected before this check runs at all — every mutating/brand-scoped route
//! requires authentication first). This keeps the limiter correct behind shared NAT/proxies
//! and ties the quota to the thing actually being billed: the brand's API key.

use std::sync::Arc;
use std::time::Duration;

use crate::config::RateLimitConfig;
use crate::errors::{LicenseError, LicenseResult};
use crate::server::cache::Cache;

pub struct RateLimiter {
    cache: Arc<dyn Cache>,
    window: Duration,
    limit: u32,
    enabled: bool,
}

impl RateLimiter {
    pub fn new(cache: Arc<dyn Cache>, config: &RateLimitConfig) -> Self {
        Self {
            cache,
            window: Duration::from_secs(config.window_secs),
            limit: config.requests_per_window,
            enabled: config.enabled,
        }
    }

    /// Checks and records one request against `api_key_id`'s current window.
    ///
    /// Returns `Ok(())` if under the limit, or `Err(RateLimited { retry_after_secs })` once the
    /// window's count reaches `requests_per_window`. `retry_after_secs` is conservative: the
    /// full window length, since the fixed-window counter doesn't track the window's start time.
    pub async fn check(&self, api_key_id: &str) -> LicenseResult<()> {
        if !self.enabled {
            return Ok(());
        }
        let key = format!("ratelimit:{api_key_id}");
        let count = self.cache.incr(&key, self.window).await?;
        if count > self.limit as u64 {
            return Err(LicenseError::RateLimited { retry_after_secs: self.window.as_secs() });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::cache::MemoryCache;

    fn config(limit: u32) -> RateLimitConfig {
        RateLimitConfig { enabled: true, window_secs: 60, requests_per_window: limit }
    }

    #[tokio::test]
    async fn allows_requests_under_the_limit() {
        let limiter = RateLimiter::new(Arc::new(MemoryCache::default()), &config(3));
        assert!(limiter.check("key-1").await.is_ok());
        assert!(limiter.check("key-1").await.is_ok());
        assert!(limiter.check("key-1").await.is_ok());
    }

    #[tokio::test]
    async fn rejects_once_the_limit_is_reached() {
        let limiter = RateLimiter::new(Arc::new(MemoryCache::default()), &config(2));
        assert!(limiter.check("key-1").await.is_ok());
        assert!(limiter.check("key-1").await.is_ok());
        let err = limiter.check("key-1").await.unwrap_err();
        assert!(matches!(err, LicenseError::RateLimited { .. }));
    }

    #[tokio::test]
    async fn tracks_keys_independently() {
        let limiter = RateLimiter::new(Arc::new(MemoryCache::default()), &config(1));
        assert!(limiter.check("key-1").await.is_ok());
        assert!(limiter.check("key-2").await.is_ok());
    }

    #[tokio::test]
    async fn disabled_limiter_never_rejects() {
        let mut config = config(1);
        config.enabled = false;
        let limiter = RateLimiter::new(Arc::new(MemoryCache::default()), &config);
        for _ in 0..10 {
            assert!(limiter.check("key-1").await.is_ok());
        }
    }
}
