use crate::models::{CacheStats, RegisteredBusiness};
use crate::services::registry::{RegistryError, RegistrySource};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// In-memory cache in front of a business registry
///
/// Both hits and "unknown business" answers are cached for the configured
/// TTL. Registry errors are never cached so a later request retries.
/// Statistics are reported by the health endpoint.
pub struct CachedRegistry {
    inner: Arc<dyn RegistrySource>,
    cache: moka::future::Cache<String, Option<RegisteredBusiness>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CachedRegistry {
    /// Create a new cached registry
    pub fn new(inner: Arc<dyn RegistrySource>, capacity: u64, ttl_secs: u64) -> Self {
        let cache = moka::future::CacheBuilder::new(capacity)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self {
            inner,
            cache,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        CacheStats {
            entries: self.cache.entry_count(),
            hit_count: hits,
            miss_count: misses,
            hit_rate: if total == 0 { 0.0 } else { hits as f64 / total as f64 },
        }
    }
}

#[async_trait]
impl RegistrySource for CachedRegistry {
    async fn resolve_business(&self, tax_id: &str) -> Result<Option<RegisteredBusiness>, RegistryError> {
        let key = CacheKey::business(tax_id);

        if let Some(cached) = self.cache.get(&key).await {
            tracing::trace!("Cache hit: {}", key);
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(cached);
        }

        tracing::trace!("Cache miss: {}", key);
        self.misses.fetch_add(1, Ordering::Relaxed);

        let resolved = self.inner.resolve_business(tax_id).await?;
        self.cache.insert(key, resolved.clone()).await;
        Ok(resolved)
    }
}

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    /// Build a cache key for a registry lookup
    pub fn business(tax_id: &str) -> String {
        format!("business:{}", tax_id)
    }
}
