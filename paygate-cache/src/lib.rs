pub mod memory;
pub mod redis_backend;

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use paygate_common::error::Result;

use self::memory::MemoryCache;
use self::redis_backend::RedisCache;

/// Per-operation TTLs. Hot lists churn fast, single entities a little
/// slower, aggregates slowest.
pub mod ttl {
    use std::time::Duration;

    pub const LIST: Duration = Duration::from_secs(30);
    pub const ENTITY: Duration = Duration::from_secs(60);
    pub const STATS: Duration = Duration::from_secs(300);
}

/// Cache backend strategy.
#[derive(Debug, Clone)]
enum CacheBackend {
    Memory(MemoryCache),
    Redis(RedisCache),
}

/// Advisory read-through cache. Every call is best-effort: a backend error
/// is logged and reported as a miss, never surfaced to the caller, so
/// correctness holds even if the whole layer is a no-op.
#[derive(Debug, Clone)]
pub struct Cache {
    backend: CacheBackend,
}

impl Cache {
    /// With a redis url the shared backend is used; without one the cache
    /// is process-local.
    pub fn new(redis_url: Option<String>) -> Result<Self> {
        let backend = match redis_url {
            Some(url) => CacheBackend::Redis(RedisCache::new(&url)?),
            None => CacheBackend::Memory(MemoryCache::new()),
        };
        Ok(Self { backend })
    }

    pub fn in_memory() -> Self {
        Self {
            backend: CacheBackend::Memory(MemoryCache::new()),
        }
    }

    pub async fn get_bytes(&self, key: &str) -> Option<Vec<u8>> {
        match &self.backend {
            CacheBackend::Memory(cache) => cache.get(key),
            CacheBackend::Redis(cache) => match cache.get(key).await {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!(key, error = %e, "cache get failed, treating as miss");
                    None
                }
            },
        }
    }

    pub async fn set_bytes(&self, key: &str, payload: Vec<u8>, ttl: Duration) {
        match &self.backend {
            CacheBackend::Memory(cache) => cache.set(key, payload, ttl),
            CacheBackend::Redis(cache) => {
                if let Err(e) = cache.set(key, payload, ttl).await {
                    tracing::warn!(key, error = %e, "cache set failed");
                }
            }
        }
    }

    pub async fn invalidate_prefix(&self, prefix: &str) {
        match &self.backend {
            CacheBackend::Memory(cache) => cache.invalidate_prefix(prefix),
            CacheBackend::Redis(cache) => {
                if let Err(e) = cache.invalidate_prefix(prefix).await {
                    tracing::warn!(prefix, error = %e, "cache invalidation failed");
                }
            }
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = self.get_bytes(key).await?;
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "cache payload undecodable, dropping entry");
                self.invalidate_prefix(key).await;
                None
            }
        }
    }

    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        match serde_json::to_vec(value) {
            Ok(bytes) => self.set_bytes(key, bytes, ttl).await,
            Err(e) => tracing::warn!(key, error = %e, "cache encode failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_round_trip_through_memory_backend() {
        let cache = Cache::in_memory();
        cache
            .set_json("card:find_by_id:abc", &vec![1u32, 2, 3], ttl::ENTITY)
            .await;
        let got: Option<Vec<u32>> = cache.get_json("card:find_by_id:abc").await;
        assert_eq!(got, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_prefix_invalidation_drops_domain_keys() {
        let cache = Cache::in_memory();
        cache.set_json("withdraw:find_all:a", &1u32, ttl::LIST).await;
        cache.set_json("withdraw:find_all:b", &2u32, ttl::LIST).await;
        cache.set_json("topup:find_all:c", &3u32, ttl::LIST).await;

        cache.invalidate_prefix("withdraw:").await;
        assert_eq!(cache.get_json::<u32>("withdraw:find_all:a").await, None);
        assert_eq!(cache.get_json::<u32>("withdraw:find_all:b").await, None);
        assert_eq!(cache.get_json::<u32>("topup:find_all:c").await, Some(3));
    }

    #[tokio::test]
    async fn test_expired_entries_read_as_miss() {
        let cache = Cache::in_memory();
        cache
            .set_json("card:find_all:x", &9u32, Duration::from_millis(10))
            .await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(cache.get_json::<u32>("card:find_all:x").await, None);
    }
}
