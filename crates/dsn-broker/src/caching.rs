//! A front-LRU caching wrapper over another broker: write-through, with a
//! fixed entry cap and a default TTL applied when the caller doesn't set one.

use crate::broker::MemoryBroker;
use crate::error::BrokerResult;
use async_trait::async_trait;
use serde_json::Value;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Wraps an inner [`MemoryBroker`] with a bounded LRU front cache.
///
/// Writes are write-through: every `set` reaches the inner broker before
/// this wrapper returns. Reads check the cache first and fall through to
/// the inner broker on a miss, repopulating the cache.
pub struct CachingBroker<B: MemoryBroker> {
    inner: Arc<B>,
    cache: Mutex<lru::LruCache<String, Value>>,
    default_ttl: Option<Duration>,
}

impl<B: MemoryBroker> CachingBroker<B> {
    /// Wraps `inner`, capping the front cache at `max_entries` and applying
    /// `default_ttl` to writes that don't specify their own.
    pub fn new(inner: Arc<B>, max_entries: usize, default_ttl: Option<Duration>) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            cache: Mutex::new(lru::LruCache::new(capacity)),
            default_ttl,
        }
    }

    /// Evicts `key` from the front cache without touching the inner broker,
    /// for callers that know the inner value changed out from under them.
    pub async fn invalidate(&self, key: &str) {
        self.cache.lock().await.pop(key);
    }
}

#[async_trait]
impl<B: MemoryBroker> MemoryBroker for CachingBroker<B> {
    async fn connect(&self) -> BrokerResult<()> {
        self.inner.connect().await
    }

    async fn disconnect(&self) -> BrokerResult<()> {
        self.cache.lock().await.clear();
        self.inner.disconnect().await
    }

    async fn get(&self, key: &str) -> BrokerResult<Option<Value>> {
        if let Some(value) = self.cache.lock().await.get(key) {
            return Ok(Some(value.clone()));
        }
        let value = self.inner.get(key).await?;
        if let Some(v) = &value {
            self.cache.lock().await.put(key.to_string(), v.clone());
        }
        Ok(value)
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> BrokerResult<()> {
        let ttl = ttl.or(self.default_ttl);
        self.inner.set(key, value.clone(), ttl).await?;
        self.cache.lock().await.put(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> BrokerResult<bool> {
        self.cache.lock().await.pop(key);
        self.inner.delete(key).await
    }

    async fn has(&self, key: &str) -> BrokerResult<bool> {
        if self.cache.lock().await.contains(key) {
            return Ok(true);
        }
        self.inner.has(key).await
    }

    async fn clear(&self) -> BrokerResult<()> {
        self.cache.lock().await.clear();
        self.inner.clear().await
    }

    async fn keys(&self, pattern: &str) -> BrokerResult<Vec<String>> {
        // The front cache is a partial view; delegate to the inner broker
        // for a complete listing.
        self.inner.keys(pattern).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryBroker;
    use serde_json::json;

    async fn connected_inner() -> Arc<InMemoryBroker> {
        let inner = Arc::new(InMemoryBroker::new());
        inner.connect().await.unwrap();
        inner
    }

    #[tokio::test]
    async fn get_populates_the_cache_on_a_miss() {
        let inner = connected_inner().await;
        inner.set("k", json!(7), None).await.unwrap();
        let cached = CachingBroker::new(inner.clone(), 16, None);
        assert_eq!(cached.get("k").await.unwrap(), Some(json!(7)));
        assert!(cached.cache.lock().await.contains("k"));
    }

    #[tokio::test]
    async fn set_is_write_through() {
        let inner = connected_inner().await;
        let cached = CachingBroker::new(inner.clone(), 16, None);
        cached.set("k", json!(1), None).await.unwrap();
        assert_eq!(inner.get("k").await.unwrap(), Some(json!(1)));
    }

    #[tokio::test]
    async fn invalidate_forces_a_re_fetch() {
        let inner = connected_inner().await;
        let cached = CachingBroker::new(inner.clone(), 16, None);
        cached.set("k", json!(1), None).await.unwrap();
        inner.set("k", json!(2), None).await.unwrap();
        cached.invalidate("k").await;
        assert_eq!(cached.get("k").await.unwrap(), Some(json!(2)));
    }
}
