//! The in-memory broker backend: a single mapping plus a parallel mapping
//! of deadlines, with lazy eviction and an optional background sweeper.

use crate::broker::MemoryBroker;
use crate::error::BrokerResult;
use crate::pattern::glob_match;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

struct Entry {
    value: Value,
    deadline: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|d| now >= d)
    }
}

/// An in-process, in-memory `MemoryBroker`.
///
/// Backed by a single `HashMap` guarded by an async read/write lock.
/// Expired entries are evicted lazily on `get`/`has`, and swept eagerly by
/// [`InMemoryBroker::spawn_sweeper`] at a configurable interval.
#[derive(Default)]
pub struct InMemoryBroker {
    entries: RwLock<HashMap<String, Entry>>,
    connected: AtomicBool,
}

impl InMemoryBroker {
    /// Builds an empty broker, not yet connected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns a background task that sweeps expired entries every
    /// `interval` until the returned handle is aborted or dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let broker = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let now = Instant::now();
                let mut entries = broker.entries.write().await;
                let before = entries.len();
                entries.retain(|_, e| !e.is_expired(now));
                let swept = before - entries.len();
                if swept > 0 {
                    debug!(swept, "broker sweeper evicted expired entries");
                }
            }
        })
    }

    fn require_connected(&self) -> BrokerResult<()> {
        if self.connected.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(crate::error::BrokerError::NotConnected)
        }
    }
}

#[async_trait]
impl MemoryBroker for InMemoryBroker {
    async fn connect(&self) -> BrokerResult<()> {
        self.connected.store(true, Ordering::Release);
        Ok(())
    }

    async fn disconnect(&self) -> BrokerResult<()> {
        self.connected.store(false, Ordering::Release);
        Ok(())
    }

    async fn get(&self, key: &str) -> BrokerResult<Option<Value>> {
        self.require_connected()?;
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        match entries.get(key) {
            Some(e) if e.is_expired(now) => {
                entries.remove(key);
                Ok(None)
            }
            Some(e) => Ok(Some(e.value.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> BrokerResult<()> {
        self.require_connected()?;
        let deadline = ttl.map(|d| Instant::now() + d);
        self.entries
            .write()
            .await
            .insert(key.to_string(), Entry { value, deadline });
        Ok(())
    }

    async fn delete(&self, key: &str) -> BrokerResult<bool> {
        self.require_connected()?;
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        match entries.remove(key) {
            Some(e) => Ok(!e.is_expired(now)),
            None => Ok(false),
        }
    }

    async fn has(&self, key: &str) -> BrokerResult<bool> {
        Ok(self.get(key).await?.is_some())
    }

    async fn clear(&self) -> BrokerResult<()> {
        self.require_connected()?;
        self.entries.write().await.clear();
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> BrokerResult<Vec<String>> {
        self.require_connected()?;
        let now = Instant::now();
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|(_, e)| !e.is_expired(now))
            .map(|(k, _)| k.clone())
            .filter(|k| glob_match(pattern, k))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let broker = InMemoryBroker::new();
        broker.connect().await.unwrap();
        broker.set("k", json!(42), None).await.unwrap();
        assert_eq!(broker.get("k").await.unwrap(), Some(json!(42)));
    }

    #[tokio::test]
    async fn operations_before_connect_fail() {
        let broker = InMemoryBroker::new();
        assert!(broker.get("k").await.is_err());
    }

    #[tokio::test]
    async fn expired_entry_is_a_miss_not_an_error() {
        let broker = InMemoryBroker::new();
        broker.connect().await.unwrap();
        broker
            .set("k", json!(1), Some(Duration::from_millis(1)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(broker.get("k").await.unwrap(), None);
        assert!(!broker.has("k").await.unwrap());
    }

    #[tokio::test]
    async fn clear_removes_everything() {
        let broker = InMemoryBroker::new();
        broker.connect().await.unwrap();
        broker.set("a", json!(1), None).await.unwrap();
        broker.set("b", json!(2), None).await.unwrap();
        broker.clear().await.unwrap();
        assert!(broker.keys("*").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn keys_filters_by_glob_pattern() {
        let broker = InMemoryBroker::new();
        broker.connect().await.unwrap();
        broker.set("smf:axis:0", json!(1.0), None).await.unwrap();
        broker.set("smf:axis:1", json!(2.0), None).await.unwrap();
        broker.set("smf:state", json!([0.0]), None).await.unwrap();
        let mut axes = broker.keys("smf:axis:*").await.unwrap();
        axes.sort();
        assert_eq!(axes, vec!["smf:axis:0".to_string(), "smf:axis:1".to_string()]);
    }
}
