//! The file-backed broker: one JSON blob per key, tolerant of missing files.

use crate::broker::MemoryBroker;
use crate::error::{BrokerError, BrokerResult};
use crate::pattern::glob_match;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Serialize, Deserialize)]
struct Blob {
    key: String,
    value: Value,
    created_at: DateTime<Utc>,
    expiry: Option<DateTime<Utc>>,
}

/// Derives the on-disk filename for `key`: a sanitized prefix (non
/// alphanumerics replaced, truncated to 64 bytes) followed by a 16-hex-digit
/// content hash so distinct keys never collide after sanitization.
fn file_name_for(key: &str) -> String {
    let sanitized: String = key
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .take(64)
        .collect();
    let digest = Sha256::digest(key.as_bytes());
    let suffix = hex::encode(&digest[..8]);
    format!("{sanitized}-{suffix}.json")
}

/// A `MemoryBroker` backend that persists one JSON file per key under a
/// directory. Missing files are tolerated on `has`/`get`/`delete` (treated
/// as a miss), matching an in-memory broker's behavior for absent keys.
pub struct FileBroker {
    dir: PathBuf,
    connected: AtomicBool,
    /// An optional in-process read cache, populated on read and
    /// invalidated on write; purely an optimization, never authoritative.
    cache: RwLock<Option<lru::LruCache<String, Value>>>,
}

impl FileBroker {
    /// Builds a broker rooted at `dir`, without an in-process cache.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            connected: AtomicBool::new(false),
            cache: RwLock::new(None),
        }
    }

    /// Builds a broker rooted at `dir` with a bounded in-process read cache.
    pub fn with_cache(dir: impl Into<PathBuf>, cache_capacity: usize) -> Self {
        let cache = std::num::NonZeroUsize::new(cache_capacity).map(lru::LruCache::new);
        Self {
            dir: dir.into(),
            connected: AtomicBool::new(false),
            cache: RwLock::new(cache),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(file_name_for(key))
    }

    fn require_connected(&self) -> BrokerResult<()> {
        if self.connected.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(BrokerError::NotConnected)
        }
    }

    async fn read_blob(&self, path: &Path) -> BrokerResult<Option<Blob>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl MemoryBroker for FileBroker {
    async fn connect(&self) -> BrokerResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        self.connected.store(true, Ordering::Release);
        Ok(())
    }

    async fn disconnect(&self) -> BrokerResult<()> {
        self.connected.store(false, Ordering::Release);
        if let Some(c) = self.cache.write().await.as_mut() {
            c.clear();
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> BrokerResult<Option<Value>> {
        self.require_connected()?;
        if let Some(cache) = self.cache.write().await.as_mut() {
            if let Some(value) = cache.get(key) {
                return Ok(Some(value.clone()));
            }
        }
        let path = self.path_for(key);
        let Some(blob) = self.read_blob(&path).await? else {
            return Ok(None);
        };
        if blob.expiry.is_some_and(|e| Utc::now() >= e) {
            let _ = tokio::fs::remove_file(&path).await;
            return Ok(None);
        }
        if let Some(cache) = self.cache.write().await.as_mut() {
            cache.put(key.to_string(), blob.value.clone());
        }
        Ok(Some(blob.value))
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> BrokerResult<()> {
        self.require_connected()?;
        let blob = Blob {
            key: key.to_string(),
            value: value.clone(),
            created_at: Utc::now(),
            expiry: ttl.and_then(|d| chrono::Duration::from_std(d).ok()).map(|d| Utc::now() + d),
        };
        let bytes = serde_json::to_vec(&blob)?;
        tokio::fs::write(self.path_for(key), bytes).await?;
        if let Some(cache) = self.cache.write().await.as_mut() {
            cache.put(key.to_string(), value);
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> BrokerResult<bool> {
        self.require_connected()?;
        if let Some(c) = self.cache.write().await.as_mut() {
            c.pop(key);
        }
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn has(&self, key: &str) -> BrokerResult<bool> {
        Ok(self.get(key).await?.is_some())
    }

    async fn clear(&self) -> BrokerResult<()> {
        self.require_connected()?;
        let mut read_dir = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = read_dir.next_entry().await? {
            if entry.path().extension().is_some_and(|ext| ext == "json") {
                let _ = tokio::fs::remove_file(entry.path()).await;
            }
        }
        if let Some(c) = self.cache.write().await.as_mut() {
            c.clear();
        }
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> BrokerResult<Vec<String>> {
        self.require_connected()?;
        let mut out = Vec::new();
        let mut read_dir = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = read_dir.next_entry().await? {
            let path = entry.path();
            if !path.extension().is_some_and(|ext| ext == "json") {
                continue;
            }
            if let Some(blob) = self.read_blob(&path).await? {
                let live = match blob.expiry {
                    Some(e) => Utc::now() < e,
                    None => true,
                };
                if live && glob_match(pattern, &blob.key) {
                    out.push(blob.key);
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn set_then_get_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let broker = FileBroker::new(dir.path());
        broker.connect().await.unwrap();
        broker.set("key-a", json!({"x": 1}), None).await.unwrap();
        assert_eq!(broker.get("key-a").await.unwrap(), Some(json!({"x": 1})));
    }

    #[tokio::test]
    async fn missing_file_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let broker = FileBroker::new(dir.path());
        broker.connect().await.unwrap();
        assert_eq!(broker.get("never-set").await.unwrap(), None);
        assert!(!broker.delete("never-set").await.unwrap());
    }

    #[tokio::test]
    async fn expired_entry_is_evicted_on_read() {
        let dir = tempfile::tempdir().unwrap();
        let broker = FileBroker::new(dir.path());
        broker.connect().await.unwrap();
        broker
            .set("key-a", json!(1), Some(Duration::from_millis(1)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(broker.get("key-a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn keys_globs_over_persisted_blobs() {
        let dir = tempfile::tempdir().unwrap();
        let broker = FileBroker::new(dir.path());
        broker.connect().await.unwrap();
        broker.set("smf:axis:0", json!(1.0), None).await.unwrap();
        broker.set("smf:state", json!([0.0]), None).await.unwrap();
        let axes = broker.keys("smf:axis:*").await.unwrap();
        assert_eq!(axes, vec!["smf:axis:0".to_string()]);
    }
}
