//! The `MemoryBroker` trait: the pluggable KV substrate every backend and
//! wrapper in this crate implements.

use crate::error::BrokerResult;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

/// A pluggable key/value substrate for state, history, and codebooks.
///
/// Implementations back this with an in-memory map, on-disk JSON blobs, an
/// LRU cache in front of another broker, or a typed semantic-vector facade.
/// All keys and patterns are plain UTF-8 strings; values are JSON, so
/// backends never need to know the shape of what they're storing.
#[async_trait]
pub trait MemoryBroker: Send + Sync {
    /// Establishes the backend connection. Idempotent.
    async fn connect(&self) -> BrokerResult<()>;

    /// Tears down the backend connection. Idempotent.
    async fn disconnect(&self) -> BrokerResult<()>;

    /// Reads a key. Returns `Ok(None)` for a miss, including an expired key.
    async fn get(&self, key: &str) -> BrokerResult<Option<Value>>;

    /// Writes a key, optionally with an absolute-deadline TTL.
    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> BrokerResult<()>;

    /// Removes a key. Returns whether a live entry was present.
    async fn delete(&self, key: &str) -> BrokerResult<bool>;

    /// Returns whether a live (non-expired) entry exists for `key`.
    async fn has(&self, key: &str) -> BrokerResult<bool>;

    /// Removes every entry.
    async fn clear(&self) -> BrokerResult<()>;

    /// Lists keys matching a glob `pattern` (`*`, `?`).
    async fn keys(&self, pattern: &str) -> BrokerResult<Vec<String>>;

    /// Reads several keys at once. The default implementation loops over
    /// `get`; backends with bulk-read support should override it.
    async fn get_many(&self, keys: &[String]) -> BrokerResult<BTreeMap<String, Value>> {
        let mut out = BTreeMap::new();
        for key in keys {
            if let Some(value) = self.get(key).await? {
                out.insert(key.clone(), value);
            }
        }
        Ok(out)
    }

    /// Writes several keys at once, sharing one TTL. The default
    /// implementation loops over `set`.
    async fn set_many(
        &self,
        entries: BTreeMap<String, Value>,
        ttl: Option<Duration>,
    ) -> BrokerResult<()> {
        for (key, value) in entries {
            self.set(&key, value, ttl).await?;
        }
        Ok(())
    }
}
