//! The domain broker: typed semantic-vector convenience operations layered
//! over a plain [`MemoryBroker`], matching the `smf:*` key layout.

use crate::broker::MemoryBroker;
use crate::error::{BrokerError, BrokerResult};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};

const AXIS_COUNT: usize = 16;

fn axis_key(i: usize) -> String {
    format!("smf:axis:{i}")
}

fn history_key(tick: u64) -> String {
    format!("smf:history:{tick}")
}

/// Emitted on the domain broker's event channel after every write.
#[derive(Debug, Clone)]
pub struct SmfUpdated {
    /// Which key layout class changed (`"state"`, `"axis"`, `"codebook"`,
    /// or `"history"`).
    pub kind: &'static str,
}

/// A typed facade over a [`MemoryBroker`] for the semantic orientation
/// vector, exposing the `smf:*` key layout as get/set operations instead of
/// raw JSON blobs.
///
/// `rotate_axes` is the one genuinely compound operation here: it reads all
/// sixteen axis keys, applies deltas, and writes them back, guarded by an
/// internal mutex so it's atomic with respect to other `DomainBroker`
/// callers even though the underlying broker only guarantees atomicity at
/// single-key granularity.
pub struct DomainBroker<B: MemoryBroker> {
    inner: Arc<B>,
    rotate_lock: Mutex<()>,
    events: broadcast::Sender<SmfUpdated>,
}

impl<B: MemoryBroker> DomainBroker<B> {
    /// Wraps `inner` with the domain-specific `smf:*` operations.
    pub fn new(inner: Arc<B>) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            inner,
            rotate_lock: Mutex::new(()),
            events,
        }
    }

    /// Subscribes to `smf_updated` notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<SmfUpdated> {
        self.events.subscribe()
    }

    fn notify(&self, kind: &'static str) {
        let _ = self.events.send(SmfUpdated { kind });
    }

    /// Reads the full semantic vector from `smf:state`.
    pub async fn get_smf(&self) -> BrokerResult<Option<Vec<f64>>> {
        let Some(value) = self.inner.get("smf:state").await? else {
            return Ok(None);
        };
        parse_vector(&value).map(Some)
    }

    /// Writes the full semantic vector to `smf:state`.
    pub async fn set_smf(&self, vector: &[f64]) -> BrokerResult<()> {
        self.inner
            .set("smf:state", json!({ "s": vector }), None)
            .await?;
        self.notify("state");
        Ok(())
    }

    /// Reads a single axis component.
    pub async fn get_axis(&self, index: usize) -> BrokerResult<Option<f64>> {
        let Some(value) = self.inner.get(&axis_key(index)).await? else {
            return Ok(None);
        };
        value
            .as_f64()
            .ok_or_else(|| BrokerError::Serialization(format!("axis {index} is not a number")))
            .map(Some)
    }

    /// Writes a single axis component.
    pub async fn set_axis(&self, index: usize, value: f64) -> BrokerResult<()> {
        self.inner.set(&axis_key(index), json!(value), None).await?;
        self.notify("axis");
        Ok(())
    }

    /// Atomically applies `deltas` to the sixteen axis keys: reads each
    /// current value (defaulting missing axes to `0.0`), adds the
    /// corresponding delta, and writes every axis back.
    pub async fn rotate_axes(&self, deltas: &[f64; AXIS_COUNT]) -> BrokerResult<[f64; AXIS_COUNT]> {
        let _guard = self.rotate_lock.lock().await;
        let mut next = [0.0; AXIS_COUNT];
        for (i, slot) in next.iter_mut().enumerate() {
            let current = self.get_axis(i).await?.unwrap_or(0.0);
            *slot = current + deltas[i];
        }
        for (i, &v) in next.iter().enumerate() {
            self.inner.set(&axis_key(i), json!(v), None).await?;
        }
        self.notify("axis");
        Ok(next)
    }

    /// Reads the cached codebook.
    pub async fn get_codebook(&self) -> BrokerResult<Option<Value>> {
        self.inner.get("smf:codebook").await
    }

    /// Writes the codebook.
    pub async fn set_codebook(&self, codebook: Value) -> BrokerResult<()> {
        self.inner.set("smf:codebook", codebook, None).await?;
        self.notify("codebook");
        Ok(())
    }

    /// Stores a history snapshot for `tick`, bound by `ttl`.
    pub async fn store_history(
        &self,
        tick: u64,
        snapshot: Value,
        ttl: Option<Duration>,
    ) -> BrokerResult<()> {
        self.inner.set(&history_key(tick), snapshot, ttl).await?;
        self.notify("history");
        Ok(())
    }

    /// Reads a previously stored history snapshot.
    pub async fn get_history(&self, tick: u64) -> BrokerResult<Option<Value>> {
        self.inner.get(&history_key(tick)).await
    }
}

fn parse_vector(value: &Value) -> BrokerResult<Vec<f64>> {
    value
        .get("s")
        .and_then(Value::as_array)
        .ok_or_else(|| BrokerError::Serialization("smf:state missing \"s\" array".into()))?
        .iter()
        .map(|v| {
            v.as_f64()
                .ok_or_else(|| BrokerError::Serialization("smf:state entry is not a number".into()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryBroker;

    async fn connected_domain() -> DomainBroker<InMemoryBroker> {
        let inner = Arc::new(InMemoryBroker::new());
        inner.connect().await.unwrap();
        DomainBroker::new(inner)
    }

    #[tokio::test]
    async fn smf_state_round_trips() {
        let domain = connected_domain().await;
        let vector: Vec<f64> = (0..16).map(|i| i as f64 * 0.5).collect();
        domain.set_smf(&vector).await.unwrap();
        assert_eq!(domain.get_smf().await.unwrap(), Some(vector));
    }

    #[tokio::test]
    async fn rotate_axes_accumulates_deltas_from_zero() {
        let domain = connected_domain().await;
        let mut deltas = [0.0; AXIS_COUNT];
        deltas[0] = 1.5;
        deltas[4] = -0.5;
        let after = domain.rotate_axes(&deltas).await.unwrap();
        assert_eq!(after[0], 1.5);
        assert_eq!(after[4], -0.5);

        let second = domain.rotate_axes(&deltas).await.unwrap();
        assert_eq!(second[0], 3.0);
    }

    #[tokio::test]
    async fn write_emits_smf_updated_event() {
        let domain = connected_domain().await;
        let mut rx = domain.subscribe();
        domain.set_axis(2, 9.0).await.unwrap();
        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, "axis");
    }
}
