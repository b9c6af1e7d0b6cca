//! The in-process transport: two endpoints wired together directly for
//! same-runtime peers (tests, single-process multi-node simulations).

use crate::error::TransportResult;
use crate::events::TransportEvent;
use crate::state::{ConnectionState, TransportStats, TransportStatsSnapshot};
use crate::transport::Transport;
use async_trait::async_trait;
use chrono::Utc;
use dsn_types::wire::WireMessage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// One end of an in-process transport pair. `send` hands the message
/// straight to the peer's inbound channel — there's no network, but
/// delivery still goes through the same broadcast-channel plumbing every
/// other variant uses, so callers can't tell the difference from the
/// `Transport` trait alone.
pub struct InProcessTransport {
    connected: AtomicBool,
    peer_inbound: broadcast::Sender<WireMessage>,
    inbound_tx: broadcast::Sender<WireMessage>,
    events_tx: broadcast::Sender<TransportEvent>,
    stats: TransportStats,
}

impl InProcessTransport {
    /// Builds a connected pair of transports, each delivering directly to
    /// the other.
    pub fn pair() -> (Arc<Self>, Arc<Self>) {
        let (tx_a, _) = broadcast::channel(256);
        let (tx_b, _) = broadcast::channel(256);

        let a = Arc::new(Self {
            connected: AtomicBool::new(false),
            peer_inbound: tx_b.clone(),
            inbound_tx: tx_a,
            events_tx: broadcast::channel(64).0,
            stats: TransportStats::default(),
        });
        let b = Arc::new(Self {
            connected: AtomicBool::new(false),
            peer_inbound: a.inbound_tx.clone(),
            inbound_tx: tx_b,
            events_tx: broadcast::channel(64).0,
            stats: TransportStats::default(),
        });
        (a, b)
    }
}

#[async_trait]
impl Transport for InProcessTransport {
    async fn connect(&self) -> TransportResult<()> {
        if self.connected.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let _ = self.events_tx.send(TransportEvent::Connected);
        Ok(())
    }

    async fn disconnect(&self) -> TransportResult<()> {
        if !self.connected.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        let _ = self.events_tx.send(TransportEvent::Disconnected { reason: None });
        Ok(())
    }

    async fn send(&self, msg: WireMessage, queue: bool) -> TransportResult<()> {
        if !self.connected.load(Ordering::SeqCst) && !queue {
            return Err(crate::error::TransportError::NotReady);
        }
        let bytes = serde_json::to_vec(&msg).map(|b| b.len()).unwrap_or(0);
        self.stats.record_out(bytes);
        let _ = self.peer_inbound.send(msg);
        Ok(())
    }

    fn state(&self) -> ConnectionState {
        if self.connected.load(Ordering::SeqCst) {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    fn stats(&self) -> TransportStatsSnapshot {
        let now = if self.connected.load(Ordering::SeqCst) {
            Some(Utc::now())
        } else {
            None
        };
        self.stats.snapshot(now, None)
    }

    fn subscribe_messages(&self) -> broadcast::Receiver<WireMessage> {
        self.inbound_tx.subscribe()
    }

    fn subscribe_events(&self) -> broadcast::Receiver<TransportEvent> {
        self.events_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsn_types::wire::WireMessage;

    #[tokio::test]
    async fn pair_delivers_across() {
        let (a, b) = InProcessTransport::pair();
        a.connect().await.unwrap();
        b.connect().await.unwrap();
        let mut rx_b = b.subscribe_messages();

        a.send(WireMessage::Ping { timestamp: 1 }, false).await.unwrap();
        let got = rx_b.recv().await.unwrap();
        assert!(matches!(got, WireMessage::Ping { timestamp: 1 }));
    }

    #[tokio::test]
    async fn send_without_queue_while_disconnected_errors() {
        let (a, _b) = InProcessTransport::pair();
        let err = a.send(WireMessage::Ping { timestamp: 1 }, false).await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn connect_is_idempotent() {
        let (a, _b) = InProcessTransport::pair();
        a.connect().await.unwrap();
        a.connect().await.unwrap();
        assert_eq!(a.state(), ConnectionState::Connected);
    }
}
