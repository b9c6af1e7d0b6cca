//! The WebRTC transport: a thin wrapper around a data channel that is
//! opened and signaled outside this crate (this crate has no opinion on
//! ICE/SDP negotiation). `connect()` only asserts the channel is already
//! open.

use crate::error::{TransportError, TransportResult};
use crate::events::TransportEvent;
use crate::queue::{OutboundQueue, DEFAULT_QUEUE_CAP};
use crate::state::{ConnectionState, TransportStats, TransportStatsSnapshot};
use crate::transport::Transport;
use async_trait::async_trait;
use chrono::Utc;
use dsn_types::wire::WireMessage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio::sync::broadcast;

/// A send function supplied by the caller's externally-managed data
/// channel. Returning `Err` is treated as a transient send failure.
pub type RawSend = Box<dyn Fn(&str) -> Result<(), String> + Send + Sync>;

/// Wraps an already-negotiated WebRTC data channel.
pub struct WebRtcTransport {
    raw_send: RawSend,
    open: AtomicBool,
    queue: OutboundQueue<WireMessage>,
    inbound_tx: broadcast::Sender<WireMessage>,
    events_tx: broadcast::Sender<TransportEvent>,
    stats: TransportStats,
    connected_at: Mutex<Option<chrono::DateTime<Utc>>>,
}

impl WebRtcTransport {
    /// Wraps a data channel whose `open` flag reflects whether the peer
    /// connection has completed negotiation, and whose `raw_send` writes a
    /// JSON frame directly to the channel.
    pub fn new(initially_open: bool, raw_send: RawSend) -> Self {
        let (inbound_tx, _) = broadcast::channel(256);
        let (events_tx, _) = broadcast::channel(64);
        Self {
            raw_send,
            open: AtomicBool::new(initially_open),
            queue: OutboundQueue::new(DEFAULT_QUEUE_CAP),
            inbound_tx,
            events_tx,
            stats: TransportStats::default(),
            connected_at: Mutex::new(None),
        }
    }

    /// Feeds an inbound frame received by the caller's data channel
    /// `onmessage` handler into this transport's subscribers.
    pub fn deliver_inbound(&self, text: &str) {
        self.stats.record_in(text.len());
        if let Ok(parsed) = serde_json::from_str::<WireMessage>(text) {
            let _ = self.inbound_tx.send(parsed);
        }
    }

    /// Notifies this transport that the wrapped data channel closed, so it
    /// can surface the disconnect and stop attempting sends.
    pub fn notify_closed(&self) {
        if self.open.swap(false, Ordering::SeqCst) {
            let _ = self
                .events_tx
                .send(TransportEvent::Disconnected { reason: Some("data channel closed".into()) });
        }
    }
}

#[async_trait]
impl Transport for WebRtcTransport {
    async fn connect(&self) -> TransportResult<()> {
        if !self.open.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectFailed(
                "data channel is not open; negotiate it externally first".into(),
            ));
        }
        #[allow(clippy::unwrap_used)]
        {
            *self.connected_at.lock().unwrap() = Some(Utc::now());
        }
        let _ = self.events_tx.send(TransportEvent::Connected);
        for msg in self.queue.drain() {
            if let Ok(text) = serde_json::to_string(&msg) {
                let _ = (self.raw_send)(&text);
            }
        }
        Ok(())
    }

    async fn disconnect(&self) -> TransportResult<()> {
        self.notify_closed();
        Ok(())
    }

    async fn send(&self, msg: WireMessage, queue: bool) -> TransportResult<()> {
        if self.open.load(Ordering::SeqCst) {
            let text = serde_json::to_string(&msg)
                .map_err(|e| TransportError::SendFailed(e.to_string()))?;
            (self.raw_send)(&text).map_err(TransportError::SendFailed)?;
            self.stats.record_out(text.len());
            return Ok(());
        }
        if !queue {
            return Err(TransportError::NotReady);
        }
        if !self.queue.push(msg) {
            let _ = self.events_tx.send(TransportEvent::MessageDropped {
                reason: "outbound queue full".into(),
            });
        }
        Ok(())
    }

    fn state(&self) -> ConnectionState {
        if self.open.load(Ordering::SeqCst) {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    fn stats(&self) -> TransportStatsSnapshot {
        #[allow(clippy::unwrap_used)]
        let connected_at = *self.connected_at.lock().unwrap();
        self.stats.snapshot(connected_at, None)
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

    #[tokio::test]
    async fn connect_fails_when_channel_not_open() {
        let t = WebRtcTransport::new(false, Box::new(|_| Ok(())));
        assert!(t.connect().await.is_err());
    }

    #[tokio::test]
    async fn send_succeeds_through_raw_send_when_open() {
        let t = WebRtcTransport::new(true, Box::new(|_| Ok(())));
        t.connect().await.unwrap();
        t.send(WireMessage::Ping { timestamp: 1 }, false).await.unwrap();
    }
}
