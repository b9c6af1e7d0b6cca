//! The WebSocket transport, with automatic reconnect and a periodic
//! keepalive ping.

use crate::error::{TransportError, TransportResult};
use crate::events::TransportEvent;
use crate::queue::{OutboundQueue, DEFAULT_QUEUE_CAP};
use crate::reconnect::{attempts_remaining, backoff_delay_ms, DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_ATTEMPTS};
use crate::state::{ConnectionState, TransportStats, TransportStatsSnapshot};
use crate::transport::Transport;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dsn_types::wire::WireMessage;
use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::Message as WsMessage;

/// Default keepalive ping interval (`wsPingIntervalMs`).
pub const DEFAULT_PING_INTERVAL_MS: u64 = 30_000;

fn state_from_u8(v: u8) -> ConnectionState {
    match v {
        0 => ConnectionState::Disconnected,
        1 => ConnectionState::Connecting,
        2 => ConnectionState::Connected,
        3 => ConnectionState::Reconnecting,
        4 => ConnectionState::Closed,
        _ => ConnectionState::Error,
    }
}

fn u8_from_state(s: ConnectionState) -> u8 {
    match s {
        ConnectionState::Disconnected => 0,
        ConnectionState::Connecting => 1,
        ConnectionState::Connected => 2,
        ConnectionState::Reconnecting => 3,
        ConnectionState::Closed => 4,
        ConnectionState::Error => 5,
    }
}

struct Shared {
    url: String,
    state: AtomicU8,
    reconnect_attempt: AtomicU32,
    max_attempts: u32,
    base_delay_ms: u64,
    ping_interval_ms: u64,
    queue: OutboundQueue<WireMessage>,
    outbound_tx: tokio::sync::mpsc::UnboundedSender<WireMessage>,
    inbound_tx: broadcast::Sender<WireMessage>,
    events_tx: broadcast::Sender<TransportEvent>,
    stats: TransportStats,
    connected_at: Mutex<Option<DateTime<Utc>>>,
    disconnected_at: Mutex<Option<DateTime<Utc>>>,
}

impl Shared {
    fn set_state(&self, to: ConnectionState) {
        let from = state_from_u8(self.state.swap(u8_from_state(to), Ordering::SeqCst));
        if from != to {
            let _ = self.events_tx.send(TransportEvent::StateChanged { from, to });
        }
    }
}

/// A WebSocket-backed [`Transport`].
///
/// All shared state lives behind an internal `Arc<Shared>`, so `connect()`
/// can spawn a background driver task without requiring the transport
/// itself to be wrapped in an `Arc` by the caller.
pub struct WebSocketTransport {
    shared: Arc<Shared>,
    driver_spawned: AtomicBool,
    outbound_rx: Mutex<Option<tokio::sync::mpsc::UnboundedReceiver<WireMessage>>>,
}

impl WebSocketTransport {
    /// Creates a new, disconnected transport for `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_options(
            url,
            DEFAULT_QUEUE_CAP,
            DEFAULT_MAX_ATTEMPTS,
            DEFAULT_BASE_DELAY_MS,
            DEFAULT_PING_INTERVAL_MS,
        )
    }

    /// Creates a new, disconnected transport with explicit tuning.
    pub fn with_options(
        url: impl Into<String>,
        queue_cap: usize,
        max_attempts: u32,
        base_delay_ms: u64,
        ping_interval_ms: u64,
    ) -> Self {
        let (outbound_tx, outbound_rx) = tokio::sync::mpsc::unbounded_channel();
        let (inbound_tx, _) = broadcast::channel(256);
        let (events_tx, _) = broadcast::channel(64);
        Self {
            shared: Arc::new(Shared {
                url: url.into(),
                state: AtomicU8::new(u8_from_state(ConnectionState::Disconnected)),
                reconnect_attempt: AtomicU32::new(0),
                max_attempts,
                base_delay_ms,
                ping_interval_ms,
                queue: OutboundQueue::new(queue_cap),
                outbound_tx,
                inbound_tx,
                events_tx,
                stats: TransportStats::default(),
                connected_at: Mutex::new(None),
                disconnected_at: Mutex::new(None),
            }),
            driver_spawned: AtomicBool::new(false),
            outbound_rx: Mutex::new(Some(outbound_rx)),
        }
    }
}

async fn run_driver(
    shared: Arc<Shared>,
    mut outbound_rx: tokio::sync::mpsc::UnboundedReceiver<WireMessage>,
) {
    loop {
        shared.set_state(ConnectionState::Connecting);
        if let Ok((ws_stream, _response)) = tokio_tungstenite::connect_async(&shared.url).await {
            shared.reconnect_attempt.store(0, Ordering::SeqCst);
            shared.set_state(ConnectionState::Connected);
            #[allow(clippy::unwrap_used)]
            {
                *shared.connected_at.lock().unwrap() = Some(Utc::now());
            }
            let _ = shared.events_tx.send(TransportEvent::Connected);

            let (mut sink, mut stream) = ws_stream.split();
            for queued in shared.queue.drain() {
                if let Ok(text) = serde_json::to_string(&queued) {
                    let _ = sink.send(WsMessage::Text(text.into())).await;
                }
            }

            let mut ping_tick = tokio::time::interval(Duration::from_millis(shared.ping_interval_ms));
            loop {
                tokio::select! {
                    Some(out) = outbound_rx.recv() => {
                        if let Ok(text) = serde_json::to_string(&out) {
                            let bytes = text.len();
                            if sink.send(WsMessage::Text(text.into())).await.is_err() {
                                break;
                            }
                            shared.stats.record_out(bytes);
                        }
                    }
                    _ = ping_tick.tick() => {
                        if sink.send(WsMessage::Ping(Vec::new().into())).await.is_err() {
                            break;
                        }
                    }
                    msg = stream.next() => {
                        match msg {
                            Some(Ok(WsMessage::Text(text))) => {
                                shared.stats.record_in(text.len());
                                if let Ok(parsed) = serde_json::from_str::<WireMessage>(&text) {
                                    let _ = shared.inbound_tx.send(parsed);
                                }
                            }
                            Some(Ok(WsMessage::Close(_))) | None => break,
                            Some(Err(_)) => break,
                            _ => {}
                        }
                    }
                }
            }
        }

        shared.set_state(ConnectionState::Reconnecting);
        #[allow(clippy::unwrap_used)]
        {
            *shared.disconnected_at.lock().unwrap() = Some(Utc::now());
        }
        let _ = shared.events_tx.send(TransportEvent::Disconnected { reason: None });

        let attempt = shared.reconnect_attempt.fetch_add(1, Ordering::SeqCst) + 1;
        if !attempts_remaining(attempt, shared.max_attempts) {
            shared.set_state(ConnectionState::Closed);
            let _ = shared.events_tx.send(TransportEvent::MaxReconnectExceeded);
            break;
        }
        shared.stats.record_reconnect_attempt();
        let delay = backoff_delay_ms(attempt, shared.base_delay_ms);
        let _ = shared.events_tx.send(TransportEvent::Reconnecting {
            attempt,
            delay_ms: delay,
        });
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn connect(&self) -> TransportResult<()> {
        if state_from_u8(self.shared.state.load(Ordering::SeqCst)) == ConnectionState::Connected {
            return Ok(());
        }
        #[allow(clippy::unwrap_used)]
        let outbound_rx = self.outbound_rx.lock().unwrap().take();
        let Some(outbound_rx) = outbound_rx else {
            return Ok(());
        };
        if self.driver_spawned.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        tokio::spawn(run_driver(Arc::clone(&self.shared), outbound_rx));
        Ok(())
    }

    async fn disconnect(&self) -> TransportResult<()> {
        self.shared.set_state(ConnectionState::Disconnected);
        Ok(())
    }

    async fn send(&self, msg: WireMessage, queue: bool) -> TransportResult<()> {
        let connected =
            state_from_u8(self.shared.state.load(Ordering::SeqCst)) == ConnectionState::Connected;
        if connected {
            self.shared
                .outbound_tx
                .send(msg)
                .map_err(|e| TransportError::SendFailed(e.to_string()))?;
            return Ok(());
        }
        if !queue {
            return Err(TransportError::NotReady);
        }
        if !self.shared.queue.push(msg) {
            let _ = self.shared.events_tx.send(TransportEvent::MessageDropped {
                reason: "outbound queue full".into(),
            });
        }
        self.shared.stats.set_queue_depth(self.shared.queue.len());
        Ok(())
    }

    fn state(&self) -> ConnectionState {
        state_from_u8(self.shared.state.load(Ordering::SeqCst))
    }

    fn stats(&self) -> TransportStatsSnapshot {
        #[allow(clippy::unwrap_used)]
        let connected_at = *self.shared.connected_at.lock().unwrap();
        #[allow(clippy::unwrap_used)]
        let disconnected_at = *self.shared.disconnected_at.lock().unwrap();
        self.shared.stats.snapshot(connected_at, disconnected_at)
    }

    fn subscribe_messages(&self) -> broadcast::Receiver<WireMessage> {
        self.shared.inbound_tx.subscribe()
    }

    fn subscribe_events(&self) -> broadcast::Receiver<TransportEvent> {
        self.shared.events_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_transport_is_disconnected() {
        let t = WebSocketTransport::new("wss://example.invalid/ws");
        assert_eq!(t.state(), ConnectionState::Disconnected);
    }
}
