//! The Server-Sent Events transport: an inbound `GET` stream of `text/
//! event-stream` frames, with outbound messages sent via plain `POST`.

use crate::error::{TransportError, TransportResult};
use crate::events::TransportEvent;
use crate::queue::{OutboundQueue, DEFAULT_QUEUE_CAP};
use crate::state::{ConnectionState, TransportStats, TransportStatsSnapshot};
use crate::transport::Transport;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dsn_types::wire::WireMessage;
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

struct Shared {
    stream_url: String,
    send_url: String,
    client: reqwest::Client,
    connected: AtomicBool,
    queue: OutboundQueue<WireMessage>,
    inbound_tx: broadcast::Sender<WireMessage>,
    events_tx: broadcast::Sender<TransportEvent>,
    stats: TransportStats,
    connected_at: Mutex<Option<DateTime<Utc>>>,
    disconnected_at: Mutex<Option<DateTime<Utc>>>,
}

/// An SSE-backed [`Transport`]: receives over a streamed `GET`, sends over
/// ordinary `POST`.
pub struct SseTransport {
    shared: Arc<Shared>,
    reader_spawned: AtomicBool,
}

impl SseTransport {
    /// Creates a new, disconnected transport. `stream_url` is the SSE
    /// endpoint; `send_url` receives outbound `POST`s.
    pub fn new(stream_url: impl Into<String>, send_url: impl Into<String>) -> Self {
        let (inbound_tx, _) = broadcast::channel(256);
        let (events_tx, _) = broadcast::channel(64);
        Self {
            shared: Arc::new(Shared {
                stream_url: stream_url.into(),
                send_url: send_url.into(),
                client: reqwest::Client::new(),
                connected: AtomicBool::new(false),
                queue: OutboundQueue::new(DEFAULT_QUEUE_CAP),
                inbound_tx,
                events_tx,
                stats: TransportStats::default(),
                connected_at: Mutex::new(None),
                disconnected_at: Mutex::new(None),
            }),
            reader_spawned: AtomicBool::new(false),
        }
    }
}

/// Parses one `data: ...` line out of an SSE frame chunk, ignoring
/// `event:`/`id:`/comment lines, which this transport doesn't act on.
fn extract_data_lines(chunk: &str) -> Vec<String> {
    chunk
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|rest| rest.trim_start().to_string())
        .collect()
}

async fn run_reader(shared: Arc<Shared>) {
    let resp = match shared.client.get(&shared.stream_url).send().await {
        Ok(r) if r.status().is_success() => r,
        _ => {
            shared.connected.store(false, Ordering::SeqCst);
            let _ = shared
                .events_tx
                .send(TransportEvent::Disconnected { reason: Some("stream open failed".into()) });
            return;
        }
    };

    let mut bytes_stream = resp.bytes_stream();
    let mut buf = String::new();
    while let Some(chunk) = bytes_stream.next().await {
        let Ok(chunk) = chunk else {
            break;
        };
        buf.push_str(&String::from_utf8_lossy(&chunk));
        while let Some(idx) = buf.find("\n\n") {
            let frame: String = buf.drain(..idx + 2).collect();
            for data in extract_data_lines(&frame) {
                shared.stats.record_in(data.len());
                if let Ok(parsed) = serde_json::from_str::<WireMessage>(&data) {
                    let _ = shared.inbound_tx.send(parsed);
                }
            }
        }
    }

    shared.connected.store(false, Ordering::SeqCst);
    #[allow(clippy::unwrap_used)]
    {
        *shared.disconnected_at.lock().unwrap() = Some(Utc::now());
    }
    let _ = shared
        .events_tx
        .send(TransportEvent::Disconnected { reason: Some("stream closed".into()) });
}

#[async_trait]
impl Transport for SseTransport {
    async fn connect(&self) -> TransportResult<()> {
        if self.shared.connected.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.shared.connected.store(true, Ordering::SeqCst);
        #[allow(clippy::unwrap_used)]
        {
            *self.shared.connected_at.lock().unwrap() = Some(Utc::now());
        }
        let _ = self.shared.events_tx.send(TransportEvent::Connected);

        for msg in self.shared.queue.drain() {
            let _ = self.shared.client.post(&self.shared.send_url).json(&msg).send().await;
        }

        if !self.reader_spawned.swap(true, Ordering::SeqCst) {
            tokio::spawn(run_reader(Arc::clone(&self.shared)));
        }
        Ok(())
    }

    async fn disconnect(&self) -> TransportResult<()> {
        if !self.shared.connected.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        let _ = self
            .shared
            .events_tx
            .send(TransportEvent::Disconnected { reason: None });
        Ok(())
    }

    async fn send(&self, msg: WireMessage, queue: bool) -> TransportResult<()> {
        if self.shared.connected.load(Ordering::SeqCst) {
            let bytes = serde_json::to_vec(&msg).map(|b| b.len()).unwrap_or(0);
            self.shared
                .client
                .post(&self.shared.send_url)
                .json(&msg)
                .send()
                .await
                .map_err(|e| TransportError::SendFailed(e.to_string()))?;
            self.shared.stats.record_out(bytes);
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
        Ok(())
    }

    fn state(&self) -> ConnectionState {
        if self.shared.connected.load(Ordering::SeqCst) {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
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
    use super::extract_data_lines;

    #[test]
    fn extracts_data_lines_only() {
        let frame = "event: object\ndata: {\"a\":1}\nid: 7\n\n";
        assert_eq!(extract_data_lines(frame), vec!["{\"a\":1}".to_string()]);
    }
}
