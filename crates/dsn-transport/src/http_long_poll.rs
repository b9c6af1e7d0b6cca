//! The HTTP long-poll transport: `POST /session` to establish a session,
//! repeated `GET /poll/{id}` for inbound messages, `POST /send/{id}` for
//! outbound ones.

use crate::error::{TransportError, TransportResult};
use crate::events::TransportEvent;
use crate::queue::{OutboundQueue, DEFAULT_QUEUE_CAP};
use crate::state::{ConnectionState, TransportStats, TransportStatsSnapshot};
use crate::transport::Transport;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dsn_types::wire::WireMessage;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::broadcast;

#[derive(Deserialize)]
struct SessionResponse {
    id: String,
}

struct Shared {
    base_url: String,
    client: reqwest::Client,
    poll_interval_ms: u64,
    session_id: RwLock<Option<String>>,
    connected: AtomicBool,
    queue: OutboundQueue<WireMessage>,
    inbound_tx: broadcast::Sender<WireMessage>,
    events_tx: broadcast::Sender<TransportEvent>,
    stats: TransportStats,
    connected_at: Mutex<Option<DateTime<Utc>>>,
    disconnected_at: Mutex<Option<DateTime<Utc>>>,
}

/// An HTTP long-poll-backed [`Transport`], for environments where a
/// persistent socket isn't available.
pub struct HttpLongPollTransport {
    shared: Arc<Shared>,
    poll_task_spawned: AtomicBool,
}

impl HttpLongPollTransport {
    /// Creates a new, disconnected transport against `base_url`.
    pub fn new(base_url: impl Into<String>, poll_interval_ms: u64) -> Self {
        let (inbound_tx, _) = broadcast::channel(256);
        let (events_tx, _) = broadcast::channel(64);
        Self {
            shared: Arc::new(Shared {
                base_url: base_url.into(),
                client: reqwest::Client::new(),
                poll_interval_ms,
                session_id: RwLock::new(None),
                connected: AtomicBool::new(false),
                queue: OutboundQueue::new(DEFAULT_QUEUE_CAP),
                inbound_tx,
                events_tx,
                stats: TransportStats::default(),
                connected_at: Mutex::new(None),
                disconnected_at: Mutex::new(None),
            }),
            poll_task_spawned: AtomicBool::new(false),
        }
    }

    async fn flush_queue(shared: &Arc<Shared>, session_id: &str) {
        for msg in shared.queue.drain() {
            let url = format!("{}/send/{}", shared.base_url, session_id);
            let _ = shared.client.post(url).json(&msg).send().await;
        }
    }
}

async fn run_poll_loop(shared: Arc<Shared>, session_id: String) {
    loop {
        if !shared.connected.load(Ordering::SeqCst) {
            return;
        }
        let url = format!("{}/poll/{}", shared.base_url, session_id);
        match shared.client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => {
                if let Ok(messages) = resp.json::<Vec<WireMessage>>().await {
                    for msg in messages {
                        let bytes = serde_json::to_vec(&msg).map(|b| b.len()).unwrap_or(0);
                        shared.stats.record_in(bytes);
                        let _ = shared.inbound_tx.send(msg);
                    }
                }
            }
            _ => {
                shared.connected.store(false, Ordering::SeqCst);
                #[allow(clippy::unwrap_used)]
                {
                    *shared.disconnected_at.lock().unwrap() = Some(Utc::now());
                }
                let _ = shared
                    .events_tx
                    .send(TransportEvent::Disconnected { reason: Some("poll failed".into()) });
                return;
            }
        }
        tokio::time::sleep(std::time::Duration::from_millis(shared.poll_interval_ms)).await;
    }
}

#[async_trait]
impl Transport for HttpLongPollTransport {
    async fn connect(&self) -> TransportResult<()> {
        if self.shared.connected.load(Ordering::SeqCst) {
            return Ok(());
        }
        let url = format!("{}/session", self.shared.base_url);
        let resp = self
            .shared
            .client
            .post(url)
            .send()
            .await
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;
        let session: SessionResponse = resp
            .json()
            .await
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;

        #[allow(clippy::unwrap_used)]
        {
            *self.shared.session_id.write().unwrap() = Some(session.id.clone());
        }
        self.shared.connected.store(true, Ordering::SeqCst);
        #[allow(clippy::unwrap_used)]
        {
            *self.shared.connected_at.lock().unwrap() = Some(Utc::now());
        }
        let _ = self.shared.events_tx.send(TransportEvent::Connected);

        Self::flush_queue(&self.shared, &session.id).await;

        if !self.poll_task_spawned.swap(true, Ordering::SeqCst) {
            tokio::spawn(run_poll_loop(Arc::clone(&self.shared), session.id));
        }
        Ok(())
    }

    async fn disconnect(&self) -> TransportResult<()> {
        if !self.shared.connected.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        #[allow(clippy::unwrap_used)]
        {
            *self.shared.disconnected_at.lock().unwrap() = Some(Utc::now());
        }
        let _ = self
            .shared
            .events_tx
            .send(TransportEvent::Disconnected { reason: None });
        Ok(())
    }

    async fn send(&self, msg: WireMessage, queue: bool) -> TransportResult<()> {
        if self.shared.connected.load(Ordering::SeqCst) {
            #[allow(clippy::unwrap_used)]
            let session_id = self.shared.session_id.read().unwrap().clone();
            if let Some(session_id) = session_id {
                let url = format!("{}/send/{}", self.shared.base_url, session_id);
                let bytes = serde_json::to_vec(&msg).map(|b| b.len()).unwrap_or(0);
                self.shared
                    .client
                    .post(url)
                    .json(&msg)
                    .send()
                    .await
                    .map_err(|e| TransportError::SendFailed(e.to_string()))?;
                self.shared.stats.record_out(bytes);
                return Ok(());
            }
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
