//! Connection state machine and delivery statistics common to every
//! transport variant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A transport's lifecycle state.
///
/// `connect()`/`disconnect()` are idempotent: calling `connect` on an
/// already-`Connected` transport is a no-op, and the reverse for
/// `disconnect` on an already-`Disconnected` one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No connection attempt is in flight.
    Disconnected,
    /// A connection attempt is in flight.
    Connecting,
    /// Connected and able to send/receive.
    Connected,
    /// Connection was lost; automatic reconnect with backoff is running.
    Reconnecting,
    /// The transport gave up after exhausting its reconnect attempts.
    Closed,
    /// A terminal, non-reconnectable failure.
    Error,
}

/// Delivery statistics tracked by every transport variant.
#[derive(Debug, Default)]
pub struct TransportStats {
    bytes_in: AtomicU64,
    bytes_out: AtomicU64,
    messages_in: AtomicU64,
    messages_out: AtomicU64,
    reconnect_attempts: AtomicU64,
    queue_depth: AtomicU64,
}

/// An immutable point-in-time read of [`TransportStats`], plus the
/// connect/disconnect timestamps the live counters don't carry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportStatsSnapshot {
    /// Total bytes received.
    pub bytes_in: u64,
    /// Total bytes sent.
    pub bytes_out: u64,
    /// Total messages received.
    pub messages_in: u64,
    /// Total messages sent.
    pub messages_out: u64,
    /// Total reconnect attempts made over the transport's lifetime.
    pub reconnect_attempts: u64,
    /// Current outbound queue depth.
    pub queue_depth: u64,
    /// When the transport last became connected, if ever.
    pub connected_at: Option<DateTime<Utc>>,
    /// When the transport last disconnected, if ever.
    pub disconnected_at: Option<DateTime<Utc>>,
}

impl TransportStats {
    /// Records `n` bytes and one message received.
    pub fn record_in(&self, bytes: usize) {
        self.bytes_in.fetch_add(bytes as u64, Ordering::Relaxed);
        self.messages_in.fetch_add(1, Ordering::Relaxed);
    }

    /// Records `n` bytes and one message sent.
    pub fn record_out(&self, bytes: usize) {
        self.bytes_out.fetch_add(bytes as u64, Ordering::Relaxed);
        self.messages_out.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the reconnect-attempt counter.
    pub fn record_reconnect_attempt(&self) {
        self.reconnect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    /// Sets the current outbound queue depth.
    pub fn set_queue_depth(&self, depth: usize) {
        self.queue_depth.store(depth as u64, Ordering::Relaxed);
    }

    /// Takes a snapshot, filling in connect/disconnect timestamps from the
    /// caller (the counters here don't track wall-clock time themselves).
    pub fn snapshot(
        &self,
        connected_at: Option<DateTime<Utc>>,
        disconnected_at: Option<DateTime<Utc>>,
    ) -> TransportStatsSnapshot {
        TransportStatsSnapshot {
            bytes_in: self.bytes_in.load(Ordering::Relaxed),
            bytes_out: self.bytes_out.load(Ordering::Relaxed),
            messages_in: self.messages_in.load(Ordering::Relaxed),
            messages_out: self.messages_out.load(Ordering::Relaxed),
            reconnect_attempts: self.reconnect_attempts.load(Ordering::Relaxed),
            queue_depth: self.queue_depth.load(Ordering::Relaxed),
            connected_at,
            disconnected_at,
        }
    }
}
