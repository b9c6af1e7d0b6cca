//! Out-of-band notifications a [`crate::transport::Transport`] emits
//! alongside ordinary inbound messages.

use crate::state::ConnectionState;
use serde::{Deserialize, Serialize};

/// A lifecycle or delivery event raised by a transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransportEvent {
    /// The transport finished connecting.
    Connected,
    /// The transport lost its connection and will attempt to reconnect.
    Disconnected {
        /// Human-readable reason, if known.
        reason: Option<String>,
    },
    /// A reconnect attempt is starting.
    Reconnecting {
        /// 1-based attempt number.
        attempt: u32,
        /// Delay before this attempt, in milliseconds.
        delay_ms: u64,
    },
    /// The transport exhausted `reconnectMaxAttempts` and settled into
    /// `Closed`.
    MaxReconnectExceeded,
    /// An outbound message was dropped because the queue was full and
    /// `queue: false` backpressure semantics applied, or because the queue
    /// itself overflowed.
    MessageDropped {
        /// Best-effort description of the dropped payload.
        reason: String,
    },
    /// The transport's connection state changed.
    StateChanged {
        /// The state transitioned from.
        from: ConnectionState,
        /// The state transitioned to.
        to: ConnectionState,
    },
}
