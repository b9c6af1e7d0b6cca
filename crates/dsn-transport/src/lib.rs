#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::indexing_slicing
    )
)]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! # DSN Transport
//!
//! A transport-agnostic message channel abstraction with five concrete
//! backends (in-process, WebSocket, HTTP long-poll, Server-Sent Events,
//! WebRTC), automatic reconnect with exponential backoff, bounded outbound
//! queueing, and a preference-ordered fallback manager.

/// Lifecycle/delivery events emitted by a transport.
pub mod events;
/// The transport error type.
pub mod error;
/// The in-process transport (same-runtime peers).
pub mod in_process;
/// The HTTP long-poll transport.
pub mod http_long_poll;
/// The preference-ordered transport manager.
pub mod manager;
/// The bounded outbound queue.
pub mod queue;
/// Exponential reconnect backoff.
pub mod reconnect;
/// The Server-Sent Events transport.
pub mod sse;
/// Connection state and delivery statistics.
pub mod state;
/// The core `Transport` trait.
pub mod transport;
/// The WebRTC data-channel transport.
pub mod webrtc;
/// The WebSocket transport.
pub mod websocket;

pub use error::{TransportError, TransportResult};
pub use events::TransportEvent;
pub use in_process::InProcessTransport;
pub use manager::TransportManager;
pub use queue::{OutboundQueue, DEFAULT_QUEUE_CAP};
pub use reconnect::{attempts_remaining, backoff_delay_ms, DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_ATTEMPTS};
pub use state::{ConnectionState, TransportStats, TransportStatsSnapshot};
pub use transport::Transport;
