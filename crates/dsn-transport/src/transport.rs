//! The transport-agnostic [`Transport`] trait implemented by every
//! concrete delivery mechanism (in-process, WebSocket, HTTP long-poll, SSE,
//! WebRTC).

use crate::error::TransportResult;
use crate::state::{ConnectionState, TransportStatsSnapshot};
use async_trait::async_trait;
use dsn_types::wire::WireMessage;
use tokio::sync::broadcast;

/// A transport-agnostic, bidirectional message channel.
///
/// `connect` and `disconnect` are idempotent: calling `connect` while
/// already `Connected` (or `disconnect` while already `Disconnected`) is a
/// no-op that returns `Ok(())`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Establishes (or re-establishes) the underlying connection.
    async fn connect(&self) -> TransportResult<()>;

    /// Tears down the underlying connection. Idempotent.
    async fn disconnect(&self) -> TransportResult<()>;

    /// Sends `msg`. If `queue` is `true` and the transport is not currently
    /// connected, the message is appended to the outbound queue and sent
    /// once the connection is restored, subject to the queue's capacity
    /// and drop-newest overflow policy. If `queue` is `false` and the
    /// transport is not connected, returns
    /// [`crate::error::TransportError::NotReady`] immediately.
    async fn send(&self, msg: WireMessage, queue: bool) -> TransportResult<()>;

    /// The transport's current connection state.
    fn state(&self) -> ConnectionState;

    /// A point-in-time snapshot of delivery statistics.
    fn stats(&self) -> TransportStatsSnapshot;

    /// Subscribes to inbound messages.
    fn subscribe_messages(&self) -> broadcast::Receiver<WireMessage>;

    /// Subscribes to lifecycle/delivery events.
    fn subscribe_events(&self) -> broadcast::Receiver<crate::events::TransportEvent>;
}
