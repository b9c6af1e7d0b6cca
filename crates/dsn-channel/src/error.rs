//! The channel error type.

use thiserror::Error;

/// Errors raised by a [`crate::channel::PrrcChannel`].
#[derive(Debug, Error, Clone)]
pub enum ChannelError {
    /// `sendObject`/broadcast targeted a peer that hasn't completed the
    /// handshake.
    #[error("peer {0} is not connected")]
    PeerNotConnected(String),
    /// The named peer has no registry entry at all.
    #[error("unknown peer {0}")]
    UnknownPeer(String),
    /// The underlying transport rejected the send.
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<dsn_transport::TransportError> for ChannelError {
    fn from(e: dsn_transport::TransportError) -> Self {
        ChannelError::Transport(e.to_string())
    }
}

/// Convenience alias for channel operations.
pub type ChannelResult<T> = Result<T, ChannelError>;
