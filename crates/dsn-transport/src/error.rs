//! The transport error type.

use thiserror::Error;

/// Errors raised by a [`crate::transport::Transport`] implementation.
#[derive(Debug, Error, Clone)]
pub enum TransportError {
    /// A `send` with `queue=false` was attempted on a transport that is not
    /// connected.
    #[error("transport not ready")]
    NotReady,
    /// The underlying transport failed to deliver a message it had already
    /// accepted (e.g. a socket write error).
    #[error("transport send failed: {0}")]
    SendFailed(String),
    /// The transport exhausted its reconnect attempts and settled into
    /// `Closed`.
    #[error("reconnect attempts exceeded")]
    ReconnectExceeded,
    /// The underlying connect attempt itself failed.
    #[error("connect failed: {0}")]
    ConnectFailed(String),
}

impl From<TransportError> for dsn_types::error::DsnError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::NotReady => dsn_types::error::DsnError::TransportNotReady,
            TransportError::SendFailed(s) => dsn_types::error::DsnError::TransportSendFailed(s),
            TransportError::ReconnectExceeded => dsn_types::error::DsnError::ReconnectExceeded,
            TransportError::ConnectFailed(s) => dsn_types::error::DsnError::TransportSendFailed(s),
        }
    }
}

/// Convenience alias for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;
