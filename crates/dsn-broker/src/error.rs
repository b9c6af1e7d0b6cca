//! The memory broker's error type.

use thiserror::Error;

/// Errors raised by a [`crate::broker::MemoryBroker`] implementation.
///
/// `KeyExpired` is deliberately absent: an expired key is surfaced as a
/// plain miss (`Ok(None)` / `Ok(false)`), never as an error.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// An operation was attempted before `connect()` or after `disconnect()`.
    #[error("broker not connected")]
    NotConnected,
    /// A backend IO error, surfaced verbatim except for "not found", which
    /// callers normalize to a miss before it reaches this variant.
    #[error("broker io error: {0}")]
    Io(String),
    /// A stored blob failed to (de)serialize.
    #[error("broker serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for BrokerError {
    fn from(e: std::io::Error) -> Self {
        BrokerError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for BrokerError {
    fn from(e: serde_json::Error) -> Self {
        BrokerError::Serialization(e.to_string())
    }
}

impl From<BrokerError> for dsn_types::error::DsnError {
    fn from(e: BrokerError) -> Self {
        match e {
            BrokerError::NotConnected => dsn_types::error::DsnError::BrokerNotConnected,
            BrokerError::Io(s) | BrokerError::Serialization(s) => {
                dsn_types::error::DsnError::DeserializationError(s)
            }
        }
    }
}

/// Convenience alias for broker operations.
pub type BrokerResult<T> = Result<T, BrokerError>;
