//! Local error types for the `dsn-crypto` crate.

use thiserror::Error;

/// Errors from hashing or encoding operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The input could not be hex-decoded.
    #[error("invalid hex input: {0}")]
    InvalidHex(String),
}
