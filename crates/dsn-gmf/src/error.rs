//! The GMF error type.

use thiserror::Error;

/// Errors raised by [`crate::store::Gmf`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GmfError {
    /// `updateWeight` targeted an id with no entry.
    #[error("no GMF entry with id {0}")]
    NotFound(String),
}

/// Convenience alias for GMF operations.
pub type GmfResult<T> = Result<T, GmfError>;
