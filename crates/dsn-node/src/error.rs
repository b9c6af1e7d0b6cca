//! The node-facade error type.

use thiserror::Error;

/// Errors raised by [`crate::node::Node`].
#[derive(Debug, Error)]
pub enum NodeError {
    /// The channel rejected an operation.
    #[error("channel error: {0}")]
    Channel(#[from] dsn_channel::ChannelError),
    /// The GMF rejected an operation.
    #[error("gmf error: {0}")]
    Gmf(#[from] dsn_gmf::GmfError),
    /// No peer is known to source a join/resync snapshot from.
    #[error("no peer available to join through")]
    NoJoinPeer,
    /// A referenced proposal isn't in this node's proposal log.
    #[error("unknown proposal: {0}")]
    UnknownProposal(String),
}

/// Convenience alias for node operations.
pub type NodeResult<T> = Result<T, NodeError>;
