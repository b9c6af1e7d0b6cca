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

//! # DSN Node
//!
//! The synchronizer and node facade: wires a local field, a Global Memory
//! Field slice, a proposal log, and a PRRC channel together into the
//! submit / vote / finalize / join / reconnect / offline lifecycle, and
//! partitions the shared prime table across a fixed-size network.

/// The node-facade error type.
pub mod error;
/// Typed events the node raises as it processes channel traffic.
pub mod events;
/// The `Node` synchronizer facade.
pub mod node;
/// Prime-domain table generation and partitioning.
pub mod primes;

pub use error::{NodeError, NodeResult};
pub use events::NodeEvent;
pub use node::Node;
