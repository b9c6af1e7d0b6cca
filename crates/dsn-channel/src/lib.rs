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

//! # DSN Channel
//!
//! The PRRC (Prime-Resonant Resonance Channel) peer multiplexer: a
//! transport-agnostic peer registry with a one-shot idempotent handshake,
//! typed message dispatch, best-effort broadcast, and expertise-based
//! routing.

/// The `PrrcChannel` peer multiplexer.
pub mod channel;
/// The channel error type.
pub mod error;
/// Typed channel events.
pub mod events;
/// The per-peer registry entry.
pub mod peer;
/// Expertise-based proposal routing.
pub mod routing;

pub use channel::{ChannelIdentity, PrrcChannel};
pub use error::{ChannelError, ChannelResult};
pub use events::ChannelEvent;
pub use peer::PeerEntry;
