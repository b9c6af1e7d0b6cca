//! Typed events a [`crate::channel::PrrcChannel`] raises as it dispatches
//! inbound traffic.

use dsn_types::proposal::Vote;
use dsn_types::semantic_object::{ObjectEnvelope, ObjectPayload};
use serde_json::Value;
use std::collections::BTreeMap;

/// An event raised by the channel, either from handshake completion or
/// from dispatching a typed inbound message.
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    /// A peer completed its handshake.
    PeerConnected {
        /// The peer's id.
        peer_id: String,
        /// The computed phase offset for this peer.
        phase_offset: f64,
    },
    /// A bare object broadcast arrived.
    Object {
        /// The sending peer's id.
        peer_id: String,
        /// The object payload.
        object: ObjectPayload,
    },
    /// A proposal arrived.
    Proposal {
        /// The sending peer's id.
        peer_id: String,
        /// The proposal's id.
        proposal_id: String,
        /// The proposed object envelope.
        object: ObjectEnvelope,
        /// Supporting proofs carried on the proposal (kernel evidence,
        /// twist-closure packets, ...).
        proofs: BTreeMap<String, Value>,
    },
    /// A vote arrived.
    Vote {
        /// The sending peer's id.
        peer_id: String,
        /// Which proposal this vote concerns.
        proposal_id: String,
        /// The voter's node id (may differ from `peer_id` if relayed).
        node_id: String,
        /// The ballot.
        vote: Vote,
    },
    /// A message failed to parse or dispatch. Non-fatal: the channel keeps
    /// running.
    Error {
        /// The peer the malformed message came from.
        peer_id: String,
        /// A human-readable description of the failure.
        reason: String,
    },
}
