//! On-wire message envelopes exchanged over a PRRC channel, matching the
//! JSON shapes fixed in the specification's external interfaces section.

use crate::expertise::ExpertiseProfile;
use crate::proposal::Vote;
use crate::semantic_object::{ObjectEnvelope, ObjectPayload};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// The top-level envelope for every message exchanged over a PRRC channel,
/// dispatched by its `type` tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WireMessage {
    /// Sent immediately after a transport connects, advertising phase
    /// alignment and the sender's prime specialization before any
    /// application traffic flows.
    #[serde(rename = "handshake")]
    Handshake {
        /// The sending node's id.
        #[serde(rename = "nodeId")]
        node_id: String,
        /// The PRRC channel this handshake belongs to.
        #[serde(rename = "channelId")]
        channel_id: String,
        /// Primes this node specializes in.
        #[serde(rename = "primeSet")]
        prime_set: Vec<u64>,
        /// The sender's phase reference, used by the receiver to compute
        /// `phaseOffset = peer.phaseReference - self.phaseReference`.
        #[serde(rename = "phaseReference")]
        phase_reference: f64,
        /// When the handshake was sent.
        timestamp: DateTime<Utc>,
        /// The sender's expertise profile, piggybacked on the handshake
        /// envelope per the specification's out-of-band expertise note.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expertise: Option<ExpertiseProfile>,
    },
    /// Broadcasts a bare object, outside of the proposal/vote flow (e.g. for
    /// gossip of already-accepted GMF entries during synchronization).
    #[serde(rename = "object")]
    Object {
        /// The sending node's id.
        #[serde(rename = "nodeId")]
        node_id: String,
        /// The object payload, including its actual computed normal form.
        object: ObjectPayload,
        /// The phase adjustment applied by the sender for this peer.
        #[serde(rename = "phaseAdjustment")]
        phase_adjustment: f64,
        /// Free-form metadata.
        #[serde(default)]
        metadata: BTreeMap<String, Value>,
        /// When the message was sent.
        timestamp: DateTime<Utc>,
    },
    /// Broadcasts a new proposal for peers to evaluate and vote on.
    #[serde(rename = "proposal")]
    Proposal {
        /// The sending node's id.
        #[serde(rename = "nodeId")]
        node_id: String,
        /// The proposed object envelope.
        object: ObjectEnvelope,
        /// Supporting proofs (kernel evidence, twist-closure packets, ...).
        #[serde(default)]
        proofs: BTreeMap<String, Value>,
        /// The proposal's id.
        #[serde(rename = "proposalId")]
        proposal_id: String,
        /// Free-form metadata.
        #[serde(default)]
        metadata: BTreeMap<String, Value>,
        /// When the message was sent.
        timestamp: DateTime<Utc>,
    },
    /// A single node's ballot on a proposal.
    #[serde(rename = "vote")]
    VoteMessage {
        /// Which proposal this vote concerns.
        #[serde(rename = "proposalId")]
        proposal_id: String,
        /// The voting node's id.
        #[serde(rename = "nodeId")]
        node_id: String,
        /// Whether the voter's local evaluation agreed with the proposal.
        agree: bool,
        /// When the vote was sent.
        timestamp: DateTime<Utc>,
    },
    /// A keepalive.
    #[serde(rename = "ping")]
    Ping {
        /// When the ping was sent.
        timestamp: DateTime<Utc>,
    },
}

impl WireMessage {
    /// Builds a `vote` message from a recorded [`Vote`].
    pub fn vote(proposal_id: impl Into<String>, node_id: impl Into<String>, vote: &Vote) -> Self {
        WireMessage::VoteMessage {
            proposal_id: proposal_id.into(),
            node_id: node_id.into(),
            agree: vote.agree,
            timestamp: vote.timestamp,
        }
    }

    /// A short tag naming this message's variant, for logging and metrics
    /// labels without pulling in the full payload.
    pub fn kind(&self) -> &'static str {
        match self {
            WireMessage::Handshake { .. } => "handshake",
            WireMessage::Object { .. } => "object",
            WireMessage::Proposal { .. } => "proposal",
            WireMessage::VoteMessage { .. } => "vote",
            WireMessage::Ping { .. } => "ping",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ping_round_trips_through_json() {
        let msg = WireMessage::Ping {
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"ping\""));
        let back: WireMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind(), "ping");
    }

    #[test]
    fn handshake_round_trips_through_json_without_expertise() {
        let msg = WireMessage::Handshake {
            node_id: "node-a".into(),
            channel_id: "chan-1".into(),
            prime_set: vec![3, 5, 7],
            phase_reference: 0.0,
            timestamp: Utc::now(),
            expertise: None,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(!json.contains("expertise"));
        let back: WireMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind(), "handshake");
    }

    #[test]
    fn vote_message_carries_agreement() {
        let vote = Vote {
            agree: true,
            timestamp: Utc::now(),
        };
        let msg = WireMessage::vote("prop-1", "node-b", &vote);
        let json = serde_json::to_string(&msg).unwrap();
        let back: WireMessage = serde_json::from_str(&json).unwrap();
        match back {
            WireMessage::VoteMessage { agree, .. } => assert!(agree),
            _ => panic!("expected vote message"),
        }
    }
}
