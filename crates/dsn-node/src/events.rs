//! Typed events the node/synchronizer facade raises as it processes
//! channel traffic and drives join/reconnect/offline transitions.

use dsn_types::semantic_object::ObjectPayload;

/// An event raised by [`crate::node::Node`].
#[derive(Debug, Clone)]
pub enum NodeEvent {
    /// A bare object arrived from a peer (outside the proposal/vote flow).
    ObjectReceived {
        /// The sending peer's id.
        peer_id: String,
        /// The received object.
        object: ObjectPayload,
    },
    /// This node cast a vote on a proposal it received.
    ProposalVoted {
        /// The proposal voted on.
        proposal_id: String,
        /// The voting node's id (this node, when it's the one voting).
        node_id: String,
        /// Whether the vote agreed with the proposal.
        agree: bool,
    },
    /// A proposal reached quorum and was accepted into the GMF.
    ProposalAccepted {
        /// The accepted proposal's id.
        proposal_id: String,
    },
    /// A proposal reached quorum but was rejected.
    ProposalRejected {
        /// The rejected proposal's id.
        proposal_id: String,
        /// Which check failed, or why redundancy fell short.
        reason: String,
    },
    /// A join/resync snapshot pull began.
    SyncStarted,
    /// A join completed: the snapshot was applied and the node is online.
    SyncComplete,
    /// A reconnect-driven resync began.
    ResyncStarted,
    /// A reconnect-driven resync completed, including pending-proposal
    /// replay.
    ResyncComplete {
        /// Number of pending proposals re-broadcast during replay.
        replayed_count: usize,
    },
    /// The node dropped offline (deliberately or via a detected failure).
    Offline,
}

impl NodeEvent {
    /// A short tag naming this event's variant, for logging and metrics
    /// labels.
    pub fn kind(&self) -> &'static str {
        match self {
            NodeEvent::ObjectReceived { .. } => "object_received",
            NodeEvent::ProposalVoted { .. } => "proposal_voted",
            NodeEvent::ProposalAccepted { .. } => "proposal_accepted",
            NodeEvent::ProposalRejected { .. } => "proposal_rejected",
            NodeEvent::SyncStarted => "sync_started",
            NodeEvent::SyncComplete => "sync_complete",
            NodeEvent::ResyncStarted => "resync_started",
            NodeEvent::ResyncComplete { .. } => "resync_complete",
            NodeEvent::Offline => "offline",
        }
    }
}
