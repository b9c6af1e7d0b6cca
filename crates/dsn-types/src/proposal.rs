//! A `Proposal`: a vote-gated request to insert an object into the GMF.

use crate::semantic_object::SemanticObject;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// The lifecycle state of a [`Proposal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    /// Created locally, awaiting votes.
    Pending,
    /// Finalized with enough agreement to enter the GMF.
    Accepted,
    /// Finalized without enough agreement.
    Rejected,
}

/// A single voter's ballot on a proposal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Vote {
    /// Whether the voter's local evaluation agreed with the proposal.
    pub agree: bool,
    /// When the vote was recorded by the tallying node.
    pub timestamp: DateTime<Utc>,
}

/// A vote-gated request to insert a [`SemanticObject`] into the GMF.
///
/// Proposals are appended to the proposal log on creation, broadcast to
/// peers, and accumulate votes keyed by voter node id (so duplicate votes
/// from the same peer are idempotent — the map simply overwrites).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    /// A randomly generated identifier, distinct from the wrapped object's id.
    pub id: String,
    /// The semantic object this proposal would insert into the GMF.
    pub object: SemanticObject,
    /// Supporting proofs (kernel evidence, twist-closure packets, ...).
    #[serde(default)]
    pub proofs: BTreeMap<String, Value>,
    /// Free-form metadata.
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
    /// When this proposal was created.
    pub timestamp: DateTime<Utc>,
    /// The current lifecycle status.
    pub status: ProposalStatus,
    /// Votes received so far, keyed by voter node id.
    #[serde(default)]
    pub votes: BTreeMap<String, Vote>,
}

impl Proposal {
    /// Creates a new, pending proposal with a random id.
    pub fn new(object: SemanticObject, proofs: BTreeMap<String, Value>) -> Self {
        Self {
            id: format!("prop-{}", uuid::Uuid::new_v4()),
            object,
            proofs,
            metadata: BTreeMap::new(),
            timestamp: Utc::now(),
            status: ProposalStatus::Pending,
            votes: BTreeMap::new(),
        }
    }

    /// Records (or overwrites) a voter's ballot. Idempotent under duplicate
    /// votes from the same node id, since votes are a map.
    pub fn record_vote(&mut self, voter_node_id: impl Into<String>, agree: bool) {
        self.votes.insert(
            voter_node_id.into(),
            Vote {
                agree,
                timestamp: Utc::now(),
            },
        );
    }

    /// The unweighted redundancy score `R = (#agree) / (#votes)`. Zero votes
    /// yields `R = 0`, which always fails the default redundancy threshold.
    pub fn redundancy_score(&self) -> f64 {
        if self.votes.is_empty() {
            return 0.0;
        }
        let agree = self.votes.values().filter(|v| v.agree).count();
        agree as f64 / self.votes.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Term;

    fn sample_object() -> SemanticObject {
        SemanticObject::new(Term::noun(23).unwrap(), BTreeMap::new())
    }

    #[test]
    fn zero_votes_yields_zero_redundancy() {
        let p = Proposal::new(sample_object(), BTreeMap::new());
        assert_eq!(p.redundancy_score(), 0.0);
    }

    #[test]
    fn duplicate_votes_from_same_node_are_idempotent() {
        let mut p = Proposal::new(sample_object(), BTreeMap::new());
        p.record_vote("node-b", true);
        p.record_vote("node-b", true);
        assert_eq!(p.votes.len(), 1);
    }

    #[test]
    fn redundancy_score_reflects_agreement_fraction() {
        let mut p = Proposal::new(sample_object(), BTreeMap::new());
        p.record_vote("node-b", true);
        p.record_vote("node-c", false);
        assert_eq!(p.redundancy_score(), 0.5);
    }
}
