//! The bounded proposal log: an append-only ring buffer of submitted
//! proposals, oldest dropped first once capacity is exceeded.

use chrono::{DateTime, Utc};
use dsn_types::proposal::{Proposal, ProposalStatus};
use std::collections::VecDeque;
use std::sync::RwLock;

/// Default capacity (`proposalLogCap` in the configuration knobs table).
pub const DEFAULT_CAPACITY: usize = 10_000;

/// An append-only, capacity-bounded log of proposals this node has
/// submitted or received. Entries are append-only in submission order;
/// observers must not assume any global proposal order across nodes.
pub struct ProposalLog {
    capacity: usize,
    entries: RwLock<VecDeque<Proposal>>,
}

impl ProposalLog {
    /// Creates an empty log with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates an empty log with an explicit capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            entries: RwLock::new(VecDeque::new()),
        }
    }

    /// Appends `proposal`, dropping the oldest entry first if the log is
    /// already at capacity.
    pub fn append(&self, proposal: Proposal) {
        #[allow(clippy::unwrap_used)]
        let mut entries = self.entries.write().unwrap();
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(proposal);
    }

    /// Looks up a proposal by id.
    pub fn get(&self, id: &str) -> Option<Proposal> {
        #[allow(clippy::unwrap_used)]
        self.entries.read().unwrap().iter().find(|p| p.id == id).cloned()
    }

    /// Replaces an existing proposal in place (e.g. after recording a vote
    /// or finalizing), matched by id. No-op if the id isn't present (it may
    /// have been evicted by capacity pressure).
    pub fn replace(&self, proposal: Proposal) {
        #[allow(clippy::unwrap_used)]
        let mut entries = self.entries.write().unwrap();
        if let Some(slot) = entries.iter_mut().find(|p| p.id == proposal.id) {
            *slot = proposal;
        }
    }

    /// Every proposal still in `Pending` status.
    pub fn pending(&self) -> Vec<Proposal> {
        #[allow(clippy::unwrap_used)]
        self.entries
            .read()
            .unwrap()
            .iter()
            .filter(|p| p.status == ProposalStatus::Pending)
            .cloned()
            .collect()
    }

    /// Every proposal submitted at or after `since`.
    pub fn since(&self, since: DateTime<Utc>) -> Vec<Proposal> {
        #[allow(clippy::unwrap_used)]
        self.entries
            .read()
            .unwrap()
            .iter()
            .filter(|p| p.timestamp >= since)
            .cloned()
            .collect()
    }

    /// Current number of entries held.
    pub fn len(&self) -> usize {
        #[allow(clippy::unwrap_used)]
        self.entries.read().unwrap().len()
    }

    /// Whether the log currently holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ProposalLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsn_types::semantic_object::SemanticObject;
    use dsn_types::term::Term;
    use std::collections::BTreeMap;

    fn sample_proposal() -> Proposal {
        Proposal::new(
            SemanticObject::new(Term::noun(23).unwrap(), BTreeMap::new()),
            BTreeMap::new(),
        )
    }

    #[test]
    fn append_then_get_round_trips() {
        let log = ProposalLog::new();
        let proposal = sample_proposal();
        let id = proposal.id.clone();
        log.append(proposal);
        assert!(log.get(&id).is_some());
    }

    #[test]
    fn drops_oldest_entry_once_over_capacity() {
        let log = ProposalLog::with_capacity(2);
        let first = sample_proposal();
        let first_id = first.id.clone();
        log.append(first);
        log.append(sample_proposal());
        log.append(sample_proposal());
        assert_eq!(log.len(), 2);
        assert!(log.get(&first_id).is_none());
    }

    #[test]
    fn pending_filters_by_status() {
        let log = ProposalLog::new();
        let mut proposal = sample_proposal();
        proposal.status = ProposalStatus::Accepted;
        log.append(proposal);
        log.append(sample_proposal());
        assert_eq!(log.pending().len(), 1);
    }
}
