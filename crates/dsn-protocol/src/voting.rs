//! Weighted voting: per-voter weight from prime-domain overlap, historical
//! accuracy, and semantic-domain match, folded into a weighted redundancy
//! score.

use dsn_types::expertise::ExpertiseProfile;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// A voter's running accuracy record: how many of its past votes matched
/// the eventual finalized outcome.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccuracyRecord {
    correct: u64,
    total: u64,
}

impl AccuracyRecord {
    /// The Laplace-smoothed accuracy estimate `(correct + 1) / (total + 2)`,
    /// using a `Beta(1, 2)` prior so a brand-new voter starts at `1/2`
    /// rather than an undefined `0/0`.
    pub fn smoothed_accuracy(&self) -> f64 {
        (self.correct as f64 + 1.0) / (self.total as f64 + 2.0)
    }

    fn record(&mut self, was_correct: bool) {
        self.total += 1;
        if was_correct {
            self.correct += 1;
        }
    }
}

/// Tracks every voter's [`AccuracyRecord`] across proposals.
#[derive(Debug, Default)]
pub struct VoteHistory {
    records: RwLock<BTreeMap<String, AccuracyRecord>>,
}

impl VoteHistory {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// The voter's current smoothed accuracy; unseen voters default to the
    /// prior's `0.5`.
    pub fn accuracy_of(&self, node_id: &str) -> f64 {
        #[allow(clippy::unwrap_used)]
        let records = self.records.read().unwrap();
        records
            .get(node_id)
            .map(AccuracyRecord::smoothed_accuracy)
            .unwrap_or(0.5)
    }

    /// Records whether `node_id`'s vote matched the finalized outcome.
    pub fn record_vote_outcome(&self, node_id: &str, was_correct: bool) {
        #[allow(clippy::unwrap_used)]
        let mut records = self.records.write().unwrap();
        records.entry(node_id.to_string()).or_default().record(was_correct);
    }
}

/// Computes a single voter's weight: prime-domain overlap, historical
/// accuracy, and a semantic-domain-match bonus, averaged into `[0, ~1.33]`.
pub fn voter_weight(
    voter_profile: Option<&ExpertiseProfile>,
    proposal_profile: Option<&ExpertiseProfile>,
    historical_accuracy: f64,
) -> f64 {
    let prime_overlap = match (voter_profile, proposal_profile) {
        (Some(v), Some(p)) => v.prime_domain_overlap(p),
        _ => 1.0,
    };
    let domain_bonus = match (voter_profile, proposal_profile) {
        (Some(v), Some(p)) if v.domain_matches(p) => 1.0 / 3.0,
        _ => 0.0,
    };
    (prime_overlap + historical_accuracy) / 2.0 + domain_bonus
}

/// A single weighted ballot.
#[derive(Debug, Clone, Copy)]
pub struct WeightedVote {
    /// Whether this voter agreed with the proposal.
    pub agree: bool,
    /// This voter's computed weight.
    pub weight: f64,
}

/// The weighted redundancy score `Σ(weight · agreeIndicator) / Σ(weight)`.
/// Zero total weight (e.g. no votes) yields `0.0`.
pub fn weighted_redundancy(votes: &[WeightedVote]) -> f64 {
    let total_weight: f64 = votes.iter().map(|v| v.weight).sum();
    if total_weight <= 0.0 {
        return 0.0;
    }
    let agreeing_weight: f64 = votes.iter().filter(|v| v.agree).map(|v| v.weight).sum();
    agreeing_weight / total_weight
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsn_types::field::SemanticDomain;

    #[test]
    fn fresh_voter_starts_at_the_prior_midpoint() {
        let history = VoteHistory::new();
        assert_eq!(history.accuracy_of("node-a"), 0.5);
    }

    #[test]
    fn accuracy_moves_toward_observed_rate() {
        let history = VoteHistory::new();
        for _ in 0..8 {
            history.record_vote_outcome("node-a", true);
        }
        history.record_vote_outcome("node-a", false);
        history.record_vote_outcome("node-a", false);
        // 8 correct of 10, Laplace-smoothed: (8+1)/(10+2) = 0.75
        assert!((history.accuracy_of("node-a") - 0.75).abs() < 1e-9);
    }

    #[test]
    fn weighted_redundancy_with_unanimous_agreement_is_one() {
        let votes = vec![
            WeightedVote { agree: true, weight: 1.0 },
            WeightedVote { agree: true, weight: 2.0 },
        ];
        assert_eq!(weighted_redundancy(&votes), 1.0);
    }

    #[test]
    fn weighted_redundancy_weighs_by_voter_weight() {
        let votes = vec![
            WeightedVote { agree: true, weight: 3.0 },
            WeightedVote { agree: false, weight: 1.0 },
        ];
        assert_eq!(weighted_redundancy(&votes), 0.75);
    }

    #[test]
    fn voter_weight_without_profiles_defaults_to_full_overlap() {
        let w = voter_weight(None, None, 0.5);
        assert_eq!(w, (1.0 + 0.5) / 2.0);
    }

    #[test]
    fn voter_weight_adds_domain_match_bonus() {
        let v = ExpertiseProfile::new(SemanticDomain::Cognitive, vec![3, 5], vec![]);
        let p = ExpertiseProfile::new(SemanticDomain::Cognitive, vec![3, 5], vec![]);
        let w = voter_weight(Some(&v), Some(&p), 1.0);
        assert!((w - (1.0 + 1.0 / 3.0)).abs() < 1e-9);
    }
}
