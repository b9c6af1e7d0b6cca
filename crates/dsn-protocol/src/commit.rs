//! The Coherent-Commit evaluation chain: runs the four evidence checks in
//! fail-fast order and reports the first failure, or acceptance.

use crate::checks::{
    kernel_evidence_check, local_evidence_check, redundancy_check, twist_closure_check,
    CheckOutcome, LocalEvidence,
};
use dsn_types::term::Term;
use serde_json::Value;
use std::collections::BTreeMap;

/// Everything [`evaluate`] needs to run the full check chain for one
/// proposal.
#[derive(Debug, Clone)]
pub struct CommitInput {
    /// The proposed term.
    pub term: Term,
    /// The normal form the proposer claims for `term`.
    pub claimed_nf: Term,
    /// Supporting proofs carried on the proposal.
    pub proofs: BTreeMap<String, Value>,
    /// This node's own local evidence bundle.
    pub local_evidence: LocalEvidence,
    /// The (possibly weighted) redundancy score computed from votes so far.
    pub redundancy: f64,
}

/// Tunable thresholds the check chain evaluates against.
#[derive(Debug, Clone, Copy)]
pub struct CommitThresholds {
    /// Minimum local coherence required.
    pub coherence_threshold: f64,
    /// Minimum redundancy score required.
    pub redundancy_threshold: f64,
    /// Step budget for the kernel-evidence re-evaluation.
    pub max_eval_steps: u64,
}

/// The final outcome of the Coherent-Commit check chain: each check
/// returns `{passed, reason?, details?}`, and the first failing check
/// determines the outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitOutcome {
    /// Whether the proposal cleared every check.
    pub accepted: bool,
    /// Which check failed first, if any (`"twist_closure"`,
    /// `"local_evidence"`, `"kernel_evidence"`, or `"redundancy"`).
    pub failed_check: Option<&'static str>,
    /// That check's outcome.
    pub outcome: CheckOutcome,
}

/// Runs the fail-fast check chain: twist-closure, local evidence, kernel
/// evidence, redundancy.
pub fn evaluate(input: &CommitInput, thresholds: &CommitThresholds) -> CommitOutcome {
    let twist = twist_closure_check(&input.proofs);
    if !twist.passed {
        return CommitOutcome {
            accepted: false,
            failed_check: Some("twist_closure"),
            outcome: twist,
        };
    }

    let local = local_evidence_check(&input.local_evidence, thresholds.coherence_threshold);
    if !local.passed {
        return CommitOutcome {
            accepted: false,
            failed_check: Some("local_evidence"),
            outcome: local,
        };
    }

    let kernel = kernel_evidence_check(
        &input.term,
        &input.claimed_nf,
        &input.proofs,
        thresholds.max_eval_steps,
    );
    if !kernel.passed {
        return CommitOutcome {
            accepted: false,
            failed_check: Some("kernel_evidence"),
            outcome: kernel,
        };
    }

    let redundancy = redundancy_check(input.redundancy, thresholds.redundancy_threshold);
    if !redundancy.passed {
        return CommitOutcome {
            accepted: false,
            failed_check: Some("redundancy"),
            outcome: redundancy,
        };
    }

    CommitOutcome {
        accepted: true,
        failed_check: None,
        outcome: CheckOutcome {
            passed: true,
            reason: None,
            details: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn healthy_local_evidence() -> LocalEvidence {
        LocalEvidence {
            coherence: 0.9,
            entropy: 1.0,
            fidelity: true,
        }
    }

    fn default_thresholds() -> CommitThresholds {
        CommitThresholds {
            coherence_threshold: 0.7,
            redundancy_threshold: 0.6,
            max_eval_steps: 1000,
        }
    }

    #[test]
    fn accepts_a_fully_valid_proposal() {
        let term = Term::fuse(3, 5, 11).unwrap();
        let claimed_nf = Term::noun(19).unwrap();
        let input = CommitInput {
            term,
            claimed_nf,
            proofs: BTreeMap::new(),
            local_evidence: healthy_local_evidence(),
            redundancy: 0.8,
        };
        let outcome = evaluate(&input, &default_thresholds());
        assert!(outcome.accepted);
        assert!(outcome.failed_check.is_none());
    }

    #[test]
    fn fails_fast_on_local_evidence_before_checking_redundancy() {
        let term = Term::fuse(3, 5, 11).unwrap();
        let claimed_nf = Term::noun(19).unwrap();
        let input = CommitInput {
            term,
            claimed_nf,
            proofs: BTreeMap::new(),
            local_evidence: LocalEvidence {
                coherence: 0.1,
                entropy: 1.0,
                fidelity: true,
            },
            redundancy: 0.0,
        };
        let outcome = evaluate(&input, &default_thresholds());
        assert!(!outcome.accepted);
        assert_eq!(outcome.failed_check, Some("local_evidence"));
    }

    #[test]
    fn fails_on_kernel_evidence_mismatch() {
        let term = Term::fuse(3, 5, 11).unwrap();
        let claimed_nf = Term::noun(23).unwrap();
        let input = CommitInput {
            term,
            claimed_nf,
            proofs: BTreeMap::new(),
            local_evidence: healthy_local_evidence(),
            redundancy: 0.8,
        };
        let outcome = evaluate(&input, &default_thresholds());
        assert!(!outcome.accepted);
        assert_eq!(outcome.failed_check, Some("kernel_evidence"));
    }

    #[test]
    fn fails_on_insufficient_redundancy() {
        let term = Term::fuse(3, 5, 11).unwrap();
        let claimed_nf = Term::noun(19).unwrap();
        let input = CommitInput {
            term,
            claimed_nf,
            proofs: BTreeMap::new(),
            local_evidence: healthy_local_evidence(),
            redundancy: 0.1,
        };
        let outcome = evaluate(&input, &default_thresholds());
        assert!(!outcome.accepted);
        assert_eq!(outcome.failed_check, Some("redundancy"));
    }
}
