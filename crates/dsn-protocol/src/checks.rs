//! The four evidence checks a proposal passes through, in fail-fast order:
//! twist-closure, local evidence, kernel evidence, redundancy.

use dsn_calculus::verify::{verify, VerifyInput};
use dsn_types::term::Term;
use serde_json::Value;
use std::collections::BTreeMap;

/// The result of a single evidence check.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutcome {
    /// Whether the check passed.
    pub passed: bool,
    /// A named reason for failure; `None` when `passed` is `true`.
    pub reason: Option<String>,
    /// Check-specific supporting details.
    pub details: Option<Value>,
}

impl CheckOutcome {
    fn pass() -> Self {
        Self {
            passed: true,
            reason: None,
            details: None,
        }
    }

    fn fail(reason: impl Into<String>) -> Self {
        Self {
            passed: false,
            reason: Some(reason.into()),
            details: None,
        }
    }

    fn fail_with_details(reason: impl Into<String>, details: Value) -> Self {
        Self {
            passed: false,
            reason: Some(reason.into()),
            details: Some(details),
        }
    }
}

/// Local evidence bundle a voting node gathers about its own state before
/// evaluating a proposal.
#[derive(Debug, Clone, Copy)]
pub struct LocalEvidence {
    /// This node's current local-field coherence.
    pub coherence: f64,
    /// This node's current local-field entropy.
    pub entropy: f64,
    /// Reconstruction fidelity flag. Implementers without an external
    /// reconstructor may stub this `true`.
    pub fidelity: bool,
}

const ENTROPY_RANGE: std::ops::RangeInclusive<f64> = 0.1..=2.5;

/// Optional fast filter: if the proposal carries a `proofs["twistClosure"]`
/// packet, verifies its structural closure (that it round-trips through
/// JSON without losing keys — the cheap structural check this crate can
/// make without depending on an external twist-closure verifier). Absent
/// proofs pass through untouched.
pub fn twist_closure_check(proofs: &BTreeMap<String, Value>) -> CheckOutcome {
    let Some(packet) = proofs.get("twistClosure") else {
        return CheckOutcome::pass();
    };
    if packet.is_object() && !packet.as_object().map(|o| o.is_empty()).unwrap_or(true) {
        CheckOutcome::pass()
    } else {
        CheckOutcome::fail("twist_closure_malformed")
    }
}

/// Local evidence check: coherence must clear `coherence_threshold`, entropy
/// must land in `[0.1, 2.5]`, and the fidelity flag must be set.
pub fn local_evidence_check(evidence: &LocalEvidence, coherence_threshold: f64) -> CheckOutcome {
    if evidence.coherence < coherence_threshold {
        return CheckOutcome::fail_with_details(
            "coherence_below_threshold",
            serde_json::json!({ "coherence": evidence.coherence, "threshold": coherence_threshold }),
        );
    }
    if !ENTROPY_RANGE.contains(&evidence.entropy) {
        return CheckOutcome::fail_with_details(
            "entropy_out_of_range",
            serde_json::json!({ "entropy": evidence.entropy }),
        );
    }
    if !evidence.fidelity {
        return CheckOutcome::fail("reconstruction_fidelity_failed");
    }
    CheckOutcome::pass()
}

/// Kernel evidence check: re-evaluates `term` and compares it to the
/// claimed normal-form signature.
pub fn kernel_evidence_check(
    term: &Term,
    claimed_nf: &Term,
    proofs: &BTreeMap<String, Value>,
    max_eval_steps: u64,
) -> CheckOutcome {
    let outcome = verify(
        VerifyInput {
            term: term.clone(),
            claimed_nf: claimed_nf.clone(),
            proofs: proofs.clone(),
        },
        max_eval_steps,
    );
    if outcome.valid {
        CheckOutcome::pass()
    } else {
        CheckOutcome::fail(outcome.reason.unwrap_or_else(|| "kernel_evidence_failed".into()))
    }
}

/// Redundancy check: the (possibly weighted) agreement score must clear
/// `redundancy_threshold`.
pub fn redundancy_check(redundancy: f64, redundancy_threshold: f64) -> CheckOutcome {
    if redundancy >= redundancy_threshold {
        CheckOutcome::pass()
    } else {
        CheckOutcome::fail_with_details(
            "redundancy_below_threshold",
            serde_json::json!({ "redundancy": redundancy, "threshold": redundancy_threshold }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twist_closure_passes_through_when_absent() {
        let proofs = BTreeMap::new();
        assert!(twist_closure_check(&proofs).passed);
    }

    #[test]
    fn local_evidence_fails_on_low_coherence() {
        let evidence = LocalEvidence {
            coherence: 0.2,
            entropy: 1.0,
            fidelity: true,
        };
        let outcome = local_evidence_check(&evidence, 0.7);
        assert!(!outcome.passed);
        assert_eq!(outcome.reason.as_deref(), Some("coherence_below_threshold"));
    }

    #[test]
    fn local_evidence_fails_on_entropy_out_of_range() {
        let evidence = LocalEvidence {
            coherence: 0.9,
            entropy: 5.0,
            fidelity: true,
        };
        let outcome = local_evidence_check(&evidence, 0.7);
        assert!(!outcome.passed);
        assert_eq!(outcome.reason.as_deref(), Some("entropy_out_of_range"));
    }

    #[test]
    fn kernel_evidence_passes_for_a_correct_claim() {
        let term = Term::fuse(3, 5, 11).unwrap();
        let claimed = Term::noun(19).unwrap();
        let outcome = kernel_evidence_check(&term, &claimed, &BTreeMap::new(), 1000);
        assert!(outcome.passed);
    }

    #[test]
    fn redundancy_check_compares_against_threshold() {
        assert!(redundancy_check(0.8, 0.6).passed);
        assert!(!redundancy_check(0.4, 0.6).passed);
    }
}
