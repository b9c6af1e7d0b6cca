//! Normal-form agreement checking and the two-stage proposal verifier.

use crate::evaluator::{evaluate, DEFAULT_MAX_EVAL_STEPS};
use dsn_types::term::Term;
use serde_json::Value;
use std::collections::BTreeMap;

/// The result of comparing a claimed normal form against a freshly
/// recomputed one.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalFormCheck {
    /// Whether the claimed and computed signatures matched character for
    /// character.
    pub valid: bool,
    /// The signature this node actually computed.
    pub computed: String,
    /// The signature the proposer claimed.
    pub claimed: String,
}

/// Recomputes `term`'s normal form and compares its signature against
/// `claimed`'s, character for character.
pub fn verify_normal_form(term: &Term, claimed: &Term, max_steps: u64) -> NormalFormCheck {
    let computed_term = evaluate(term, max_steps);
    let computed = computed_term.signature();
    let claimed_sig = claimed.signature();
    NormalFormCheck {
        valid: computed == claimed_sig,
        computed,
        claimed: claimed_sig,
    }
}

/// The input to [`verify`]: a proposed term, its claimed normal form, and
/// any supporting proofs (opaque to the kernel; carried through for callers
/// that implement twist-closure or other fast filters above this crate).
#[derive(Debug, Clone)]
pub struct VerifyInput {
    /// The proposed term.
    pub term: Term,
    /// The normal form the proposer claims for `term`.
    pub claimed_nf: Term,
    /// Supporting proofs, unexamined by this crate.
    pub proofs: BTreeMap<String, Value>,
}

/// The outcome of [`verify`].
#[derive(Debug, Clone, PartialEq)]
pub struct VerifyOutcome {
    /// Whether both verification stages passed.
    pub valid: bool,
    /// A named reason for failure; `None` when `valid` is `true`.
    pub reason: Option<String>,
}

/// Two-stage verification of a proposed term against its claimed normal
/// form: well-formedness, then normal-form agreement.
///
/// Well-formedness is re-checked by round-tripping the term through its
/// wire JSON form, re-running every constructor's validation against a
/// freshly rebuilt copy — the same defense the specification describes as
/// "constructors re-applied by deep clone", adapted to a language where a
/// `Term` is already guaranteed well-formed by construction.
pub fn verify(input: VerifyInput, max_steps: u64) -> VerifyOutcome {
    let rebuilt = Term::from_wire_json(&input.term.to_wire_json());
    if let Err(e) = rebuilt {
        return VerifyOutcome {
            valid: false,
            reason: Some(format!("ill_formed_term: {e}")),
        };
    }

    let nf_check = verify_normal_form(&input.term, &input.claimed_nf, max_steps);
    if !nf_check.valid {
        return VerifyOutcome {
            valid: false,
            reason: Some(format!(
                "normal_form_mismatch: claimed {}, computed {}",
                nf_check.claimed, nf_check.computed
            )),
        };
    }

    let _ = input.proofs;
    VerifyOutcome {
        valid: true,
        reason: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_fusion_verifies() {
        let term = Term::fuse(3, 5, 11).unwrap();
        let claimed = Term::noun(19).unwrap();
        let outcome = verify(
            VerifyInput {
                term,
                claimed_nf: claimed,
                proofs: BTreeMap::new(),
            },
            DEFAULT_MAX_EVAL_STEPS,
        );
        assert!(outcome.valid);
        assert!(outcome.reason.is_none());
    }

    #[test]
    fn mismatched_claim_fails_with_a_named_reason() {
        let term = Term::fuse(3, 5, 11).unwrap();
        let claimed = Term::noun(23).unwrap();
        let outcome = verify(
            VerifyInput {
                term,
                claimed_nf: claimed,
                proofs: BTreeMap::new(),
            },
            DEFAULT_MAX_EVAL_STEPS,
        );
        assert!(!outcome.valid);
        assert!(outcome.reason.unwrap().starts_with("normal_form_mismatch"));
    }

    #[test]
    fn verify_normal_form_reports_both_signatures() {
        let term = Term::chain(vec![3, 5], 7).unwrap();
        let claimed = Term::chain(vec![3, 5], 7).unwrap();
        let check = verify_normal_form(&term, &claimed, DEFAULT_MAX_EVAL_STEPS);
        assert!(check.valid);
        assert_eq!(check.computed, check.claimed);
    }
}
