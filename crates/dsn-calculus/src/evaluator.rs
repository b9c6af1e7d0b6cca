//! Term reduction: repeated single-step reduction to normal form.

use dsn_types::term::{Term, TermView};
use tracing::trace;

/// The specification's default evaluator step budget.
pub const DEFAULT_MAX_EVAL_STEPS: u64 = 1000;

/// Reduces `term` to its normal form, applying single-step reduction until
/// a value is reached or `max_steps` reductions have been applied.
///
/// Reduction order: `Fuse` contracts to its prime sum in one step; `Seq` and
/// `Impl` reduce their left operand first, then their right, and the whole
/// expression's value is the right operand's (the left is reduced for its
/// side of the invariant but discarded, mirroring sequential composition).
/// A bare `Adj` is not reducible alone and yields `Undefined`. `Noun`,
/// `Chain`, and `Undefined` are already values.
///
/// Budget exhaustion at any point short-circuits the whole evaluation to
/// `Undefined("max_steps_exceeded")` — this is a value, not an error: the
/// evaluator always terminates with either a value or that sentinel.
pub fn evaluate(term: &Term, max_steps: u64) -> Term {
    let mut steps = 0u64;
    evaluate_inner(term, &mut steps, max_steps)
}

fn evaluate_inner(term: &Term, steps: &mut u64, max_steps: u64) -> Term {
    if *steps >= max_steps {
        return Term::undefined("max_steps_exceeded");
    }
    match term.view() {
        TermView::Noun(_) | TermView::Chain { .. } | TermView::Undefined(_) => term.clone(),
        TermView::Adj(p) => {
            *steps += 1;
            trace!(prime = p, "bare adjective cannot reduce alone");
            Term::undefined("bare_adjective")
        }
        TermView::Fuse(p, q, r) => {
            *steps += 1;
            // `Term::fuse`'s constructor already guarantees p+q+r is prime.
            Term::noun(p + q + r).unwrap_or_else(|e| Term::undefined(e.to_string()))
        }
        TermView::Seq(l, r) => {
            let left = evaluate_inner(l, steps, max_steps);
            if let TermView::Undefined(reason) = left.view() {
                return Term::undefined(reason.to_string());
            }
            evaluate_inner(r, steps, max_steps)
        }
        TermView::Impl(a, c) => {
            let antecedent = evaluate_inner(a, steps, max_steps);
            if let TermView::Undefined(reason) = antecedent.view() {
                return Term::undefined(reason.to_string());
            }
            evaluate_inner(c, steps, max_steps)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fuse_evaluates_to_noun_of_the_sum() {
        let t = Term::fuse(3, 5, 11).unwrap();
        let nf = evaluate(&t, DEFAULT_MAX_EVAL_STEPS);
        assert_eq!(nf.signature(), Term::noun(19).unwrap().signature());
    }

    #[test]
    fn values_evaluate_to_themselves() {
        let noun = Term::noun(23).unwrap();
        assert_eq!(evaluate(&noun, DEFAULT_MAX_EVAL_STEPS).signature(), noun.signature());

        let chain = Term::chain(vec![3, 5], 7).unwrap();
        assert_eq!(
            evaluate(&chain, DEFAULT_MAX_EVAL_STEPS).signature(),
            chain.signature()
        );
    }

    #[test]
    fn bare_adjective_is_undefined() {
        let adj = Term::adj(3).unwrap();
        let nf = evaluate(&adj, DEFAULT_MAX_EVAL_STEPS);
        assert!(matches!(nf.view(), TermView::Undefined(_)));
    }

    #[test]
    fn seq_evaluates_to_its_right_operand() {
        let t = Term::seq(Term::fuse(3, 5, 11).unwrap(), Term::noun(29).unwrap());
        let nf = evaluate(&t, DEFAULT_MAX_EVAL_STEPS);
        assert_eq!(nf.signature(), Term::noun(29).unwrap().signature());
    }

    #[test]
    fn seq_propagates_undefined_from_the_left() {
        let t = Term::seq(Term::adj(3).unwrap(), Term::noun(29).unwrap());
        let nf = evaluate(&t, DEFAULT_MAX_EVAL_STEPS);
        assert!(matches!(nf.view(), TermView::Undefined(_)));
    }

    #[test]
    fn zero_budget_exhausts_immediately_on_a_reducible_term() {
        let t = Term::fuse(3, 5, 11).unwrap();
        let nf = evaluate(&t, 0);
        match nf.view() {
            TermView::Undefined(reason) => assert_eq!(reason, "max_steps_exceeded"),
            other => panic!("expected Undefined, got {other:?}"),
        }
    }

    #[test]
    fn deeply_nested_seq_exhausts_its_budget() {
        let mut t = Term::noun(2).unwrap();
        for _ in 0..10 {
            t = Term::seq(Term::fuse(3, 5, 11).unwrap(), t);
        }
        let nf = evaluate(&t, 3);
        assert!(matches!(nf.view(), TermView::Undefined(_)));
    }
}
