//! The Prime Calculus term algebra.
//!
//! A [`Term`] is a tagged variant over primes and compounds of primes. Every
//! constructor validates its invariants eagerly, so a `Term` that exists is
//! guaranteed well-formed by construction; the evaluator (`dsn-calculus`)
//! never has to re-check them. Determinism across nodes depends entirely on
//! this being a total, side-effect-free function of the input bytes: no
//! locale, no floating point, no environment state.

use crate::error::TermError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};

/// Returns `true` if `n` is prime, by trial division.
///
/// Terms only ever carry small primes (wire messages bound them well below
/// `u32::MAX` in practice), so trial division is both simple and fast enough.
pub fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    if n % 2 == 0 {
        return n == 2;
    }
    let mut d = 3u64;
    while d.saturating_mul(d) <= n {
        if n % d == 0 {
            return false;
        }
        d += 2;
    }
    true
}

/// A Prime Calculus term.
///
/// Internal representation is hidden: the only way to build one is through
/// the smart constructors below, and the only way to inspect one is through
/// [`Term::view`]. This keeps "ill-formed by construction" impossible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term(TermRepr);

#[derive(Debug, Clone, PartialEq, Eq)]
enum TermRepr {
    Noun(u64),
    Adj(u64),
    Chain { adjs: Vec<u64>, noun: u64 },
    Fuse(u64, u64, u64),
    Seq(Box<Term>, Box<Term>),
    Impl(Box<Term>, Box<Term>),
    Undefined(String),
}

/// A borrowed, pattern-matchable view into a [`Term`]'s shape.
#[derive(Debug, Clone, Copy)]
pub enum TermView<'a> {
    /// A bare prime value.
    Noun(u64),
    /// A bare adjective; reducible alone, an error to evaluate standalone.
    Adj(u64),
    /// A value: strictly increasing adjective primes followed by a noun prime.
    Chain {
        /// Adjective primes, strictly increasing, all less than `noun`.
        adjs: &'a [u64],
        /// The noun prime terminating the chain.
        noun: u64,
    },
    /// Three distinct odd primes whose sum is itself prime.
    Fuse(u64, u64, u64),
    /// Sequential composition; reduces its left operand, then its right.
    Seq(&'a Term, &'a Term),
    /// Implication; reduces its antecedent, then its consequent.
    Impl(&'a Term, &'a Term),
    /// A terminal failure sentinel carrying a reason.
    Undefined(&'a str),
}

impl Term {
    /// Builds `Noun(p)`. Fails unless `p` is prime.
    pub fn noun(p: u64) -> Result<Self, TermError> {
        if !is_prime(p) {
            return Err(TermError::IllFormed(format!("{p} is not prime for Noun")));
        }
        Ok(Term(TermRepr::Noun(p)))
    }

    /// Builds `Adj(p)`. Fails unless `p` is prime. A bare adjective is a
    /// well-formed term but an evaluation error (it can't reduce alone).
    pub fn adj(p: u64) -> Result<Self, TermError> {
        if !is_prime(p) {
            return Err(TermError::IllFormed(format!("{p} is not prime for Adj")));
        }
        Ok(Term(TermRepr::Adj(p)))
    }

    /// Builds `Chain(adjs, noun)`. Fails unless every prime listed is prime,
    /// the adjective list is strictly increasing, and every adjective is
    /// strictly less than `noun`.
    pub fn chain(adjs: Vec<u64>, noun: u64) -> Result<Self, TermError> {
        if !is_prime(noun) {
            return Err(TermError::IllFormed(format!(
                "{noun} is not prime for Chain noun"
            )));
        }
        for &p in &adjs {
            if !is_prime(p) {
                return Err(TermError::IllFormed(format!(
                    "{p} is not prime in Chain adjs"
                )));
            }
        }
        for w in adjs.windows(2) {
            if w[0] >= w[1] {
                return Err(TermError::IllFormed(format!(
                    "Chain adjs must be strictly increasing: {} >= {}",
                    w[0], w[1]
                )));
            }
        }
        if let Some(&last) = adjs.last() {
            if last >= noun {
                return Err(TermError::IllFormed(format!(
                    "Chain noun {noun} must exceed every adjective, got {last}"
                )));
            }
        }
        Ok(Term(TermRepr::Chain { adjs, noun }))
    }

    /// Builds `Fuse(p, q, r)`. Fails unless `p`, `q`, `r` are distinct odd
    /// primes whose sum is itself prime.
    pub fn fuse(p: u64, q: u64, r: u64) -> Result<Self, TermError> {
        for x in [p, q, r] {
            if x == 2 || !is_prime(x) {
                return Err(TermError::IllFormed(format!(
                    "{x} must be an odd prime for Fuse"
                )));
            }
        }
        if p == q || q == r || p == r {
            return Err(TermError::IllFormed(
                "Fuse requires three distinct primes".into(),
            ));
        }
        let sum = p + q + r;
        if !is_prime(sum) {
            return Err(TermError::IllFormed(format!(
                "Fuse({p},{q},{r}) sum {sum} is not prime"
            )));
        }
        Ok(Term(TermRepr::Fuse(p, q, r)))
    }

    /// Builds `Seq(left, right)`.
    pub fn seq(left: Term, right: Term) -> Self {
        Term(TermRepr::Seq(Box::new(left), Box::new(right)))
    }

    /// Builds `Impl(antecedent, consequent)`.
    pub fn implication(antecedent: Term, consequent: Term) -> Self {
        Term(TermRepr::Impl(Box::new(antecedent), Box::new(consequent)))
    }

    /// Builds the terminal failure sentinel `Undefined(reason)`.
    pub fn undefined(reason: impl Into<String>) -> Self {
        Term(TermRepr::Undefined(reason.into()))
    }

    /// Returns a borrowed, matchable view of this term's shape.
    pub fn view(&self) -> TermView<'_> {
        match &self.0 {
            TermRepr::Noun(p) => TermView::Noun(*p),
            TermRepr::Adj(p) => TermView::Adj(*p),
            TermRepr::Chain { adjs, noun } => TermView::Chain {
                adjs,
                noun: *noun,
            },
            TermRepr::Fuse(p, q, r) => TermView::Fuse(*p, *q, *r),
            TermRepr::Seq(l, r) => TermView::Seq(l, r),
            TermRepr::Impl(a, c) => TermView::Impl(a, c),
            TermRepr::Undefined(reason) => TermView::Undefined(reason),
        }
    }

    /// A term is a *value* (irreducible) if it is a `Noun`, a `Chain`, or
    /// `Undefined`. `Adj`, `Fuse`, `Seq`, and `Impl` all reduce further (or
    /// are errors to evaluate standalone).
    pub fn is_value(&self) -> bool {
        matches!(
            self.view(),
            TermView::Noun(_) | TermView::Chain { .. } | TermView::Undefined(_)
        )
    }

    /// The deterministic string signature used for identity, comparison, and
    /// the content-addressed hash. Two terms are semantically identical iff
    /// their signatures are character-for-character equal.
    pub fn signature(&self) -> String {
        match self.view() {
            TermView::Noun(p) => format!("N{p}"),
            TermView::Adj(p) => format!("A{p}"),
            TermView::Chain { adjs, noun } => {
                let joined = adjs
                    .iter()
                    .map(u64::to_string)
                    .collect::<Vec<_>>()
                    .join(",");
                format!("C[{joined}]{noun}")
            }
            TermView::Fuse(p, q, r) => format!("F({p},{q},{r})"),
            TermView::Seq(l, r) => format!("S({},{})", l.signature(), r.signature()),
            TermView::Impl(a, c) => format!("I({},{})", a.signature(), c.signature()),
            TermView::Undefined(reason) => format!("U({reason})"),
        }
    }

    /// The semantic hash of a `Chain`: the product of its adjective primes
    /// times the noun prime. `None` for any other term shape.
    pub fn semantic_hash(&self) -> Option<u128> {
        match self.view() {
            TermView::Chain { adjs, noun } => {
                let mut product: u128 = noun as u128;
                for p in adjs {
                    product = product.saturating_mul(*p as u128);
                }
                Some(product)
            }
            _ => None,
        }
    }

    /// Serializes this term to its wire JSON form (§6 of the specification).
    pub fn to_wire_json(&self) -> Value {
        match self.view() {
            TermView::Noun(prime) => json!({"type": "noun", "prime": prime}),
            TermView::Adj(prime) => json!({"type": "adj", "prime": prime}),
            TermView::Chain { adjs, noun } => json!({
                "type": "chain",
                "adjPrimes": adjs,
                "nounPrime": noun,
                "hash": self.semantic_hash(),
            }),
            TermView::Fuse(p, q, r) => json!({
                "type": "fuse", "p": p, "q": q, "r": r, "fusedPrime": p + q + r,
            }),
            TermView::Seq(l, r) => json!({
                "type": "seq", "left": l.to_wire_json(), "right": r.to_wire_json(),
            }),
            TermView::Impl(a, c) => json!({
                "type": "impl",
                "antecedent": a.to_wire_json(),
                "consequent": c.to_wire_json(),
            }),
            TermView::Undefined(reason) => json!({"type": "undefined", "reason": reason}),
        }
    }

    /// Parses a term from its wire JSON form, re-running every constructor's
    /// validation so a deserialized term carries the same guarantees as one
    /// built in-process.
    pub fn from_wire_json(value: &Value) -> Result<Self, TermError> {
        let obj = value
            .as_object()
            .ok_or_else(|| TermError::IllFormed("term must be a JSON object".into()))?;
        let ty = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| TermError::IllFormed("term missing \"type\"".into()))?;
        let as_u64 = |key: &str| -> Result<u64, TermError> {
            obj.get(key)
                .and_then(Value::as_u64)
                .ok_or_else(|| TermError::IllFormed(format!("term missing numeric \"{key}\"")))
        };
        match ty {
            "noun" => Term::noun(as_u64("prime")?),
            "adj" => Term::adj(as_u64("prime")?),
            "chain" => {
                let adjs = obj
                    .get("adjPrimes")
                    .and_then(Value::as_array)
                    .ok_or_else(|| TermError::IllFormed("chain missing adjPrimes".into()))?
                    .iter()
                    .map(|v| {
                        v.as_u64()
                            .ok_or_else(|| TermError::IllFormed("adjPrimes entry not a u64".into()))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Term::chain(adjs, as_u64("nounPrime")?)
            }
            "fuse" => Term::fuse(as_u64("p")?, as_u64("q")?, as_u64("r")?),
            "seq" => {
                let left = Term::from_wire_json(
                    obj.get("left")
                        .ok_or_else(|| TermError::IllFormed("seq missing left".into()))?,
                )?;
                let right = Term::from_wire_json(
                    obj.get("right")
                        .ok_or_else(|| TermError::IllFormed("seq missing right".into()))?,
                )?;
                Ok(Term::seq(left, right))
            }
            "impl" => {
                let antecedent = Term::from_wire_json(
                    obj.get("antecedent")
                        .ok_or_else(|| TermError::IllFormed("impl missing antecedent".into()))?,
                )?;
                let consequent = Term::from_wire_json(
                    obj.get("consequent")
                        .ok_or_else(|| TermError::IllFormed("impl missing consequent".into()))?,
                )?;
                Ok(Term::implication(antecedent, consequent))
            }
            "undefined" => {
                let reason = obj
                    .get("reason")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string();
                Ok(Term::undefined(reason))
            }
            other => Err(TermError::IllFormed(format!("unknown term type {other}"))),
        }
    }

    /// Given a target prime `p`, returns the smallest-lexicographic
    /// `(p, q, r)` with `p <= q <= r`, all prime, summing to the target.
    /// Returns `None` if no such triad exists.
    pub fn canonical_fusion_for(target: u64) -> Option<(u64, u64, u64)> {
        if target < 7 {
            return None;
        }
        let mut primes = Vec::new();
        for n in 3..target {
            if is_prime(n) {
                primes.push(n);
            }
        }
        for (i, &p) in primes.iter().enumerate() {
            for &q in primes.iter().skip(i + 1) {
                if p + q >= target {
                    break;
                }
                let r = target - p - q;
                if r <= q {
                    continue;
                }
                if is_prime(r) {
                    return Some((p, q, r));
                }
            }
        }
        None
    }

    /// Reorders three primes non-decreasing and reports whether they form a
    /// canonical fuse triad (sum is prime). Returns the reordered triad
    /// regardless, so callers can compare canonical forms under permutation.
    pub fn canonical_triad(p: u64, q: u64, r: u64) -> (u64, u64, u64) {
        let mut v = [p, q, r];
        v.sort_unstable();
        (v[0], v[1], v[2])
    }
}

impl Serialize for Term {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_wire_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Term {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Term::from_wire_json(&value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fuse_reorders_and_validates() {
        assert!(Term::fuse(3, 5, 11).is_ok());
        assert!(Term::fuse(2, 5, 11).is_err(), "2 is even, must be rejected");
        assert!(Term::fuse(3, 3, 11).is_err(), "primes must be distinct");
    }

    #[test]
    fn chain_enforces_strict_ordering() {
        assert!(Term::chain(vec![5, 3], 7).is_err());
        assert!(Term::chain(vec![3, 5], 7).is_ok());
        assert!(Term::chain(vec![3], 2).is_err(), "noun must exceed every adj");
        assert!(Term::chain(vec![2], 3).is_ok(), "2 is a valid adj prime");
    }

    #[test]
    fn signature_is_stable_under_rebuild() {
        let a = Term::chain(vec![3, 5], 7).unwrap();
        let b = Term::chain(vec![3, 5], 7).unwrap();
        assert_eq!(a.signature(), b.signature());
    }

    #[test]
    fn wire_json_round_trips() {
        let t = Term::fuse(3, 5, 11).unwrap();
        let json = t.to_wire_json();
        let back = Term::from_wire_json(&json).unwrap();
        assert_eq!(t.signature(), back.signature());
    }

    #[test]
    fn canonical_fusion_is_smallest_lexicographic() {
        let (p, q, r) = Term::canonical_fusion_for(19).unwrap();
        assert!(p <= q && q <= r);
        assert_eq!(p + q + r, 19);
        assert_eq!((p, q, r), (3, 5, 11));
    }

    #[test]
    fn semantic_hash_is_product_of_primes() {
        let t = Term::chain(vec![3, 5], 7).unwrap();
        assert_eq!(t.semantic_hash(), Some(3 * 5 * 7));
    }
}
