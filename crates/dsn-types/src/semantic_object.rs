//! `SemanticObject`: a term plus stable identity and metadata — the
//! wire-unit of content for the rest of the network.

use crate::term::Term;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A term wrapped with a stable, content-derived identity.
///
/// Normal form is intentionally *not* stored here: it's recomputed on
/// demand by the evaluator so a stale or tampered cached value can never be
/// mistaken for ground truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticObject {
    /// Deterministic hash of the term's signature; identical on every node
    /// that holds the same term.
    pub id: String,
    /// The term this object wraps.
    pub term: Term,
    /// Free-form, application-supplied metadata.
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
    /// When this object was created, as observed by its origin node.
    pub timestamp: DateTime<Utc>,
}

impl SemanticObject {
    /// Wraps `term` into a new `SemanticObject`, deriving its id from the
    /// term's signature via the network-wide semantic id hash.
    pub fn new(term: Term, metadata: BTreeMap<String, Value>) -> Self {
        let id = dsn_crypto::semantic_id_hash(&term.signature());
        Self {
            id,
            term,
            metadata,
            timestamp: Utc::now(),
        }
    }

    /// Recomputes the id from the wrapped term; same term on two nodes
    /// always yields the same id, regardless of when or where it was built.
    pub fn recompute_id(&self) -> String {
        dsn_crypto::semantic_id_hash(&self.term.signature())
    }

    /// Builds the on-wire proposal envelope: `{id, term, claimedNF,
    /// signature, timestamp, metadata}`. The caller supplies the claimed
    /// normal form, since computing it is the evaluator's job (`dsn-calculus`
    /// sits above this crate in the dependency graph).
    pub fn to_proposal_envelope(&self, claimed_nf: &Term) -> ObjectEnvelope {
        ObjectEnvelope {
            id: self.id.clone(),
            term: self.term.clone(),
            claimed_nf: claimed_nf.clone(),
            signature: self.term.signature(),
            timestamp: self.timestamp,
            metadata: self.metadata.clone(),
        }
    }
}

/// The on-wire envelope produced by [`SemanticObject::to_proposal_envelope`],
/// carried as the `object` field of a `proposal` wire message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectEnvelope {
    /// The object's stable id.
    pub id: String,
    /// The wrapped term, as proposed.
    pub term: Term,
    /// The normal form the proposer claims for `term`.
    pub claimed_nf: Term,
    /// The term's deterministic signature, carried for quick comparison.
    pub signature: String,
    /// Origin timestamp.
    pub timestamp: DateTime<Utc>,
    /// Free-form metadata.
    pub metadata: BTreeMap<String, Value>,
}

impl SemanticObject {
    /// Builds the payload carried by a bare `object` wire message (as
    /// opposed to a `proposal` message's [`ObjectEnvelope`]): the actual
    /// computed normal form rather than a claimed one. Used when gossiping
    /// already-accepted GMF entries during synchronization.
    pub fn to_object_payload(&self, normal_form: &Term) -> ObjectPayload {
        ObjectPayload {
            id: self.id.clone(),
            term: self.term.clone(),
            normal_form: normal_form.clone(),
            timestamp: self.timestamp,
            metadata: self.metadata.clone(),
        }
    }
}

/// The on-wire payload carried by an `object` wire message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectPayload {
    /// The object's stable id.
    pub id: String,
    /// The wrapped term.
    pub term: Term,
    /// The term's actual, computed normal form.
    pub normal_form: Term,
    /// Origin timestamp.
    pub timestamp: DateTime<Utc>,
    /// Free-form metadata.
    pub metadata: BTreeMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_a_pure_function_of_the_term_signature() {
        let a = SemanticObject::new(Term::noun(23).unwrap(), BTreeMap::new());
        let b = SemanticObject::new(Term::noun(23).unwrap(), BTreeMap::new());
        assert_eq!(a.id, b.id, "same term on two nodes must yield the same id");
    }

    #[test]
    fn id_changes_with_the_term() {
        let a = SemanticObject::new(Term::noun(23).unwrap(), BTreeMap::new());
        let b = SemanticObject::new(Term::noun(29).unwrap(), BTreeMap::new());
        assert_ne!(a.id, b.id);
    }
}
