//! `ExpertiseProfile`: what a node is good at, advertised at handshake time
//! and used to route proposals and weight votes.

use crate::field::SemanticDomain;
use serde::{Deserialize, Serialize};

/// A node's advertised area of expertise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpertiseProfile {
    /// The node's chosen semantic domain.
    pub semantic_domain: SemanticDomain,
    /// Prime-number domains this node specializes in recognizing, e.g. the
    /// small odd primes it most readily fuses and decomposes.
    pub prime_domain: Vec<u64>,
    /// The node's primary semantic-vector axes (mirrors
    /// [`crate::field::LocalField::primary_axes`], advertised separately so
    /// peers can route without holding the full field).
    pub smf_axes: Vec<usize>,
}

impl ExpertiseProfile {
    /// Builds a profile from a domain, a set of primes, and axis indices.
    pub fn new(
        semantic_domain: SemanticDomain,
        prime_domain: Vec<u64>,
        smf_axes: Vec<usize>,
    ) -> Self {
        Self {
            semantic_domain,
            prime_domain,
            smf_axes,
        }
    }

    /// The fraction of `self.prime_domain` that also appears in `other`'s,
    /// used as one input to weighted voting. Two empty domains overlap
    /// fully by convention (nothing to disagree on).
    pub fn prime_domain_overlap(&self, other: &ExpertiseProfile) -> f64 {
        if self.prime_domain.is_empty() && other.prime_domain.is_empty() {
            return 1.0;
        }
        if self.prime_domain.is_empty() {
            return 0.0;
        }
        let shared = self
            .prime_domain
            .iter()
            .filter(|p| other.prime_domain.contains(p))
            .count();
        shared as f64 / self.prime_domain.len() as f64
    }

    /// Whether two profiles share a semantic domain.
    pub fn domain_matches(&self, other: &ExpertiseProfile) -> bool {
        self.semantic_domain == other.semantic_domain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_of_identical_domains_is_one() {
        let a = ExpertiseProfile::new(SemanticDomain::Cognitive, vec![3, 5, 7], vec![0, 4]);
        let b = ExpertiseProfile::new(SemanticDomain::Meta, vec![3, 5, 7], vec![1, 5]);
        assert_eq!(a.prime_domain_overlap(&b), 1.0);
    }

    #[test]
    fn overlap_of_disjoint_domains_is_zero() {
        let a = ExpertiseProfile::new(SemanticDomain::Cognitive, vec![3, 5], vec![]);
        let b = ExpertiseProfile::new(SemanticDomain::Meta, vec![11, 13], vec![]);
        assert_eq!(a.prime_domain_overlap(&b), 0.0);
    }

    #[test]
    fn two_empty_domains_overlap_fully() {
        let a = ExpertiseProfile::new(SemanticDomain::Cognitive, vec![], vec![]);
        let b = ExpertiseProfile::new(SemanticDomain::Meta, vec![], vec![]);
        assert_eq!(a.prime_domain_overlap(&b), 1.0);
    }

    #[test]
    fn domain_matches_checks_equality() {
        let a = ExpertiseProfile::new(SemanticDomain::Temporal, vec![], vec![]);
        let b = ExpertiseProfile::new(SemanticDomain::Temporal, vec![], vec![]);
        let c = ExpertiseProfile::new(SemanticDomain::Meta, vec![], vec![]);
        assert!(a.domain_matches(&b));
        assert!(!a.domain_matches(&c));
    }
}
