//! Expertise-based proposal routing: score peers by how well their
//! advertised expertise overlaps a proposal, and route to the best-fit
//! subset instead of a full broadcast.

use crate::peer::PeerEntry;
use dsn_types::expertise::ExpertiseProfile;
use dsn_types::term::{Term, TermView};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Walks `term` and collects every prime it mentions: the noun/adj prime
/// for `Noun`/`Adj`, every adjective plus the noun for `Chain`, the triad
/// for `Fuse`, and the union of both sides for `Seq`/`Impl`.
pub fn primes_in_term(term: &Term) -> BTreeSet<u64> {
    let mut out = BTreeSet::new();
    collect_primes(term, &mut out);
    out
}

fn collect_primes(term: &Term, out: &mut BTreeSet<u64>) {
    match term.view() {
        TermView::Noun(p) | TermView::Adj(p) => {
            out.insert(p);
        }
        TermView::Chain { adjs, noun } => {
            out.extend(adjs.iter().copied());
            out.insert(noun);
        }
        TermView::Fuse(p, q, r) => {
            out.insert(p);
            out.insert(q);
            out.insert(r);
        }
        TermView::Seq(l, r) => {
            collect_primes(l, out);
            collect_primes(r, out);
        }
        TermView::Impl(a, c) => {
            collect_primes(a, out);
            collect_primes(c, out);
        }
        TermView::Undefined(_) => {}
    }
}

/// Scores `peer` against a proposal's primes, with bonuses for SMF-axis
/// alignment and semantic-domain match against `context` (typically the
/// routing node's own profile, standing in for the proposal's affinity).
fn score_peer(peer: &PeerEntry, proposal_primes: &BTreeSet<u64>, context: Option<&ExpertiseProfile>) -> f64 {
    let Some(profile) = peer.expertise_profile() else {
        return 0.0;
    };
    let overlap = profile
        .prime_domain
        .iter()
        .filter(|p| proposal_primes.contains(p))
        .count() as f64;

    let mut score = overlap;
    if let Some(ctx) = context {
        let axis_overlap = profile
            .smf_axes
            .iter()
            .filter(|a| ctx.smf_axes.contains(a))
            .count() as f64;
        score += axis_overlap * 0.5;
        if profile.domain_matches(ctx) {
            score += 1.0;
        }
    }
    score
}

/// Returns the peer ids best-suited to receive `term`, per the
/// expertise-routing rule: score every peer, take the top `⌈√n⌉` by score,
/// falling back to every peer if none scored positive.
pub fn route_for_term(
    term: &Term,
    context: Option<&ExpertiseProfile>,
    peers: &[Arc<PeerEntry>],
) -> Vec<String> {
    if peers.is_empty() {
        return Vec::new();
    }
    let primes = primes_in_term(term);
    let mut scored: Vec<(f64, &Arc<PeerEntry>)> = peers
        .iter()
        .map(|p| (score_peer(p, &primes, context), p))
        .collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    if scored.iter().all(|(score, _)| *score <= 0.0) {
        return peers.iter().map(|p| p.peer_id.clone()).collect();
    }

    let top_n = (peers.len() as f64).sqrt().ceil() as usize;
    scored
        .into_iter()
        .take(top_n.max(1))
        .map(|(_, p)| p.peer_id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsn_transport::InProcessTransport;
    use dsn_types::field::SemanticDomain;

    fn peer_with_profile(id: &str, primes: Vec<u64>, axes: Vec<usize>, domain: SemanticDomain) -> Arc<PeerEntry> {
        let (t, _other) = InProcessTransport::pair();
        let entry = Arc::new(PeerEntry::new(id, t));
        entry.set_expertise_profile(ExpertiseProfile::new(domain, primes, axes));
        entry
    }

    #[test]
    fn primes_in_term_collects_chain_and_fuse() {
        let chain = Term::chain(vec![3, 5], 7).unwrap();
        assert_eq!(primes_in_term(&chain), BTreeSet::from([3, 5, 7]));

        let fuse = Term::fuse(3, 5, 11).unwrap();
        assert_eq!(primes_in_term(&fuse), BTreeSet::from([3, 5, 11]));
    }

    #[test]
    fn routes_to_best_overlap_peers() {
        let a = peer_with_profile("a", vec![3, 5], vec![], SemanticDomain::Cognitive);
        let b = peer_with_profile("b", vec![99, 101], vec![], SemanticDomain::Cognitive);
        let c = peer_with_profile("c", vec![103, 107], vec![], SemanticDomain::Cognitive);
        let d = peer_with_profile("d", vec![109, 113], vec![], SemanticDomain::Cognitive);
        let term = Term::chain(vec![3, 5], 7).unwrap();
        // ceil(sqrt(4)) = 2, so only the single peer with real overlap plus
        // one zero-scoring tie-break peer should be selected.
        let routed = route_for_term(&term, None, &[a, b, c, d]);
        assert_eq!(routed.len(), 2);
        assert!(routed.contains(&"a".to_string()));
    }

    #[test]
    fn falls_back_to_all_peers_when_nothing_scores() {
        let a = peer_with_profile("a", vec![], vec![], SemanticDomain::Cognitive);
        let b = peer_with_profile("b", vec![], vec![], SemanticDomain::Cognitive);
        let term = Term::chain(vec![3, 5], 7).unwrap();
        let mut routed = route_for_term(&term, None, &[a, b]);
        routed.sort();
        assert_eq!(routed, vec!["a".to_string(), "b".to_string()]);
    }
}
