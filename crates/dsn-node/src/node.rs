//! The synchronizer and node facade: wires a [`LocalField`], a [`Gmf`], a
//! [`ProposalLog`], and a [`PrrcChannel`] together into the submit / vote /
//! finalize / join / reconnect / offline lifecycle.

use crate::error::{NodeError, NodeResult};
use crate::events::NodeEvent;
use crate::primes;
use chrono::Utc;
use dsn_channel::routing::primes_in_term;
use dsn_channel::{ChannelEvent, ChannelIdentity, PrrcChannel};
use dsn_gmf::{Gmf, ProposalLog};
use dsn_protocol::checks::{kernel_evidence_check, local_evidence_check, twist_closure_check, LocalEvidence};
use dsn_protocol::commit::{CommitInput, CommitThresholds};
use dsn_protocol::voting::{self, VoteHistory, WeightedVote};
use dsn_telemetry::time::Timer;
use dsn_transport::Transport;
use dsn_types::config::DsnConfig;
use dsn_types::expertise::ExpertiseProfile;
use dsn_types::field::{LocalField, SemanticDomain};
use dsn_types::gmf::{DeltaKind, DeltaRecord, SnapshotHeader};
use dsn_types::proposal::{Proposal, ProposalStatus, Vote};
use dsn_types::semantic_object::{ObjectEnvelope, SemanticObject};
use dsn_types::term::Term;
use dsn_types::wire::WireMessage;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use tracing::{info, warn};

fn phase_reference_for(node_id: &str) -> f64 {
    let sum: u64 = node_id.bytes().map(u64::from).sum();
    (sum as f64 % 1000.0) / 1000.0 * std::f64::consts::TAU
}

fn snapshot_generation(header: &SnapshotHeader) -> u64 {
    header.id.trim_start_matches("snap-").parse::<u64>().unwrap_or(0)
}

/// A single running node: owns its local field, its slice of the Global
/// Memory Field, its proposal log, and the PRRC channel it talks to peers
/// over.
///
/// Per the concurrency model this crate implements, `Node` exclusively owns
/// the GMF, proposal log, and vote history; the channel's own peer registry
/// is mutated only by the channel itself, and the channel never holds a
/// reference back to the node that subscribes to it.
pub struct Node {
    node_id: String,
    config: DsnConfig,
    channel: Arc<PrrcChannel>,
    gmf: Arc<Gmf>,
    proposal_log: Arc<ProposalLog>,
    vote_history: Arc<VoteHistory>,
    local_field: RwLock<LocalField>,
    prime_domain: Vec<u64>,
    online: AtomicBool,
    events: broadcast::Sender<NodeEvent>,
}

impl Node {
    /// Builds a node identified by `node_id` on PRRC channel `channel_id`,
    /// specializing in `prime_domain`, and spawns its channel-event
    /// dispatch loop.
    pub fn new(
        node_id: impl Into<String>,
        channel_id: impl Into<String>,
        semantic_domain: SemanticDomain,
        prime_domain: Vec<u64>,
        config: DsnConfig,
    ) -> Arc<Self> {
        let node_id = node_id.into();
        let local_field = LocalField::new(node_id.clone(), semantic_domain);
        let expertise = ExpertiseProfile::new(semantic_domain, prime_domain.clone(), local_field.primary_axes.to_vec());
        let identity = ChannelIdentity {
            node_id: node_id.clone(),
            channel_id: channel_id.into(),
            prime_set: prime_domain.clone(),
            phase_reference: phase_reference_for(&node_id),
            expertise: Some(expertise),
        };
        let channel = Arc::new(PrrcChannel::new(identity));
        let (events, _) = broadcast::channel(256);

        let node = Arc::new(Self {
            gmf: Arc::new(Gmf::new(config.max_eval_steps)),
            proposal_log: Arc::new(ProposalLog::with_capacity(config.proposal_log_cap)),
            vote_history: Arc::new(VoteHistory::new()),
            local_field: RwLock::new(local_field),
            prime_domain,
            online: AtomicBool::new(false),
            events,
            channel,
            config,
            node_id,
        });
        node.spawn_dispatch();
        node
    }

    /// This node's id.
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Whether this node currently considers itself online.
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Marks this node online without running the join handshake; useful
    /// for a bootstrap node with no peer to synchronize from.
    pub fn mark_online(&self) {
        self.online.store(true, Ordering::SeqCst);
    }

    /// The underlying PRRC channel, for connecting peers.
    pub fn channel(&self) -> &Arc<PrrcChannel> {
        &self.channel
    }

    /// This node's slice of the Global Memory Field.
    pub fn gmf(&self) -> &Arc<Gmf> {
        &self.gmf
    }

    /// This node's proposal log.
    pub fn proposal_log(&self) -> &Arc<ProposalLog> {
        &self.proposal_log
    }

    /// This node's assigned prime domain.
    pub fn my_prime_domain(&self) -> &[u64] {
        &self.prime_domain
    }

    /// Computes the contiguous prime-domain slice `node_index` owns out of
    /// `network_size`, drawn from the first `total_primes` primes.
    pub fn prime_domain_for(total_primes: usize, network_size: usize, node_index: usize) -> Vec<u64> {
        let table = primes::first_n_primes(total_primes);
        primes::partition_for(&table, network_size, node_index)
    }

    /// Connects a peer's transport and runs the handshake.
    pub async fn connect_peer(&self, peer_id: impl Into<String>, transport: Arc<dyn Transport>) -> NodeResult<()> {
        Ok(self.channel.connect(peer_id, transport).await?)
    }

    /// Subscribes to this node's event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<NodeEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: NodeEvent) {
        dsn_telemetry::node_metrics().inc_events_emitted(event.kind());
        let _ = self.events.send(event);
    }

    fn self_expertise(&self) -> ExpertiseProfile {
        #[allow(clippy::unwrap_used)]
        let field = self.local_field.read().unwrap();
        ExpertiseProfile::new(field.semantic_domain, self.prime_domain.clone(), field.primary_axes.to_vec())
    }

    fn local_evidence(&self) -> LocalEvidence {
        #[allow(clippy::unwrap_used)]
        let field = self.local_field.read().unwrap();
        LocalEvidence {
            coherence: field.coherence,
            entropy: field.entropy,
            fidelity: true,
        }
    }

    /// Submits `term` as a new proposal: evaluates its normal form,
    /// appends it to the proposal log, and (if online) routes it to the
    /// best-fit peers. Returns immediately with the freshly created,
    /// pending proposal.
    pub async fn submit(&self, term: Term, metadata: BTreeMap<String, Value>) -> Proposal {
        let nf = dsn_calculus::evaluate(&term, self.config.max_eval_steps);
        let object = SemanticObject::new(term.clone(), metadata.clone());
        let proofs = BTreeMap::new();
        let proposal = Proposal::new(object.clone(), proofs.clone());
        self.proposal_log.append(proposal.clone());

        if self.is_online() {
            let envelope = object.to_proposal_envelope(&nf);
            let msg = WireMessage::Proposal {
                node_id: self.node_id.clone(),
                object: envelope,
                proofs,
                proposal_id: proposal.id.clone(),
                metadata,
                timestamp: Utc::now(),
            };
            let targets = self.channel.route(&term, Some(&self.self_expertise()));
            self.channel.send_to(&targets, msg).await;
        }
        proposal
    }

    fn spawn_dispatch(self: &Arc<Self>) {
        let node = Arc::clone(self);
        let mut rx = node.channel.subscribe();
        tokio::spawn(async move {
            while let Ok(event) = rx.recv().await {
                node.handle_channel_event(event).await;
            }
        });
    }

    async fn handle_channel_event(&self, event: ChannelEvent) {
        match event {
            ChannelEvent::PeerConnected { peer_id, phase_offset } => {
                info!(peer_id = %peer_id, phase_offset, "peer connected");
            }
            ChannelEvent::Object { peer_id, object } => {
                if self.gmf.is_placeholder(&object.id) {
                    self.gmf.rehydrate(
                        &object.id,
                        SemanticObject {
                            id: object.id.clone(),
                            term: object.term.clone(),
                            metadata: object.metadata.clone(),
                            timestamp: object.timestamp,
                        },
                    );
                }
                self.emit(NodeEvent::ObjectReceived { peer_id, object });
            }
            ChannelEvent::Proposal {
                peer_id,
                proposal_id,
                object,
                proofs,
            } => {
                self.handle_incoming_proposal(peer_id, proposal_id, object, proofs).await;
            }
            ChannelEvent::Vote {
                peer_id: _,
                proposal_id,
                node_id,
                vote,
            } => {
                self.handle_incoming_vote(proposal_id, node_id, vote).await;
            }
            ChannelEvent::Error { peer_id, reason } => {
                warn!(peer_id = %peer_id, reason = %reason, "channel dispatch error");
                dsn_telemetry::error_metrics().inc_error("channel", "dispatch_error");
            }
        }
    }

    async fn handle_incoming_proposal(
        &self,
        peer_id: String,
        proposal_id: String,
        object: ObjectEnvelope,
        proofs: BTreeMap<String, Value>,
    ) {
        let twist = twist_closure_check(&proofs);
        let local = local_evidence_check(&self.local_evidence(), self.config.coherence_threshold);
        let kernel = kernel_evidence_check(&object.term, &object.claimed_nf, &proofs, self.config.max_eval_steps);
        let agree = twist.passed && local.passed && kernel.passed;

        let proposal = Proposal {
            id: proposal_id.clone(),
            object: SemanticObject {
                id: object.id.clone(),
                term: object.term.clone(),
                metadata: object.metadata.clone(),
                timestamp: object.timestamp,
            },
            proofs,
            metadata: BTreeMap::new(),
            timestamp: object.timestamp,
            status: ProposalStatus::Pending,
            votes: BTreeMap::new(),
        };
        self.proposal_log.append(proposal);

        let vote = Vote {
            agree,
            timestamp: Utc::now(),
        };
        dsn_telemetry::protocol_metrics().inc_votes_cast();
        self.emit(NodeEvent::ProposalVoted {
            proposal_id: proposal_id.clone(),
            node_id: self.node_id.clone(),
            agree,
        });

        let msg = WireMessage::vote(&proposal_id, &self.node_id, &vote);
        self.channel.send_to(&[peer_id], msg).await;
    }

    async fn handle_incoming_vote(&self, proposal_id: String, node_id: String, vote: Vote) {
        let Some(mut proposal) = self.proposal_log.get(&proposal_id) else {
            return;
        };
        if proposal.status != ProposalStatus::Pending {
            return;
        }
        proposal.record_vote(node_id, vote.agree);
        let quorum_reached = proposal.votes.len() >= self.config.voting_quorum;
        self.proposal_log.replace(proposal);

        if quorum_reached {
            self.finalize(&proposal_id).await;
        }
    }

    /// Re-evaluates `proposal_id` against the votes collected so far and
    /// finalizes it. Idempotent: a proposal no longer `Pending` is left
    /// untouched, so duplicate quorum triggers are harmless.
    async fn finalize(&self, proposal_id: &str) {
        let Some(proposal) = self.proposal_log.get(proposal_id) else {
            return;
        };
        if proposal.status != ProposalStatus::Pending {
            return;
        }

        let nf = dsn_calculus::evaluate(&proposal.object.term, self.config.max_eval_steps);
        let proposal_profile = ExpertiseProfile::new(
            {
                #[allow(clippy::unwrap_used)]
                let domain = self.local_field.read().unwrap().semantic_domain;
                domain
            },
            primes_in_term(&proposal.object.term).into_iter().collect(),
            Vec::new(),
        );
        let weighted: Vec<WeightedVote> = proposal
            .votes
            .iter()
            .map(|(voter, vote)| {
                let voter_profile = self.channel.peer_expertise(voter);
                let weight = voting::voter_weight(
                    voter_profile.as_ref(),
                    Some(&proposal_profile),
                    self.vote_history.accuracy_of(voter),
                );
                WeightedVote { agree: vote.agree, weight }
            })
            .collect();
        let redundancy = voting::weighted_redundancy(&weighted);

        let timer = Timer::new(dsn_telemetry::protocol_metrics());
        let outcome = dsn_protocol::commit::evaluate(
            &CommitInput {
                term: proposal.object.term.clone(),
                claimed_nf: nf,
                proofs: proposal.proofs.clone(),
                local_evidence: self.local_evidence(),
                redundancy,
            },
            &CommitThresholds {
                coherence_threshold: self.config.coherence_threshold,
                redundancy_threshold: self.config.redundancy_threshold,
                max_eval_steps: self.config.max_eval_steps,
            },
        );
        drop(timer);

        for (voter, vote) in &proposal.votes {
            self.vote_history.record_vote_outcome(voter, vote.agree == outcome.accepted);
        }

        let mut finalized = proposal;
        if outcome.accepted {
            finalized.status = ProposalStatus::Accepted;
            self.proposal_log.replace(finalized.clone());
            self.gmf.insert(finalized.object, 1.0, finalized.metadata);
            dsn_telemetry::gmf_metrics().inc_entries_inserted(1);
            dsn_telemetry::protocol_metrics().inc_proposals_accepted();
            self.emit(NodeEvent::ProposalAccepted {
                proposal_id: proposal_id.to_string(),
            });
        } else {
            finalized.status = ProposalStatus::Rejected;
            self.proposal_log.replace(finalized);
            dsn_telemetry::protocol_metrics().inc_proposals_rejected();
            self.emit(NodeEvent::ProposalRejected {
                proposal_id: proposal_id.to_string(),
                reason: outcome.outcome.reason.unwrap_or_else(|| "redundancy".to_string()),
            });
        }
    }

    async fn pull_and_apply(&self, peer_id: &str, peer_gmf: &Gmf) -> NodeResult<()> {
        if !self.channel.peer_ids().iter().any(|p| p == peer_id) {
            return Err(NodeError::NoJoinPeer);
        }
        let header = peer_gmf.snapshot();
        let seed: Vec<DeltaRecord> = header
            .entries
            .iter()
            .map(|e| DeltaRecord {
                kind: DeltaKind::Insert,
                id: e.id.clone(),
                weight: Some(e.weight),
                timestamp: e.inserted_at,
                snapshot_id: 0,
            })
            .collect();
        self.gmf.apply_deltas(&seed);
        let catch_up = peer_gmf.deltas_since(snapshot_generation(&header).saturating_sub(1));
        self.gmf.apply_deltas(&catch_up);
        dsn_telemetry::gmf_metrics().inc_deltas_applied((seed.len() + catch_up.len()) as u64);
        self.online.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Joins the network through `peer_id`: pulls `peer_gmf`'s snapshot,
    /// seeds placeholder entries for every summarized object (rehydrated
    /// later as real `object` broadcasts arrive), applies any deltas
    /// recorded since, and marks this node online.
    pub async fn join(&self, peer_id: &str, peer_gmf: &Gmf) -> NodeResult<()> {
        self.emit(NodeEvent::SyncStarted);
        self.pull_and_apply(peer_id, peer_gmf).await?;
        self.emit(NodeEvent::SyncComplete);
        Ok(())
    }

    /// Re-synchronizes through `peer_id` after a disconnection, identically
    /// to [`Node::join`], then replays every still-`Pending` proposal by
    /// re-broadcasting it. Returns the number of proposals replayed.
    pub async fn reconnect(&self, peer_id: &str, peer_gmf: &Gmf) -> NodeResult<usize> {
        self.emit(NodeEvent::ResyncStarted);
        self.pull_and_apply(peer_id, peer_gmf).await?;

        let pending = self.proposal_log.pending();
        let mut replayed = 0usize;
        for proposal in pending {
            let nf = dsn_calculus::evaluate(&proposal.object.term, self.config.max_eval_steps);
            let envelope = proposal.object.to_proposal_envelope(&nf);
            let msg = WireMessage::Proposal {
                node_id: self.node_id.clone(),
                object: envelope,
                proofs: proposal.proofs.clone(),
                proposal_id: proposal.id.clone(),
                metadata: proposal.metadata.clone(),
                timestamp: Utc::now(),
            };
            self.channel.broadcast(msg).await;
            replayed += 1;
        }

        self.emit(NodeEvent::ResyncComplete { replayed_count: replayed });
        Ok(replayed)
    }

    /// Drops this node offline: no further network I/O is attempted, but
    /// `submit` keeps appending to the proposal log for later replay.
    pub fn offline(&self) {
        self.online.store(false, Ordering::SeqCst);
        self.emit(NodeEvent::Offline);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsn_transport::InProcessTransport;
    use std::time::Duration;

    fn test_config(quorum: usize) -> DsnConfig {
        let mut config = DsnConfig::default();
        config.voting_quorum = quorum;
        config
    }

    #[tokio::test]
    async fn submit_while_offline_does_not_broadcast() {
        let node = Node::new("node-a", "chan-1", SemanticDomain::Cognitive, vec![3, 5], test_config(3));
        let proposal = node.submit(Term::noun(23).unwrap(), BTreeMap::new()).await;
        assert_eq!(proposal.status, ProposalStatus::Pending);
        assert_eq!(node.proposal_log().len(), 1);
    }

    #[tokio::test]
    async fn proposal_round_trip_finalizes_and_inserts_into_gmf() {
        let node_a = Node::new("node-a", "chan-1", SemanticDomain::Cognitive, vec![23], test_config(1));
        let node_b = Node::new("node-b", "chan-1", SemanticDomain::Cognitive, vec![23], test_config(1));

        let mut chan_a_events = node_a.channel().subscribe();
        let (t_a, t_b) = InProcessTransport::pair();
        node_a.connect_peer("node-b", t_a).await.unwrap();
        node_b.connect_peer("node-a", t_b).await.unwrap();
        node_a.mark_online();

        // Wait for the handshake round trip so `route`/`send_to` see a
        // connected peer before submitting.
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if let Ok(dsn_channel::ChannelEvent::PeerConnected { .. }) = chan_a_events.recv().await {
                    return;
                }
            }
        })
        .await
        .unwrap();

        let mut events_a = node_a.subscribe();
        node_a.submit(Term::noun(23).unwrap(), BTreeMap::new()).await;

        let event = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if let Ok(event) = events_a.recv().await {
                    if matches!(event, NodeEvent::ProposalAccepted { .. }) {
                        return event;
                    }
                }
            }
        })
        .await
        .unwrap();

        assert!(matches!(event, NodeEvent::ProposalAccepted { .. }));
        assert_eq!(node_a.gmf().len(), 1);
    }

    #[tokio::test]
    async fn join_seeds_placeholder_entries_from_peer_snapshot() {
        let peer_gmf = Gmf::new(1000);
        let id = peer_gmf.insert(
            SemanticObject::new(Term::noun(23).unwrap(), BTreeMap::new()),
            1.0,
            BTreeMap::new(),
        );

        let node = Node::new("node-a", "chan-1", SemanticDomain::Cognitive, vec![3, 5], test_config(3));
        let (t_a, _t_b) = InProcessTransport::pair();
        node.connect_peer("peer-x", t_a).await.unwrap();

        node.join("peer-x", &peer_gmf).await.unwrap();

        assert!(node.is_online());
        assert!(node.gmf().is_placeholder(&id));
    }

    #[tokio::test]
    async fn join_fails_without_a_registered_peer() {
        let peer_gmf = Gmf::new(1000);
        let node = Node::new("node-a", "chan-1", SemanticDomain::Cognitive, vec![3, 5], test_config(3));
        assert!(node.join("nobody", &peer_gmf).await.is_err());
    }

    #[tokio::test]
    async fn offline_stops_further_broadcast_targeting() {
        let node = Node::new("node-a", "chan-1", SemanticDomain::Cognitive, vec![3, 5], test_config(3));
        node.mark_online();
        assert!(node.is_online());
        node.offline();
        assert!(!node.is_online());
    }

    #[tokio::test]
    async fn prime_domain_for_is_disjoint_and_complete() {
        let mut all = Vec::new();
        for i in 0..3 {
            all.extend(Node::prime_domain_for(12, 3, i));
        }
        all.sort_unstable();
        assert_eq!(all, primes::first_n_primes(12));
    }
}
