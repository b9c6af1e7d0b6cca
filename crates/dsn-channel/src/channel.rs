//! The PRRC (Prime-Resonant Resonance Channel) peer multiplexer: owns the
//! peer registry, runs the handshake, and dispatches inbound traffic by
//! message type.

use crate::error::{ChannelError, ChannelResult};
use crate::events::ChannelEvent;
use crate::peer::PeerEntry;
use crate::routing;
use dsn_transport::Transport;
use dsn_types::expertise::ExpertiseProfile;
use dsn_types::semantic_object::SemanticObject;
use dsn_types::term::Term;
use dsn_types::wire::WireMessage;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use tracing::warn;

/// The channel's own identity, advertised on every handshake.
pub struct ChannelIdentity {
    /// This node's id.
    pub node_id: String,
    /// The channel's id (shared by every peer on this channel).
    pub channel_id: String,
    /// The primes this node specializes in.
    pub prime_set: Vec<u64>,
    /// This node's phase reference.
    pub phase_reference: f64,
    /// This node's expertise profile, piggybacked on the handshake.
    pub expertise: Option<ExpertiseProfile>,
}

/// Owns `peers: peerId → PeerEntry` and the dispatch loop that turns
/// transport-level [`WireMessage`]s into typed [`ChannelEvent`]s.
pub struct PrrcChannel {
    identity: ChannelIdentity,
    peers: RwLock<BTreeMap<String, Arc<PeerEntry>>>,
    events: broadcast::Sender<ChannelEvent>,
}

impl PrrcChannel {
    /// Creates a channel that will identify itself with `identity` on every
    /// handshake it sends.
    pub fn new(identity: ChannelIdentity) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            identity,
            peers: RwLock::new(BTreeMap::new()),
            events,
        }
    }

    /// Subscribes to channel events.
    pub fn subscribe(&self) -> broadcast::Receiver<ChannelEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: ChannelEvent) {
        let _ = self.events.send(event);
    }

    /// Registers `transport` under `peer_id`, connects it, sends the
    /// one-shot handshake, and spawns the peer's inbound dispatch loop.
    /// Idempotent: calling `connect` again for an already-registered peer
    /// reuses the existing entry instead of re-handshaking.
    pub async fn connect(self: &Arc<Self>, peer_id: impl Into<String>, transport: Arc<dyn Transport>) -> ChannelResult<()> {
        let peer_id = peer_id.into();
        {
            #[allow(clippy::unwrap_used)]
            let peers = self.peers.read().unwrap();
            if peers.contains_key(&peer_id) {
                return Ok(());
            }
        }

        transport.connect().await?;
        let entry = Arc::new(PeerEntry::new(peer_id.clone(), Arc::clone(&transport)));
        {
            #[allow(clippy::unwrap_used)]
            let mut peers = self.peers.write().unwrap();
            peers.insert(peer_id.clone(), Arc::clone(&entry));
        }

        let handshake = WireMessage::Handshake {
            node_id: self.identity.node_id.clone(),
            channel_id: self.identity.channel_id.clone(),
            prime_set: self.identity.prime_set.clone(),
            phase_reference: self.identity.phase_reference,
            timestamp: chrono::Utc::now(),
            expertise: self.identity.expertise.clone(),
        };
        transport.send(handshake, true).await?;

        self.spawn_dispatch_loop(entry);
        Ok(())
    }

    fn spawn_dispatch_loop(self: &Arc<Self>, entry: Arc<PeerEntry>) {
        let channel = Arc::clone(self);
        let mut rx = entry.transport.subscribe_messages();
        tokio::spawn(async move {
            while let Ok(msg) = rx.recv().await {
                channel.dispatch(&entry, msg);
            }
        });
    }

    fn dispatch(&self, entry: &Arc<PeerEntry>, msg: WireMessage) {
        entry.touch();
        match msg {
            WireMessage::Handshake {
                phase_reference,
                expertise,
                ..
            } => {
                let offset = phase_reference - self.identity.phase_reference;
                let already_connected = entry.is_connected();
                entry.mark_connected(offset);
                if let Some(profile) = expertise {
                    entry.set_expertise_profile(profile);
                }
                if !already_connected {
                    self.emit(ChannelEvent::PeerConnected {
                        peer_id: entry.peer_id.clone(),
                        phase_offset: offset,
                    });
                }
            }
            WireMessage::Object { object, .. } => {
                self.emit(ChannelEvent::Object {
                    peer_id: entry.peer_id.clone(),
                    object,
                });
            }
            WireMessage::Proposal {
                object,
                proposal_id,
                proofs,
                ..
            } => {
                self.emit(ChannelEvent::Proposal {
                    peer_id: entry.peer_id.clone(),
                    proposal_id,
                    object,
                    proofs,
                });
            }
            WireMessage::VoteMessage {
                proposal_id,
                node_id,
                agree,
                timestamp,
            } => {
                self.emit(ChannelEvent::Vote {
                    peer_id: entry.peer_id.clone(),
                    proposal_id,
                    node_id,
                    vote: dsn_types::proposal::Vote { agree, timestamp },
                });
            }
            WireMessage::Ping { .. } => {}
        }
    }

    /// Sends a bare object broadcast to one connected peer. Fails with
    /// [`ChannelError::PeerNotConnected`] if the handshake hasn't
    /// completed.
    pub async fn send_object(
        &self,
        peer_id: &str,
        object: &SemanticObject,
        normal_form: &Term,
        metadata: BTreeMap<String, serde_json::Value>,
    ) -> ChannelResult<()> {
        let entry = self.peer(peer_id)?;
        if !entry.is_connected() {
            return Err(ChannelError::PeerNotConnected(peer_id.to_string()));
        }
        let phase_adjustment = entry.phase_offset().unwrap_or(0.0);
        let msg = WireMessage::Object {
            node_id: self.identity.node_id.clone(),
            object: object.to_object_payload(normal_form),
            phase_adjustment,
            metadata,
            timestamp: chrono::Utc::now(),
        };
        entry.transport.send(msg, true).await?;
        Ok(())
    }

    /// Broadcasts `msg` to every connected peer, best-effort: a failing
    /// send is logged and swallowed rather than propagated, since the
    /// synchronizer is responsible for redelivery via reconnect replay.
    pub async fn broadcast(&self, msg: WireMessage) {
        let targets: Vec<Arc<PeerEntry>> = {
            #[allow(clippy::unwrap_used)]
            let peers = self.peers.read().unwrap();
            peers
                .values()
                .filter(|p| p.is_connected())
                .cloned()
                .collect()
        };
        for peer in targets {
            if let Err(err) = peer.transport.send(msg.clone(), true).await {
                warn!(peer_id = %peer.peer_id, error = %err, "broadcast send failed, swallowing");
            }
        }
    }

    /// Routes `term` to the best-fit subset of connected peers via
    /// expertise-based scoring (see [`crate::routing::route_for_term`]),
    /// falling back to every connected peer when no peer scores positive.
    pub fn route(&self, term: &Term, context: Option<&ExpertiseProfile>) -> Vec<String> {
        let connected: Vec<Arc<PeerEntry>> = {
            #[allow(clippy::unwrap_used)]
            let peers = self.peers.read().unwrap();
            peers
                .values()
                .filter(|p| p.is_connected())
                .cloned()
                .collect()
        };
        routing::route_for_term(term, context, &connected)
    }

    /// Sends `msg` to exactly the peers named by `peer_ids`, best-effort.
    pub async fn send_to(&self, peer_ids: &[String], msg: WireMessage) {
        for peer_id in peer_ids {
            if let Ok(entry) = self.peer(peer_id) {
                if entry.is_connected() {
                    if let Err(err) = entry.transport.send(msg.clone(), true).await {
                        warn!(peer_id = %peer_id, error = %err, "routed send failed, swallowing");
                    }
                }
            }
        }
    }

    fn peer(&self, peer_id: &str) -> ChannelResult<Arc<PeerEntry>> {
        #[allow(clippy::unwrap_used)]
        let peers = self.peers.read().unwrap();
        peers
            .get(peer_id)
            .cloned()
            .ok_or_else(|| ChannelError::UnknownPeer(peer_id.to_string()))
    }

    /// Lists every peer id the channel currently knows about.
    pub fn peer_ids(&self) -> Vec<String> {
        #[allow(clippy::unwrap_used)]
        let peers = self.peers.read().unwrap();
        peers.keys().cloned().collect()
    }

    /// The cached expertise profile a peer advertised on handshake, if any.
    pub fn peer_expertise(&self, peer_id: &str) -> Option<ExpertiseProfile> {
        self.peer(peer_id).ok()?.expertise_profile()
    }

    /// This channel's own node id.
    pub fn node_id(&self) -> &str {
        &self.identity.node_id
    }

    /// This channel's own expertise profile, if one was configured.
    pub fn self_expertise(&self) -> Option<&ExpertiseProfile> {
        self.identity.expertise.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsn_transport::InProcessTransport;
    use std::collections::BTreeMap;

    fn identity(node_id: &str) -> ChannelIdentity {
        ChannelIdentity {
            node_id: node_id.to_string(),
            channel_id: "chan-1".to_string(),
            prime_set: vec![3, 5],
            phase_reference: 0.0,
            expertise: None,
        }
    }

    #[tokio::test]
    async fn handshake_connects_peer_and_computes_phase_offset() {
        let (t_a, t_b) = InProcessTransport::pair();
        let chan_a = Arc::new(PrrcChannel::new(identity("a")));
        let mut chan_a_events = chan_a.subscribe();

        let mut identity_b = identity("b");
        identity_b.phase_reference = 1.5;
        let chan_b = Arc::new(PrrcChannel::new(identity_b));

        chan_a.connect("b", t_a).await.unwrap();
        chan_b.connect("a", t_b).await.unwrap();

        let event = tokio::time::timeout(std::time::Duration::from_secs(1), chan_a_events.recv())
            .await
            .unwrap()
            .unwrap();
        match event {
            ChannelEvent::PeerConnected { peer_id, phase_offset } => {
                assert_eq!(peer_id, "b");
                assert_eq!(phase_offset, 1.5);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn send_object_fails_before_handshake_completes() {
        let (t_a, _t_b) = InProcessTransport::pair();
        let chan_a = Arc::new(PrrcChannel::new(identity("a")));
        chan_a.connect("b", t_a).await.unwrap();

        let object = SemanticObject::new(Term::noun(23).unwrap(), BTreeMap::new());
        let nf = Term::noun(23).unwrap();
        let err = chan_a.send_object("b", &object, &nf, BTreeMap::new()).await;
        assert!(err.is_err());
    }
}
