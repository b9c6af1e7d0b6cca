//! The per-peer registry entry a [`crate::channel::PrrcChannel`] tracks.

use chrono::{DateTime, Utc};
use dsn_transport::Transport;
use dsn_types::expertise::ExpertiseProfile;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// One peer's channel-level state: its transport, the computed phase
/// offset, connectedness, and (once populated out of band) its cached
/// expertise profile.
pub struct PeerEntry {
    /// The peer's stable id.
    pub peer_id: String,
    /// The transport used to reach this peer.
    pub transport: Arc<dyn Transport>,
    /// `peer.phaseReference - self.phaseReference`, computed on handshake.
    phase_offset: Mutex<Option<f64>>,
    connected: AtomicBool,
    last_seen: Mutex<DateTime<Utc>>,
    expertise_profile: Mutex<Option<ExpertiseProfile>>,
}

impl PeerEntry {
    /// Creates a not-yet-connected entry for `peer_id` over `transport`.
    pub fn new(peer_id: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            peer_id: peer_id.into(),
            transport,
            phase_offset: Mutex::new(None),
            connected: AtomicBool::new(false),
            last_seen: Mutex::new(Utc::now()),
            expertise_profile: Mutex::new(None),
        }
    }

    /// Whether the handshake has completed for this peer.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Marks the peer connected and records its phase offset. Idempotent:
    /// a second handshake overwrites the offset but doesn't re-fire any
    /// side effect the caller didn't already decide to re-fire.
    pub fn mark_connected(&self, phase_offset: f64) {
        self.connected.store(true, Ordering::SeqCst);
        #[allow(clippy::unwrap_used)]
        {
            *self.phase_offset.lock().unwrap() = Some(phase_offset);
        }
        self.touch();
    }

    /// Updates the last-seen timestamp to now.
    pub fn touch(&self) {
        #[allow(clippy::unwrap_used)]
        {
            *self.last_seen.lock().unwrap() = Utc::now();
        }
    }

    /// The last time activity was observed from this peer.
    pub fn last_seen(&self) -> DateTime<Utc> {
        #[allow(clippy::unwrap_used)]
        {
            *self.last_seen.lock().unwrap()
        }
    }

    /// The computed phase offset, if the handshake has completed.
    pub fn phase_offset(&self) -> Option<f64> {
        #[allow(clippy::unwrap_used)]
        {
            *self.phase_offset.lock().unwrap()
        }
    }

    /// The cached expertise profile, if one has been published.
    pub fn expertise_profile(&self) -> Option<ExpertiseProfile> {
        #[allow(clippy::unwrap_used)]
        {
            self.expertise_profile.lock().unwrap().clone()
        }
    }

    /// Records (or replaces) the peer's published expertise profile.
    pub fn set_expertise_profile(&self, profile: ExpertiseProfile) {
        #[allow(clippy::unwrap_used)]
        {
            *self.expertise_profile.lock().unwrap() = Some(profile);
        }
    }
}
