//! The transport manager: a primary transport plus an ordered fallback
//! list, promoting the first transport that becomes ready whenever a send
//! fails.

use crate::error::TransportResult;
use crate::state::ConnectionState;
use crate::transport::Transport;
use dsn_types::wire::WireMessage;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Holds an ordered preference list of transports — index `0` is primary,
/// the rest are fallbacks tried in order.
///
/// `send` always targets the currently active transport. If that send
/// fails, the manager walks the preference list looking for the first
/// transport already in [`ConnectionState::Connected`] and promotes it to
/// active before retrying once.
pub struct TransportManager {
    transports: Vec<Arc<dyn Transport>>,
    active: AtomicUsize,
}

impl TransportManager {
    /// Builds a manager over `transports`, in preference order.
    ///
    /// # Panics
    ///
    /// Panics if `transports` is empty — a manager with no transports is a
    /// construction bug, not a runtime condition.
    pub fn new(transports: Vec<Arc<dyn Transport>>) -> Self {
        assert!(!transports.is_empty(), "TransportManager needs at least one transport");
        Self {
            transports,
            active: AtomicUsize::new(0),
        }
    }

    /// The currently active transport.
    pub fn active(&self) -> &Arc<dyn Transport> {
        #[allow(clippy::indexing_slicing)]
        &self.transports[self.active.load(Ordering::SeqCst)]
    }

    fn promote_first_ready(&self) -> bool {
        for (i, t) in self.transports.iter().enumerate() {
            if t.state() == ConnectionState::Connected {
                self.active.store(i, Ordering::SeqCst);
                return true;
            }
        }
        false
    }

    /// Connects every transport in the preference list.
    pub async fn connect_all(&self) -> TransportResult<()> {
        for t in &self.transports {
            t.connect().await?;
        }
        Ok(())
    }

    /// Sends via the active transport, falling back to the next ready one
    /// on failure.
    pub async fn send(&self, msg: WireMessage, queue: bool) -> TransportResult<()> {
        let result = self.active().send(msg.clone(), queue).await;
        if result.is_ok() {
            return result;
        }
        if self.promote_first_ready() {
            return self.active().send(msg, queue).await;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::in_process::InProcessTransport;

    #[tokio::test]
    async fn falls_back_to_second_ready_transport() {
        let (a, _a_peer) = InProcessTransport::pair();
        let (b, b_peer) = InProcessTransport::pair();
        b.connect().await.unwrap();
        b_peer.connect().await.unwrap();

        let manager = TransportManager::new(vec![a as Arc<dyn Transport>, b as Arc<dyn Transport>]);
        let mut rx = b_peer.subscribe_messages();
        manager.send(WireMessage::Ping { timestamp: 42 }, false).await.unwrap();
        let got = rx.recv().await.unwrap();
        assert!(matches!(got, WireMessage::Ping { timestamp: 42 }));
    }
}
