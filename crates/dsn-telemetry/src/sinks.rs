//! Defines abstract traits for metrics reporting, decoupling core logic from the backend.

use once_cell::sync::OnceCell;

// --- Static Sink Access ---

/// A no-op sink for use in tests or when telemetry is disabled.
#[derive(Debug, Clone, Copy)]
pub struct NopSink;

/// A lazily-initialized static reference to the global `MetricsSink` implementation.
pub static SINK: OnceCell<&'static dyn MetricsSink> = OnceCell::new();
static NOP_SINK: NopSink = NopSink;

/// Returns a static reference to the configured error metrics sink.
/// If no sink has been initialized, it returns a no-op sink.
pub fn error_metrics() -> &'static dyn ErrorMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns a static reference to the configured node-level dispatch metrics sink.
/// If no sink has been initialized, it returns a no-op sink.
pub fn node_metrics() -> &'static dyn NodeMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns a static reference to the configured Global Memory Field metrics sink.
/// If no sink has been initialized, it returns a no-op sink.
pub fn gmf_metrics() -> &'static dyn GmfMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns a static reference to the configured transport metrics sink.
/// If no sink has been initialized, it returns a no-op sink.
pub fn transport_metrics() -> &'static dyn TransportMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns a static reference to the configured Coherent-Commit protocol metrics sink.
/// If no sink has been initialized, it returns a no-op sink.
pub fn protocol_metrics() -> &'static dyn ProtocolMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

// --- Trait Definitions ---

/// A sink for metrics related to the Global Memory Field.
pub trait GmfMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments the total number of objects inserted into the GMF.
    fn inc_entries_inserted(&self, count: u64);
    /// Increments the total number of deltas applied during a resync.
    fn inc_deltas_applied(&self, count: u64);
    /// Sets the gauge for the current number of entries held in the GMF.
    fn set_entry_count(&self, count: u64);
    /// Observes the duration of producing a snapshot.
    fn observe_snapshot_duration(&self, duration_secs: f64);
}
impl GmfMetricsSink for NopSink {
    fn inc_entries_inserted(&self, _count: u64) {}
    fn inc_deltas_applied(&self, _count: u64) {}
    fn set_entry_count(&self, _count: u64) {}
    fn observe_snapshot_duration(&self, _duration_secs: f64) {}
}

/// A sink for metrics related to the PRRC channel and transport layer.
pub trait TransportMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments the gauge for the current number of connected peers.
    fn inc_connected_peers(&self);
    /// Decrements the gauge for the current number of connected peers.
    fn dec_connected_peers(&self);
    /// Increments a counter for reconnect attempts, labeled by transport kind.
    fn inc_reconnect_attempts(&self, transport_kind: &str);
    /// Increments a counter for messages sent, labeled by transport kind.
    fn inc_messages_sent(&self, transport_kind: &str);
    /// Increments a counter for messages received, labeled by transport kind.
    fn inc_messages_received(&self, transport_kind: &str);
    /// Increments a counter for messages dropped from a full outbound queue.
    fn inc_messages_dropped(&self, transport_kind: &str);
    /// Sets a gauge for the current depth of a transport's outbound queue.
    fn set_queue_depth(&self, transport_kind: &str, depth: u64);
}
impl TransportMetricsSink for NopSink {
    fn inc_connected_peers(&self) {}
    fn dec_connected_peers(&self) {}
    fn inc_reconnect_attempts(&self, _transport_kind: &str) {}
    fn inc_messages_sent(&self, _transport_kind: &str) {}
    fn inc_messages_received(&self, _transport_kind: &str) {}
    fn inc_messages_dropped(&self, _transport_kind: &str) {}
    fn set_queue_depth(&self, _transport_kind: &str, _depth: u64) {}
}

/// A sink for metrics related to the Coherent-Commit voting protocol.
pub trait ProtocolMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments the counter for proposals accepted by this node.
    fn inc_proposals_accepted(&self);
    /// Increments the counter for proposals rejected by this node.
    fn inc_proposals_rejected(&self);
    /// Increments the counter for votes cast by this node.
    fn inc_votes_cast(&self);
    /// Observes the duration of a single commit evaluation (fail-fast check chain plus voting).
    fn observe_commit_duration(&self, duration_secs: f64);
}
impl ProtocolMetricsSink for NopSink {
    fn inc_proposals_accepted(&self) {}
    fn inc_proposals_rejected(&self) {}
    fn inc_votes_cast(&self) {}
    fn observe_commit_duration(&self, _duration_secs: f64) {}
}

/// A sink for recording structured error metrics.
pub trait ErrorMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments a counter for a specific error, categorized by its kind and variant.
    fn inc_error(&self, kind: &'static str, variant: &'static str);
}
impl ErrorMetricsSink for NopSink {
    fn inc_error(&self, _kind: &'static str, _variant: &'static str) {}
}

/// A sink for metrics related to the node's event fan-out (`object_received`,
/// `proposal_accepted`, `sync_started`, and so on).
pub trait NodeMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments a counter for an emitted node event, labeled by event name.
    fn inc_events_emitted(&self, event: &str);
    /// Observes the latency of dispatching a node event to its registered handlers.
    fn observe_event_dispatch_latency(&self, event: &str, duration_secs: f64);
    /// Increments a counter for errors raised by an event handler, labeled by event and reason.
    fn inc_dispatch_error(&self, event: &str, reason: &'static str);
}
impl NodeMetricsSink for NopSink {
    fn inc_events_emitted(&self, _event: &str) {}
    fn observe_event_dispatch_latency(&self, _event: &str, _duration_secs: f64) {}
    fn inc_dispatch_error(&self, _event: &str, _reason: &'static str) {}
}

/// A unified sink that implements all domain-specific traits, providing a single
/// point of implementation for metrics backends like Prometheus.
pub trait MetricsSink:
    GmfMetricsSink + TransportMetricsSink + ProtocolMetricsSink + ErrorMetricsSink + NodeMetricsSink
{
}

// Blanket implementation to allow any type that implements all sub-traits
// to be used as a `MetricsSink`.
impl<T> MetricsSink for T where
    T: GmfMetricsSink + TransportMetricsSink + ProtocolMetricsSink + ErrorMetricsSink + NodeMetricsSink
{
}
