//! A concrete implementation of the metrics sinks using the Prometheus crate.

use crate::sinks::*;
use once_cell::sync::OnceCell;
use prometheus::{
    exponential_buckets, register_gauge, register_gauge_vec, register_histogram_vec,
    register_int_counter, register_int_counter_vec, Gauge, GaugeVec, HistogramVec, IntCounter,
    IntCounterVec,
};

// --- Metric Statics ---
// We use OnceCell to hold the metric collectors. They will be initialized
// exactly once by the `install` function.

static GMF_ENTRY_COUNT: OnceCell<Gauge> = OnceCell::new();
static GMF_ENTRIES_INSERTED_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static GMF_DELTAS_APPLIED_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static GMF_SNAPSHOT_DURATION_SECONDS: OnceCell<HistogramVec> = OnceCell::new();

static TRANSPORT_CONNECTED_PEERS: OnceCell<Gauge> = OnceCell::new();
static TRANSPORT_RECONNECT_ATTEMPTS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static TRANSPORT_MESSAGES_SENT_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static TRANSPORT_MESSAGES_RECEIVED_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static TRANSPORT_MESSAGES_DROPPED_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static TRANSPORT_QUEUE_DEPTH: OnceCell<GaugeVec> = OnceCell::new();

static PROTOCOL_PROPOSALS_ACCEPTED_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static PROTOCOL_PROPOSALS_REJECTED_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static PROTOCOL_VOTES_CAST_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static PROTOCOL_COMMIT_DURATION_SECONDS: OnceCell<HistogramVec> = OnceCell::new();

static ERRORS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();

static NODE_EVENTS_EMITTED_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static NODE_EVENT_DISPATCH_LATENCY_SECONDS: OnceCell<HistogramVec> = OnceCell::new();
static NODE_DISPATCH_ERRORS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();

/// The Prometheus-backed implementation of [`MetricsSink`].
#[derive(Debug, Clone, Copy)]
pub struct PrometheusSink;

/// Helper macro to reduce boilerplate for getting a metric from OnceCell.
/// This will panic if `install()` has not been called, which is intentional
/// as it indicates a critical application setup error.
macro_rules! get_metric {
    ($metric:ident) => {
        $metric
            .get()
            .expect("Prometheus sink not initialized. Call telemetry::prometheus::install() first.")
    };
}

impl GmfMetricsSink for PrometheusSink {
    fn inc_entries_inserted(&self, count: u64) {
        get_metric!(GMF_ENTRIES_INSERTED_TOTAL).inc_by(count);
    }
    fn inc_deltas_applied(&self, count: u64) {
        get_metric!(GMF_DELTAS_APPLIED_TOTAL).inc_by(count);
    }
    fn set_entry_count(&self, count: u64) {
        get_metric!(GMF_ENTRY_COUNT).set(count as f64);
    }
    fn observe_snapshot_duration(&self, duration_secs: f64) {
        get_metric!(GMF_SNAPSHOT_DURATION_SECONDS)
            .with_label_values(&["snapshot"])
            .observe(duration_secs);
    }
}

impl TransportMetricsSink for PrometheusSink {
    fn inc_connected_peers(&self) {
        get_metric!(TRANSPORT_CONNECTED_PEERS).inc();
    }
    fn dec_connected_peers(&self) {
        get_metric!(TRANSPORT_CONNECTED_PEERS).dec();
    }
    fn inc_reconnect_attempts(&self, transport_kind: &str) {
        get_metric!(TRANSPORT_RECONNECT_ATTEMPTS_TOTAL)
            .with_label_values(&[transport_kind])
            .inc();
    }
    fn inc_messages_sent(&self, transport_kind: &str) {
        get_metric!(TRANSPORT_MESSAGES_SENT_TOTAL)
            .with_label_values(&[transport_kind])
            .inc();
    }
    fn inc_messages_received(&self, transport_kind: &str) {
        get_metric!(TRANSPORT_MESSAGES_RECEIVED_TOTAL)
            .with_label_values(&[transport_kind])
            .inc();
    }
    fn inc_messages_dropped(&self, transport_kind: &str) {
        get_metric!(TRANSPORT_MESSAGES_DROPPED_TOTAL)
            .with_label_values(&[transport_kind])
            .inc();
    }
    fn set_queue_depth(&self, transport_kind: &str, depth: u64) {
        get_metric!(TRANSPORT_QUEUE_DEPTH)
            .with_label_values(&[transport_kind])
            .set(depth as f64);
    }
}

impl ProtocolMetricsSink for PrometheusSink {
    fn inc_proposals_accepted(&self) {
        get_metric!(PROTOCOL_PROPOSALS_ACCEPTED_TOTAL).inc();
    }
    fn inc_proposals_rejected(&self) {
        get_metric!(PROTOCOL_PROPOSALS_REJECTED_TOTAL).inc();
    }
    fn inc_votes_cast(&self) {
        get_metric!(PROTOCOL_VOTES_CAST_TOTAL).inc();
    }
    fn observe_commit_duration(&self, duration_secs: f64) {
        get_metric!(PROTOCOL_COMMIT_DURATION_SECONDS)
            .with_label_values(&["commit"])
            .observe(duration_secs);
    }
}

impl ErrorMetricsSink for PrometheusSink {
    fn inc_error(&self, kind: &'static str, variant: &'static str) {
        get_metric!(ERRORS_TOTAL)
            .with_label_values(&[kind, variant])
            .inc();
    }
}

impl NodeMetricsSink for PrometheusSink {
    fn inc_events_emitted(&self, event: &str) {
        get_metric!(NODE_EVENTS_EMITTED_TOTAL)
            .with_label_values(&[event])
            .inc();
    }
    fn observe_event_dispatch_latency(&self, event: &str, duration_secs: f64) {
        get_metric!(NODE_EVENT_DISPATCH_LATENCY_SECONDS)
            .with_label_values(&[event])
            .observe(duration_secs);
    }
    fn inc_dispatch_error(&self, event: &str, reason: &'static str) {
        get_metric!(NODE_DISPATCH_ERRORS_TOTAL)
            .with_label_values(&[event, reason])
            .inc();
    }
}

/// Initializes all Prometheus metrics collectors and returns a static reference to the sink.
/// This function must be called only once at application startup.
#[allow(clippy::expect_used)]
pub fn install() -> Result<&'static dyn MetricsSink, prometheus::Error> {
    GMF_ENTRY_COUNT
        .set(register_gauge!(
            "dsn_gmf_entry_count",
            "Current number of entries held in the Global Memory Field."
        )?)
        .expect("static already initialized");
    GMF_ENTRIES_INSERTED_TOTAL
        .set(register_int_counter!(
            "dsn_gmf_entries_inserted_total",
            "Total objects inserted into the Global Memory Field."
        )?)
        .expect("static already initialized");
    GMF_DELTAS_APPLIED_TOTAL
        .set(register_int_counter!(
            "dsn_gmf_deltas_applied_total",
            "Total deltas applied to the Global Memory Field during a resync."
        )?)
        .expect("static already initialized");
    GMF_SNAPSHOT_DURATION_SECONDS
        .set(register_histogram_vec!(
            "dsn_gmf_snapshot_duration_seconds",
            "Latency of producing a Global Memory Field snapshot.",
            &["operation"],
            exponential_buckets(0.0005, 2.0, 15)?
        )?)
        .expect("static already initialized");
    TRANSPORT_CONNECTED_PEERS
        .set(register_gauge!(
            "dsn_transport_connected_peers",
            "Current number of connected peers across all transports."
        )?)
        .expect("static already initialized");
    TRANSPORT_RECONNECT_ATTEMPTS_TOTAL
        .set(register_int_counter_vec!(
            "dsn_transport_reconnect_attempts_total",
            "Total reconnect attempts, labeled by transport kind.",
            &["transport"]
        )?)
        .expect("static already initialized");
    TRANSPORT_MESSAGES_SENT_TOTAL
        .set(register_int_counter_vec!(
            "dsn_transport_messages_sent_total",
            "Total messages sent, labeled by transport kind.",
            &["transport"]
        )?)
        .expect("static already initialized");
    TRANSPORT_MESSAGES_RECEIVED_TOTAL
        .set(register_int_counter_vec!(
            "dsn_transport_messages_received_total",
            "Total messages received, labeled by transport kind.",
            &["transport"]
        )?)
        .expect("static already initialized");
    TRANSPORT_MESSAGES_DROPPED_TOTAL
        .set(register_int_counter_vec!(
            "dsn_transport_messages_dropped_total",
            "Total messages dropped from a full outbound queue, labeled by transport kind.",
            &["transport"]
        )?)
        .expect("static already initialized");
    TRANSPORT_QUEUE_DEPTH
        .set(register_gauge_vec!(
            "dsn_transport_queue_depth",
            "Current depth of a transport's outbound queue.",
            &["transport"]
        )?)
        .expect("static already initialized");
    PROTOCOL_PROPOSALS_ACCEPTED_TOTAL
        .set(register_int_counter!(
            "dsn_protocol_proposals_accepted_total",
            "Total proposals accepted by the Coherent-Commit protocol."
        )?)
        .expect("static already initialized");
    PROTOCOL_PROPOSALS_REJECTED_TOTAL
        .set(register_int_counter!(
            "dsn_protocol_proposals_rejected_total",
            "Total proposals rejected by the Coherent-Commit protocol."
        )?)
        .expect("static already initialized");
    PROTOCOL_VOTES_CAST_TOTAL
        .set(register_int_counter!(
            "dsn_protocol_votes_cast_total",
            "Total votes cast by this node."
        )?)
        .expect("static already initialized");
    PROTOCOL_COMMIT_DURATION_SECONDS
        .set(register_histogram_vec!(
            "dsn_protocol_commit_duration_seconds",
            "Latency of a single commit evaluation.",
            &["operation"],
            exponential_buckets(0.0005, 2.0, 15)?
        )?)
        .expect("static already initialized");
    ERRORS_TOTAL
        .set(register_int_counter_vec!(
            "dsn_errors_total",
            "Total number of errors, categorized by type and variant.",
            &["kind", "variant"]
        )?)
        .expect("static already initialized");
    NODE_EVENTS_EMITTED_TOTAL
        .set(register_int_counter_vec!(
            "dsn_node_events_emitted_total",
            "Total node events emitted, labeled by event name.",
            &["event"]
        )?)
        .expect("static already initialized");
    NODE_EVENT_DISPATCH_LATENCY_SECONDS
        .set(register_histogram_vec!(
            "dsn_node_event_dispatch_latency_seconds",
            "Latency of dispatching a node event to its registered handlers.",
            &["event"],
            exponential_buckets(0.0001, 2.0, 16)?
        )?)
        .expect("static already initialized");
    NODE_DISPATCH_ERRORS_TOTAL
        .set(register_int_counter_vec!(
            "dsn_node_dispatch_errors_total",
            "Total errors raised by a node event handler.",
            &["event", "reason"]
        )?)
        .expect("static already initialized");

    static SINK: PrometheusSink = PrometheusSink;
    Ok(&SINK)
}
