//! Core error types for the Distributed Sentience Network.

use thiserror::Error;

/// A trait for assigning a stable, machine-readable string code to an error.
///
/// Consumers (telemetry, `error` events on the channel and transports) key
/// off this instead of matching on error message text.
pub trait ErrorCode {
    /// Returns the unique, stable string identifier for this error variant.
    fn code(&self) -> &'static str;
}

/// Errors from constructing or reducing Prime Calculus terms.
#[derive(Debug, Error)]
pub enum TermError {
    /// A term constructor rejected its inputs (non-prime, bad ordering, ...).
    #[error("ill-formed term: {0}")]
    IllFormed(String),
    /// The evaluator exhausted its step budget before reaching a normal form.
    #[error("evaluator exceeded max steps ({0})")]
    BudgetExceeded(usize),
}

impl ErrorCode for TermError {
    fn code(&self) -> &'static str {
        match self {
            Self::IllFormed(_) => "ILL_FORMED_TERM",
            Self::BudgetExceeded(_) => "EVALUATOR_BUDGET_EXCEEDED",
        }
    }
}

/// The single unified error type for the DSN core, mirroring the error
/// kinds enumerated in the specification's error handling design.
#[derive(Debug, Error)]
pub enum DsnError {
    /// A term constructor rejected its inputs.
    #[error("ill-formed term: {0}")]
    IllFormedTerm(String),
    /// The evaluator exhausted its step budget.
    #[error("evaluator budget exceeded after {0} steps")]
    EvaluatorBudgetExceeded(usize),
    /// A claimed normal form did not match the recomputed one.
    #[error("normal form mismatch: claimed {claimed}, computed {computed}")]
    NormalFormMismatch {
        /// The signature the proposer claimed.
        claimed: String,
        /// The signature actually computed by this node.
        computed: String,
    },
    /// The twist-closure fast filter rejected the proposal's encoded packet.
    #[error("twist closure check failed: {0}")]
    TwistClosureFailed(String),
    /// A local-evidence check (coherence, entropy band, fidelity) failed.
    #[error("local evidence check failed: {subreason}")]
    LocalEvidenceFailed {
        /// Which local-evidence sub-check failed.
        subreason: String,
    },
    /// The (possibly weighted) redundancy score fell below the threshold.
    #[error("redundancy score insufficient")]
    RedundancyInsufficient,
    /// An operation targeted a peer that is not connected.
    #[error("peer not connected: {0}")]
    PeerNotConnected(String),
    /// A send was attempted on a transport that is not ready and queuing was disabled.
    #[error("transport not ready")]
    TransportNotReady,
    /// The underlying transport failed to deliver a message.
    #[error("transport send failed: {0}")]
    TransportSendFailed(String),
    /// An operation was attempted on a disconnected memory broker.
    #[error("broker not connected")]
    BrokerNotConnected,
    /// The requested key was not present (or had expired) in the broker.
    #[error("key missing: {0}")]
    KeyMissing(String),
    /// A GMF snapshot failed verification against its recorded header.
    #[error("snapshot verification failed: {0}")]
    SnapshotVerificationFailed(String),
    /// A wire message or persisted record failed to deserialize.
    #[error("deserialization error: {0}")]
    DeserializationError(String),
    /// A transport exhausted its reconnect attempts and settled into `Closed`.
    #[error("reconnect attempts exceeded")]
    ReconnectExceeded,
}

impl ErrorCode for DsnError {
    fn code(&self) -> &'static str {
        match self {
            Self::IllFormedTerm(_) => "ILL_FORMED_TERM",
            Self::EvaluatorBudgetExceeded(_) => "EVALUATOR_BUDGET_EXCEEDED",
            Self::NormalFormMismatch { .. } => "NORMAL_FORM_MISMATCH",
            Self::TwistClosureFailed(_) => "TWIST_CLOSURE_FAILED",
            Self::LocalEvidenceFailed { .. } => "LOCAL_EVIDENCE_FAILED",
            Self::RedundancyInsufficient => "REDUNDANCY_INSUFFICIENT",
            Self::PeerNotConnected(_) => "PEER_NOT_CONNECTED",
            Self::TransportNotReady => "TRANSPORT_NOT_READY",
            Self::TransportSendFailed(_) => "TRANSPORT_SEND_FAILED",
            Self::BrokerNotConnected => "BROKER_NOT_CONNECTED",
            Self::KeyMissing(_) => "KEY_MISSING",
            Self::SnapshotVerificationFailed(_) => "SNAPSHOT_VERIFICATION_FAILED",
            Self::DeserializationError(_) => "DESERIALIZATION_ERROR",
            Self::ReconnectExceeded => "RECONNECT_EXCEEDED",
        }
    }
}

impl From<TermError> for DsnError {
    fn from(e: TermError) -> Self {
        match e {
            TermError::IllFormed(s) => DsnError::IllFormedTerm(s),
            TermError::BudgetExceeded(n) => DsnError::EvaluatorBudgetExceeded(n),
        }
    }
}

impl From<serde_json::Error> for DsnError {
    fn from(e: serde_json::Error) -> Self {
        DsnError::DeserializationError(e.to_string())
    }
}
