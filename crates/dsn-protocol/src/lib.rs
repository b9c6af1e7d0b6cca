#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::indexing_slicing
    )
)]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! # DSN Protocol
//!
//! The Coherent-Commit voting protocol: a fail-fast chain of evidence
//! checks (twist-closure, local evidence, kernel evidence, redundancy) and
//! weighted voting with per-voter historical accuracy.

/// The four evidence checks.
pub mod checks;
/// The fail-fast evaluation chain.
pub mod commit;
/// Weighted voting and historical accuracy tracking.
pub mod voting;

pub use checks::{CheckOutcome, LocalEvidence};
pub use commit::{evaluate, CommitInput, CommitOutcome, CommitThresholds};
pub use voting::{voter_weight, weighted_redundancy, AccuracyRecord, VoteHistory, WeightedVote};
