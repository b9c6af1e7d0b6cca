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

//! # DSN GMF
//!
//! The Global Memory Field: the accepted-object map with its append-only
//! delta log and snapshot production, similarity search, and the bounded
//! proposal log.

/// The GMF error type.
pub mod error;
/// Similarity search over cached semantic vectors.
pub mod query;
/// The bounded proposal log.
pub mod proposal_log;
/// The Global Memory Field store.
pub mod store;

pub use error::{GmfError, GmfResult};
pub use proposal_log::{ProposalLog, DEFAULT_CAPACITY};
pub use query::{cosine_similarity, query_similar, SimilarityMatch};
pub use store::Gmf;
