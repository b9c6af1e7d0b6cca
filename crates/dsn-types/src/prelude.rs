//! A curated set of commonly used traits and types.

pub use crate::config::DsnConfig;
pub use crate::error::{DsnError, ErrorCode};
pub use crate::expertise::ExpertiseProfile;
pub use crate::field::{LocalField, SemanticDomain};
pub use crate::gmf::{DeltaKind, DeltaRecord, GmfEntry, SnapshotEntrySummary, SnapshotHeader};
pub use crate::proposal::{Proposal, ProposalStatus, Vote};
pub use crate::semantic_object::{ObjectEnvelope, ObjectPayload, SemanticObject};
pub use crate::term::Term;
pub use crate::wire::WireMessage;

/// An extension trait for `Option` that provides a convenient `required` method
/// to convert an `Option` to a `Result` with a specific error.
pub trait OptionExt<T> {
    /// Converts an `Option<T>` to a `Result<T, E>`, returning the provided
    /// error if the option is `None`.
    fn required<E>(self, err: E) -> Result<T, E>;
}

impl<T> OptionExt<T> for Option<T> {
    fn required<E>(self, err: E) -> Result<T, E> {
        self.ok_or(err)
    }
}
