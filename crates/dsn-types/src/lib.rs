#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! # DSN Types
//!
//! This crate is the foundational library for the Distributed Sentience
//! Network core, containing the Prime Calculus data model, the wire-level
//! data structures shared by every other crate, and the unified error and
//! configuration types.
//!
//! ## Architectural Role
//!
//! As the base crate, `dsn-types` has minimal dependencies and is itself a
//! dependency for almost every other crate in the workspace. This structure
//! prevents circular dependencies and provides a stable, canonical definition
//! for shared types like `Term`, `SemanticObject`, `Proposal`, and the core
//! error enum.

/// A top-level, crate-wide `Result` type alias with a default error type.
pub type Result<T, E = crate::error::DsnError> = std::result::Result<T, E>;

/// Shared configuration knobs (`coherenceThreshold`, `votingQuorum`, ...).
pub mod config;
/// The unified error type used across the core.
pub mod error;
/// The local field: a node's live semantic state.
pub mod field;
/// The Global Memory Field's entry, delta, and snapshot types.
pub mod gmf;
/// A prelude containing the most commonly used types.
pub mod prelude;
/// `Proposal`, its lifecycle, and vote bookkeeping.
pub mod proposal;
/// `SemanticObject`: a term plus stable identity and metadata.
pub mod semantic_object;
/// The Prime Calculus term algebra and its invariants.
pub mod term;
/// Peer expertise profiles used by routing and weighted voting.
pub mod expertise;
/// The wire-level message envelopes exchanged between nodes.
pub mod wire;
