//! # DSN Crypto Crate Lints
//!
//! This crate enforces a strict set of lints to ensure high-quality,
//! panic-free, and well-documented code. Panics are disallowed in non-test
//! code to promote robust error handling.
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::indexing_slicing
    )
)]
//! # DSN Hashing
//!
//! The hash choice for content identity is a network-wide constant (see
//! the specification's design notes): every node must compute the same id
//! for the same term, so this crate pins one algorithm rather than letting
//! each component choose its own.

pub mod algorithms;
pub mod error;

pub use algorithms::hash::{semantic_id_hash, Sha256Hash};
