#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! # DSN Calculus
//!
//! The Prime Calculus evaluator and verifier: normal-form reduction,
//! normal-form agreement checking, and the two-stage proposal verifier.
//!
//! Determinism is the whole point of this crate: [`evaluate`] is a total,
//! side-effect-free function of its input term and step budget alone. No
//! wall-clock, no randomness, no locale-sensitive formatting.

pub mod evaluator;
pub mod verify;

pub use evaluator::{evaluate, DEFAULT_MAX_EVAL_STEPS};
pub use verify::{verify, verify_normal_form, NormalFormCheck, VerifyInput, VerifyOutcome};
