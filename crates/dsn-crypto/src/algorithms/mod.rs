//! Cryptographic algorithm implementations.

/// Hash functions, including the network-wide semantic-object id hash.
pub mod hash;
