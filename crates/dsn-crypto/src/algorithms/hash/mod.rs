//! Cryptographic hash functions, built on `sha2`.

use sha2::{Digest, Sha256};

/// A hash function implementation.
pub trait HashFunction {
    /// Hashes a message and returns the digest.
    fn hash(&self, message: &[u8]) -> Vec<u8>;

    /// The digest size in bytes.
    fn digest_size(&self) -> usize;

    /// The name of the hash function.
    fn name(&self) -> &'static str;
}

/// SHA-256, the network-wide hash for content identity.
#[derive(Default, Clone, Copy)]
pub struct Sha256Hash;

impl HashFunction for Sha256Hash {
    fn hash(&self, message: &[u8]) -> Vec<u8> {
        Sha256::digest(message).to_vec()
    }

    fn digest_size(&self) -> usize {
        32
    }

    fn name(&self) -> &'static str {
        "SHA-256"
    }
}

/// Computes the network-wide semantic-object id for a term's signature.
///
/// The specification leaves the hash choice as an open question and notes
/// that a correct implementation should pin a specific algorithm rather than
/// the source's weak 32-bit rolling hash. This pins SHA-256 of the UTF-8
/// signature, truncated to 128 bits, hex-encoded with an `Ω` prefix — fixed
/// network-wide so every node derives the same id for the same term.
pub fn semantic_id_hash(signature: &str) -> String {
    let digest = Sha256Hash.hash(signature.as_bytes());
    let truncated = &digest[..16.min(digest.len())];
    format!("Ω{}", hex::encode(truncated))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn semantic_id_is_deterministic() {
        assert_eq!(semantic_id_hash("N19"), semantic_id_hash("N19"));
    }

    #[test]
    fn semantic_id_differs_for_distinct_signatures() {
        assert_ne!(semantic_id_hash("N19"), semantic_id_hash("N23"));
    }

    #[test]
    fn semantic_id_carries_the_omega_prefix() {
        assert!(semantic_id_hash("N19").starts_with('\u{3a9}'));
    }
}
