//! The local field: a node's live semantic state — orientation vector,
//! coherence, entropy, trace memory, and specialization.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The dimensionality of every node's semantic orientation vector.
pub const SEMANTIC_VECTOR_DIM: usize = 16;
/// Number of primary axes a node may specialize toward.
pub const PRIMARY_AXES_COUNT: usize = 4;

/// A node's chosen semantic domain, used for routing and vote weighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticDomain {
    /// Sensory/perceptual processing.
    Perceptual,
    /// Abstract/cognitive processing.
    Cognitive,
    /// Time-ordered/sequential processing.
    Temporal,
    /// Reflective/meta-level processing.
    Meta,
}

/// A lightweight record of a remembered object, keyed by object id in
/// [`LocalField::memory`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryTrace {
    /// How strongly this node recalls the object (decays over time; the
    /// decay policy is left to the caller).
    pub strength: f64,
    /// When this trace was last touched.
    pub last_seen: DateTime<Utc>,
}

/// A node's live semantic state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalField {
    /// This node's identifier.
    pub node_id: String,
    /// A unit-length orientation vector in the shared semantic space.
    pub semantic_vector: [f64; SEMANTIC_VECTOR_DIM],
    /// The four vector indices this node specializes toward, derived
    /// deterministically from `node_id`'s first byte.
    pub primary_axes: [usize; PRIMARY_AXES_COUNT],
    /// This node's chosen semantic domain.
    pub semantic_domain: SemanticDomain,
    /// Scalar in `[0, 1]` summarizing local semantic alignment.
    pub coherence: f64,
    /// Non-negative scalar measuring spread of the semantic vector.
    pub entropy: f64,
    /// Remembered objects, keyed by object id.
    pub memory: HashMap<String, MemoryTrace>,
    /// When this field was last mutated.
    pub last_update: DateTime<Utc>,
}

/// Derives the four primary axis indices for a node id: its first byte mod
/// [`PRIMARY_AXES_COUNT`] selects a starting offset within each of the four
/// equal-sized groups that partition the 16-dimensional vector.
pub fn primary_axes_for(node_id: &str) -> [usize; PRIMARY_AXES_COUNT] {
    let first_byte = node_id.as_bytes().first().copied().unwrap_or(0);
    let group_size = SEMANTIC_VECTOR_DIM / PRIMARY_AXES_COUNT;
    let offset = (first_byte as usize) % PRIMARY_AXES_COUNT;
    let mut axes = [0usize; PRIMARY_AXES_COUNT];
    for (i, axis) in axes.iter_mut().enumerate() {
        *axis = offset + i * group_size;
    }
    axes
}

fn normalize(v: &mut [f64; SEMANTIC_VECTOR_DIM]) {
    let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm > f64::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

impl LocalField {
    /// Builds a fresh local field for `node_id` with a random unit-length
    /// semantic vector and neutral coherence/entropy.
    pub fn new(node_id: impl Into<String>, semantic_domain: SemanticDomain) -> Self {
        let node_id = node_id.into();
        let mut rng = rand::thread_rng();
        let mut vector = [0.0f64; SEMANTIC_VECTOR_DIM];
        for x in vector.iter_mut() {
            *x = rng.gen_range(-1.0..1.0);
        }
        normalize(&mut vector);
        Self {
            primary_axes: primary_axes_for(&node_id),
            semantic_vector: vector,
            semantic_domain,
            coherence: 0.8,
            entropy: 1.0,
            memory: HashMap::new(),
            last_update: Utc::now(),
            node_id,
        }
    }

    /// Builds a local field specialized toward its primary axes: those
    /// components receive weight `strength`, the rest `1 - strength` with
    /// random signs, then the whole vector is renormalized.
    pub fn with_specialization(
        node_id: impl Into<String>,
        semantic_domain: SemanticDomain,
        strength: f64,
    ) -> Self {
        let mut field = Self::new(node_id, semantic_domain);
        field.specialize(strength);
        field
    }

    /// Biases this field's vector toward its primary axes in place.
    pub fn specialize(&mut self, strength: f64) {
        let strength = strength.clamp(0.0, 1.0);
        let mut rng = rand::thread_rng();
        let mut vector = [0.0f64; SEMANTIC_VECTOR_DIM];
        for (i, x) in vector.iter_mut().enumerate() {
            let sign: f64 = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
            *x = if self.primary_axes.contains(&i) {
                strength * sign
            } else {
                (1.0 - strength) * sign
            };
        }
        normalize(&mut vector);
        self.semantic_vector = vector;
        self.last_update = Utc::now();
    }

    /// Records or refreshes a memory trace for `object_id`.
    pub fn remember(&mut self, object_id: impl Into<String>, strength: f64) {
        self.memory.insert(
            object_id.into(),
            MemoryTrace {
                strength,
                last_seen: Utc::now(),
            },
        );
        self.last_update = Utc::now();
    }

    /// Sets coherence, clamped to `[0, 1]`.
    pub fn set_coherence(&mut self, coherence: f64) {
        self.coherence = coherence.clamp(0.0, 1.0);
        self.last_update = Utc::now();
    }

    /// Sets entropy, clamped to be non-negative.
    pub fn set_entropy(&mut self, entropy: f64) {
        self.entropy = entropy.max(0.0);
        self.last_update = Utc::now();
    }

    /// Cosine similarity between this field's vector and another.
    pub fn cosine_similarity(&self, other: &[f64; SEMANTIC_VECTOR_DIM]) -> f64 {
        let dot: f64 = self
            .semantic_vector
            .iter()
            .zip(other.iter())
            .map(|(a, b)| a * b)
            .sum();
        let norm_a = self.semantic_vector.iter().map(|x| x * x).sum::<f64>().sqrt();
        let norm_b = other.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm_a < f64::EPSILON || norm_b < f64::EPSILON {
            0.0
        } else {
            dot / (norm_a * norm_b)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn semantic_vector_is_unit_length() {
        let field = LocalField::new("node-a", SemanticDomain::Cognitive);
        let norm: f64 = field
            .semantic_vector
            .iter()
            .map(|x| x * x)
            .sum::<f64>()
            .sqrt();
        assert!((norm - 1.0).abs() < 1e-9);
    }

    #[test]
    fn primary_axes_are_deterministic_per_node_id() {
        assert_eq!(primary_axes_for("abc"), primary_axes_for("abc"));
    }

    #[test]
    fn specialization_keeps_vector_normalized() {
        let mut field = LocalField::new("node-a", SemanticDomain::Perceptual);
        field.specialize(0.9);
        let norm: f64 = field
            .semantic_vector
            .iter()
            .map(|x| x * x)
            .sum::<f64>()
            .sqrt();
        assert!((norm - 1.0).abs() < 1e-9);
    }

    #[test]
    fn coherence_and_entropy_clamp() {
        let mut field = LocalField::new("node-a", SemanticDomain::Temporal);
        field.set_coherence(5.0);
        assert_eq!(field.coherence, 1.0);
        field.set_entropy(-3.0);
        assert_eq!(field.entropy, 0.0);
    }
}
