//! Similarity search over GMF entries whose metadata carries a cached
//! semantic vector.

use crate::store::Gmf;
use serde_json::Value;

const SEMANTIC_VECTOR_KEY: &str = "semanticVector";

/// Cosine similarity between two equal-length vectors. Returns `0.0` if
/// either vector has zero magnitude or the lengths differ.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn extract_vector(metadata_value: &Value) -> Option<Vec<f64>> {
    metadata_value
        .as_array()?
        .iter()
        .map(Value::as_f64)
        .collect()
}

/// A single similarity match.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatch {
    /// The matching entry's id.
    pub id: String,
    /// Its cosine similarity against the query vector.
    pub coherence: f64,
}

/// Scans every entry whose metadata carries a `semanticVector`, computes
/// its cosine similarity against `query_vector`, and returns the top
/// `max_results` matches above `threshold`, sorted by descending
/// similarity.
pub fn query_similar(
    gmf: &Gmf,
    query_vector: &[f64],
    threshold: f64,
    max_results: usize,
) -> Vec<SimilarityMatch> {
    let mut matches: Vec<SimilarityMatch> = gmf
        .entries_snapshot()
        .into_iter()
        .filter_map(|entry| {
            let vector = extract_vector(entry.metadata.get(SEMANTIC_VECTOR_KEY)?)?;
            let coherence = cosine_similarity(query_vector, &vector);
            (coherence >= threshold).then_some(SimilarityMatch {
                id: entry.object.id.clone(),
                coherence,
            })
        })
        .collect();

    matches.sort_by(|a, b| b.coherence.partial_cmp(&a.coherence).unwrap_or(std::cmp::Ordering::Equal));
    matches.truncate(max_results);
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsn_types::semantic_object::SemanticObject;
    use dsn_types::term::Term;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn identical_vectors_have_similarity_one() {
        let v = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn orthogonal_vectors_have_similarity_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn query_similar_filters_by_threshold_and_sorts() {
        let gmf = Gmf::new(1000);

        let mut meta_close = BTreeMap::new();
        meta_close.insert(SEMANTIC_VECTOR_KEY.to_string(), json!([1.0, 0.0]));
        gmf.insert(
            SemanticObject::new(Term::noun(23).unwrap(), BTreeMap::new()),
            1.0,
            meta_close,
        );

        let mut meta_far = BTreeMap::new();
        meta_far.insert(SEMANTIC_VECTOR_KEY.to_string(), json!([0.0, 1.0]));
        gmf.insert(
            SemanticObject::new(Term::noun(29).unwrap(), BTreeMap::new()),
            1.0,
            meta_far,
        );

        let results = query_similar(&gmf, &[1.0, 0.0], 0.5, 10);
        assert_eq!(results.len(), 1);
        assert!(results[0].coherence > 0.99);
    }
}
