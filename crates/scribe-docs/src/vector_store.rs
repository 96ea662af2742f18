use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum VectorStoreError {
    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    Dimension { expected: usize, actual: usize },
    #[error("upsert error: {0}")]
    Upsert(String),
    #[error("search error: {0}")]
    Search(String),
}

/// How query and chunk embeddings are compared. Higher scores rank first
/// under both metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Distance {
    /// Cosine similarity.
    #[default]
    Cosine,
    /// Negated Euclidean distance.
    L2,
}

impl Distance {
    #[must_use]
    pub fn score(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Self::Cosine => cosine_similarity(a, b),
            Self::L2 => -euclidean_distance(a, b),
        }
    }
}

/// A chunk embedding keyed by the chunk's position in the index.
#[derive(Debug, Clone)]
pub struct VectorPoint {
    pub id: usize,
    pub vector: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredVectorPoint {
    pub id: usize,
    pub score: f32,
}

pub(crate) type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait VectorStore: Send + Sync {
    fn upsert(&self, points: Vec<VectorPoint>) -> BoxFuture<'_, Result<(), VectorStoreError>>;

    /// Top `limit` points by descending score. Ties keep insertion order.
    fn search(
        &self,
        vector: Vec<f32>,
        limit: usize,
    ) -> BoxFuture<'_, Result<Vec<ScoredVectorPoint>, VectorStoreError>>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Embedding dimension, once the first point has been stored.
    fn dimension(&self) -> Option<usize>;
}

#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[must_use]
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_identical_is_one() {
        let v = [0.3, 0.4, 0.5];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_orthogonal_is_zero() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
    }

    #[test]
    fn cosine_zero_vector_is_zero() {
        assert!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]).abs() < f32::EPSILON);
    }

    #[test]
    fn l2_score_prefers_closer_points() {
        let q = [0.0, 0.0];
        assert!(Distance::L2.score(&q, &[1.0, 0.0]) > Distance::L2.score(&q, &[3.0, 4.0]));
        assert!((Distance::L2.score(&q, &[3.0, 4.0]) + 5.0).abs() < 1e-6);
    }

    #[test]
    fn distance_deserializes_lowercase() {
        let d: Distance = serde_json::from_str("\"l2\"").unwrap();
        assert_eq!(d, Distance::L2);
        let d: Distance = serde_json::from_str("\"cosine\"").unwrap();
        assert_eq!(d, Distance::Cosine);
    }
}
