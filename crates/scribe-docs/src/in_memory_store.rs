use std::collections::HashMap;
use std::sync::RwLock;

use crate::vector_store::{
    BoxFuture, Distance, ScoredVectorPoint, VectorPoint, VectorStore, VectorStoreError,
};

#[derive(Default)]
struct Points {
    dimension: Option<usize>,
    entries: Vec<VectorPoint>,
    positions: HashMap<usize, usize>,
}

/// Exact nearest-neighbour search over every stored point.
pub struct InMemoryVectorStore {
    distance: Distance,
    points: RwLock<Points>,
}

impl InMemoryVectorStore {
    #[must_use]
    pub fn new(distance: Distance) -> Self {
        Self {
            distance,
            points: RwLock::new(Points::default()),
        }
    }

    #[must_use]
    pub fn distance(&self) -> Distance {
        self.distance
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new(Distance::default())
    }
}

impl std::fmt::Debug for InMemoryVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryVectorStore")
            .field("distance", &self.distance)
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl VectorStore for InMemoryVectorStore {
    fn upsert(&self, points: Vec<VectorPoint>) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        Box::pin(async move {
            let mut store = self
                .points
                .write()
                .map_err(|e| VectorStoreError::Upsert(e.to_string()))?;
            for p in points {
                if p.vector.is_empty() {
                    return Err(VectorStoreError::Upsert(format!(
                        "point {} has an empty vector",
                        p.id
                    )));
                }
                let expected = *store.dimension.get_or_insert(p.vector.len());
                if p.vector.len() != expected {
                    return Err(VectorStoreError::Dimension {
                        expected,
                        actual: p.vector.len(),
                    });
                }
                let existing = store.positions.get(&p.id).copied();
                if let Some(pos) = existing {
                    store.entries[pos].vector = p.vector;
                } else {
                    let pos = store.entries.len();
                    store.positions.insert(p.id, pos);
                    store.entries.push(p);
                }
            }
            Ok(())
        })
    }

    fn search(
        &self,
        vector: Vec<f32>,
        limit: usize,
    ) -> BoxFuture<'_, Result<Vec<ScoredVectorPoint>, VectorStoreError>> {
        Box::pin(async move {
            let store = self
                .points
                .read()
                .map_err(|e| VectorStoreError::Search(e.to_string()))?;
            if let Some(expected) = store.dimension
                && vector.len() != expected
            {
                return Err(VectorStoreError::Dimension {
                    expected,
                    actual: vector.len(),
                });
            }

            let mut scored: Vec<ScoredVectorPoint> = store
                .entries
                .iter()
                .map(|p| ScoredVectorPoint {
                    id: p.id,
                    score: self.distance.score(&vector, &p.vector),
                })
                .collect();

            scored.sort_by(|a, b| {
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            scored.truncate(limit);
            Ok(scored)
        })
    }

    fn len(&self) -> usize {
        self.points.read().map_or(0, |p| p.entries.len())
    }

    fn dimension(&self) -> Option<usize> {
        self.points.read().ok().and_then(|p| p.dimension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(id: usize, vector: &[f32]) -> VectorPoint {
        VectorPoint {
            id,
            vector: vector.to_vec(),
        }
    }

    #[tokio::test]
    async fn search_ranks_by_cosine() {
        let store = InMemoryVectorStore::new(Distance::Cosine);
        store
            .upsert(vec![
                point(0, &[0.0, 1.0]),
                point(1, &[1.0, 0.0]),
                point(2, &[0.7, 0.7]),
            ])
            .await
            .unwrap();

        let hits = store.search(vec![1.0, 0.1], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, 1);
        assert_eq!(hits[1].id, 2);
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn search_ranks_by_l2() {
        let store = InMemoryVectorStore::new(Distance::L2);
        store
            .upsert(vec![point(0, &[10.0, 10.0]), point(1, &[1.0, 1.0])])
            .await
            .unwrap();

        let hits = store.search(vec![0.0, 0.0], 5).await.unwrap();
        assert_eq!(hits[0].id, 1);
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn ties_keep_insertion_order() {
        let store = InMemoryVectorStore::default();
        store
            .upsert(vec![point(3, &[1.0, 0.0]), point(1, &[2.0, 0.0])])
            .await
            .unwrap();

        let hits = store.search(vec![1.0, 0.0], 2).await.unwrap();
        assert_eq!(hits[0].id, 3);
        assert_eq!(hits[1].id, 1);
    }

    #[tokio::test]
    async fn mismatched_dimension_rejected_on_upsert() {
        let store = InMemoryVectorStore::default();
        let err = store
            .upsert(vec![point(0, &[1.0, 0.0]), point(1, &[1.0, 0.0, 0.0])])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            VectorStoreError::Dimension {
                expected: 2,
                actual: 3
            }
        ));
    }

    #[tokio::test]
    async fn mismatched_query_dimension_rejected() {
        let store = InMemoryVectorStore::default();
        store.upsert(vec![point(0, &[1.0, 0.0])]).await.unwrap();
        assert!(store.search(vec![1.0], 1).await.is_err());
    }

    #[tokio::test]
    async fn empty_vector_rejected() {
        let store = InMemoryVectorStore::default();
        assert!(store.upsert(vec![point(0, &[])]).await.is_err());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn upsert_replaces_existing_id() {
        let store = InMemoryVectorStore::default();
        store.upsert(vec![point(0, &[1.0, 0.0])]).await.unwrap();
        store.upsert(vec![point(0, &[0.0, 1.0])]).await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.dimension(), Some(2));

        let hits = store.search(vec![0.0, 1.0], 1).await.unwrap();
        assert!((hits[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn search_empty_store_returns_nothing() {
        let store = InMemoryVectorStore::default();
        assert!(store.search(vec![1.0], 3).await.unwrap().is_empty());
    }
}
