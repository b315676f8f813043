use crate::distance::DistanceMetric;
use crate::error::Result;
use super::{SearchParams, SearchResult};

/// Core trait for vector index implementations.
pub trait VectorIndex: Send + Sync {
    /// Insert a vector with the given label, replacing any previous vector.
    fn insert(&self, label: i64, vector: &[f32]) -> Result<()>;

    /// Batch insert vectors.
    fn insert_batch(&self, labels: &[i64], vectors: &[Vec<f32>]) -> Result<()> {
        for (label, vec) in labels.iter().zip(vectors.iter()) {
            self.insert(*label, vec)?;
        }
        Ok(())
    }

    /// Delete a vector by label. Unknown labels are ignored.
    fn delete(&self, label: i64);

    fn contains(&self, label: i64) -> bool;

    /// All labels currently held.
    fn labels(&self) -> Vec<i64>;

    /// Top-k nearest vectors among labels accepted by `accept`.
    ///
    /// The predicate runs during the scan, so `top_k` is filled from the
    /// accepted subset rather than trimmed afterwards.
    fn search(
        &self,
        query: &[f32],
        top_k: usize,
        params: &SearchParams,
        accept: &dyn Fn(i64) -> bool,
    ) -> Result<SearchResult>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn dimension(&self) -> usize;

    fn metric(&self) -> DistanceMetric;
}
