use std::collections::HashMap;
use parking_lot::RwLock;
use crate::distance::DistanceMetric;
use crate::error::{Result, VectorDbError};
use super::{SearchParams, SearchResult, TopK, traits::VectorIndex};

/// Brute-force (flat) vector index.
/// Exact nearest-neighbor search by scanning all vectors.
pub struct FlatIndex {
    dimension: usize,
    metric: DistanceMetric,
    inner: RwLock<FlatInner>,
}

#[derive(Default)]
struct FlatInner {
    labels: Vec<i64>,
    vectors: Vec<Vec<f32>>,
    label_to_idx: HashMap<i64, usize>,
}

impl FlatIndex {
    pub fn new(dimension: usize, metric: DistanceMetric) -> Self {
        Self {
            dimension,
            metric,
            inner: RwLock::new(FlatInner::default()),
        }
    }

    /// Create with pre-allocated capacity.
    pub fn with_capacity(dimension: usize, metric: DistanceMetric, capacity: usize) -> Self {
        Self {
            dimension,
            metric,
            inner: RwLock::new(FlatInner {
                labels: Vec::with_capacity(capacity),
                vectors: Vec::with_capacity(capacity),
                label_to_idx: HashMap::with_capacity(capacity),
            }),
        }
    }
}

impl VectorIndex for FlatIndex {
    fn insert(&self, label: i64, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(VectorDbError::DimensionMismatch {
                expected: self.dimension,
                got: vector.len(),
            });
        }
        let mut inner = self.inner.write();
        if let Some(&idx) = inner.label_to_idx.get(&label) {
            inner.vectors[idx] = vector.to_vec();
        } else {
            let idx = inner.labels.len();
            inner.labels.push(label);
            inner.vectors.push(vector.to_vec());
            inner.label_to_idx.insert(label, idx);
        }
        Ok(())
    }

    fn delete(&self, label: i64) {
        let mut inner = self.inner.write();
        if let Some(idx) = inner.label_to_idx.remove(&label) {
            // Swap-remove for O(1) deletion
            let last = inner.labels.len() - 1;
            if idx != last {
                let moved_label = inner.labels[last];
                inner.labels.swap(idx, last);
                inner.vectors.swap(idx, last);
                inner.label_to_idx.insert(moved_label, idx);
            }
            inner.labels.pop();
            inner.vectors.pop();
        }
    }

    fn contains(&self, label: i64) -> bool {
        self.inner.read().label_to_idx.contains_key(&label)
    }

    fn labels(&self) -> Vec<i64> {
        self.inner.read().labels.clone()
    }

    fn search(
        &self,
        query: &[f32],
        top_k: usize,
        _params: &SearchParams,
        accept: &dyn Fn(i64) -> bool,
    ) -> Result<SearchResult> {
        if query.len() != self.dimension {
            return Err(VectorDbError::DimensionMismatch {
                expected: self.dimension,
                got: query.len(),
            });
        }
        let inner = self.inner.read();
        let mut top = TopK::new(top_k);
        for (&label, vec) in inner.labels.iter().zip(inner.vectors.iter()) {
            if accept(label) {
                top.push(label, self.metric.distance(query, vec));
            }
        }
        Ok(top.into_result())
    }

    fn len(&self) -> usize {
        self.inner.read().labels.len()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn metric(&self) -> DistanceMetric {
        self.metric
    }
}
