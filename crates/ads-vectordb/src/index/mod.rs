//! Vector index implementations: Flat (brute-force) and IVF_FLAT.

mod flat;
mod ivf;
mod traits;

use std::collections::BinaryHeap;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::distance::DistanceMetric;

pub use flat::FlatIndex;
pub use ivf::IvfFlatIndex;
pub use traits::VectorIndex;

/// Search result: (label, distance) pairs sorted by ascending distance.
#[derive(Debug, Clone, Default)]
pub struct SearchResult {
    pub ids: Vec<i64>,
    pub distances: Vec<f32>,
}

impl SearchResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Index kind and build-time parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "index_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndexParams {
    Flat { metric: DistanceMetric },
    IvfFlat { metric: DistanceMetric, nlist: usize },
}

impl IndexParams {
    pub fn ivf_flat(metric: DistanceMetric, nlist: usize) -> Self {
        Self::IvfFlat { metric, nlist }
    }

    pub fn metric(&self) -> DistanceMetric {
        match *self {
            Self::Flat { metric } | Self::IvfFlat { metric, .. } => metric,
        }
    }

    /// Partition count declared at build time; 1 for flat.
    pub fn nlist(&self) -> usize {
        match *self {
            Self::Flat { .. } => 1,
            Self::IvfFlat { nlist, .. } => nlist,
        }
    }
}

/// Query-time parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchParams {
    /// Partitions scanned per query.
    pub nprobe: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self { nprobe: 1 }
    }
}

/// Keeps the `k` smallest (distance, label) pairs. Ties break on label.
pub(crate) struct TopK {
    k: usize,
    heap: BinaryHeap<(OrderedFloat<f32>, i64)>,
}

impl TopK {
    pub(crate) fn new(k: usize) -> Self {
        Self { k, heap: BinaryHeap::new() }
    }

    pub(crate) fn push(&mut self, label: i64, distance: f32) {
        if self.k == 0 {
            return;
        }
        self.heap.push((OrderedFloat(distance), label));
        if self.heap.len() > self.k {
            self.heap.pop();
        }
    }

    pub(crate) fn into_result(self) -> SearchResult {
        let sorted = self.heap.into_sorted_vec();
        SearchResult {
            ids: sorted.iter().map(|(_, id)| *id).collect(),
            distances: sorted.iter().map(|(d, _)| d.0).collect(),
        }
    }
}

/// Merge several ascending results into one ascending top-k.
pub fn merge_results(results: impl IntoIterator<Item = SearchResult>, top_k: usize) -> SearchResult {
    let mut top = TopK::new(top_k);
    for r in results {
        for (id, d) in r.ids.into_iter().zip(r.distances) {
            top.push(id, d);
        }
    }
    top.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topk_keeps_smallest_sorted() {
        let mut t = TopK::new(2);
        t.push(1, 3.0);
        t.push(2, 1.0);
        t.push(3, 2.0);
        let r = t.into_result();
        assert_eq!(r.ids, vec![2, 3]);
        assert_eq!(r.distances, vec![1.0, 2.0]);
    }

    #[test]
    fn test_topk_ties_break_on_label() {
        let mut t = TopK::new(2);
        t.push(9, 1.0);
        t.push(4, 1.0);
        t.push(7, 1.0);
        assert_eq!(t.into_result().ids, vec![4, 7]);
    }

    #[test]
    fn test_topk_unbounded_k() {
        let mut t = TopK::new(usize::MAX);
        t.push(5, 2.0);
        t.push(6, 1.0);
        let r = t.into_result();
        assert_eq!(r.ids, vec![6, 5]);
    }

    #[test]
    fn test_merge_results() {
        let a = SearchResult { ids: vec![1, 2], distances: vec![0.5, 3.0] };
        let b = SearchResult { ids: vec![3], distances: vec![1.0] };
        let m = merge_results([a, b], 2);
        assert_eq!(m.ids, vec![1, 3]);
    }

    #[test]
    fn test_index_params_nlist() {
        assert_eq!(IndexParams::ivf_flat(DistanceMetric::L2, 128).nlist(), 128);
        assert_eq!(IndexParams::Flat { metric: DistanceMetric::L2 }.nlist(), 1);
    }
}
