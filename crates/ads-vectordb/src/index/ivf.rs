use std::collections::HashMap;
use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use crate::distance::{self, DistanceMetric};
use crate::error::{Result, VectorDbError};
use super::{SearchParams, SearchResult, TopK, traits::VectorIndex};

/// Fixed seed so identical training data always yields identical partitions.
const KMEANS_SEED: u64 = 0x1f_1a7;
const KMEANS_MAX_ITERS: usize = 25;

/// IVF_FLAT (inverted file) index.
///
/// Training clusters the sample vectors into at most `nlist` partitions with
/// k-means. Each vector lives uncompressed in the list of its nearest
/// centroid; a query scans only the `nprobe` lists whose centroids are
/// closest to it.
pub struct IvfFlatIndex {
    dimension: usize,
    metric: DistanceMetric,
    nlist: usize,
    inner: RwLock<IvfInner>,
}

struct IvfInner {
    centroids: Vec<Vec<f32>>,
    lists: Vec<InvertedList>,
    label_to_list: HashMap<i64, usize>,
}

#[derive(Default)]
struct InvertedList {
    labels: Vec<i64>,
    vectors: Vec<Vec<f32>>,
}

impl InvertedList {
    fn remove(&mut self, label: i64) {
        if let Some(pos) = self.labels.iter().position(|&l| l == label) {
            self.labels.swap_remove(pos);
            self.vectors.swap_remove(pos);
        }
    }
}

impl IvfFlatIndex {
    /// Train partitions over `samples` and populate the lists with them.
    ///
    /// The number of trained lists is `min(nlist, samples.len())`; `nlist`
    /// itself is kept as the declared partition count.
    pub fn train(
        dimension: usize,
        metric: DistanceMetric,
        nlist: usize,
        samples: &[(i64, Vec<f32>)],
    ) -> Result<Self> {
        if nlist == 0 {
            return Err(VectorDbError::IndexBuild("nlist must be at least 1".into()));
        }
        if samples.is_empty() {
            return Err(VectorDbError::IndexBuild("no vectors to train on".into()));
        }
        if let Some((_, v)) = samples.iter().find(|(_, v)| v.len() != dimension) {
            return Err(VectorDbError::DimensionMismatch { expected: dimension, got: v.len() });
        }

        let vectors: Vec<&[f32]> = samples.iter().map(|(_, v)| v.as_slice()).collect();
        let k = nlist.min(vectors.len());
        let centroids = kmeans(&vectors, k, metric);

        let index = Self {
            dimension,
            metric,
            nlist,
            inner: RwLock::new(IvfInner {
                lists: (0..centroids.len()).map(|_| InvertedList::default()).collect(),
                centroids,
                label_to_list: HashMap::with_capacity(samples.len()),
            }),
        };
        for (label, vector) in samples {
            index.insert(*label, vector)?;
        }
        Ok(index)
    }

    /// Declared partition count.
    pub fn nlist(&self) -> usize {
        self.nlist
    }

    /// Partitions actually trained (never more than `nlist`).
    pub fn trained_lists(&self) -> usize {
        self.inner.read().centroids.len()
    }

    /// Sizes of each inverted list, in centroid order.
    pub fn list_sizes(&self) -> Vec<usize> {
        self.inner.read().lists.iter().map(|l| l.labels.len()).collect()
    }
}

fn nearest_centroid(centroids: &[Vec<f32>], v: &[f32], metric: DistanceMetric) -> usize {
    let mut best = 0;
    let mut best_d = f32::INFINITY;
    for (i, c) in centroids.iter().enumerate() {
        let d = metric.distance(v, c);
        if d < best_d {
            best_d = d;
            best = i;
        }
    }
    best
}

/// k-means++ seeding followed by Lloyd iterations.
fn kmeans(vectors: &[&[f32]], k: usize, metric: DistanceMetric) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(KMEANS_SEED);
    let dim = vectors[0].len();

    let mut centroids: Vec<Vec<f32>> = Vec::with_capacity(k);
    centroids.push(vectors[rng.gen_range(0..vectors.len())].to_vec());
    let mut nearest: Vec<f32> = vectors.iter().map(|v| distance::l2_squared(v, &centroids[0])).collect();
    while centroids.len() < k {
        let total: f32 = nearest.iter().sum();
        let next = if total.is_finite() && total > 0.0 {
            let mut target = rng.gen_range(0.0..total);
            let mut chosen = vectors.len() - 1;
            for (i, &d) in nearest.iter().enumerate() {
                if target < d {
                    chosen = i;
                    break;
                }
                target -= d;
            }
            chosen
        } else {
            // Every vector coincides with a centroid already, or the
            // distances overflowed f32.
            break;
        };
        let chosen = vectors[next];
        centroids.push(chosen.to_vec());
        for (n, v) in nearest.iter_mut().zip(vectors) {
            *n = n.min(distance::l2_squared(v, chosen));
        }
    }

    let mut assignment = vec![usize::MAX; vectors.len()];
    for _ in 0..KMEANS_MAX_ITERS {
        let mut changed = false;
        for (slot, v) in assignment.iter_mut().zip(vectors) {
            let c = nearest_centroid(&centroids, v, metric);
            if *slot != c {
                *slot = c;
                changed = true;
            }
        }
        if !changed {
            break;
        }

        let mut sums = vec![vec![0f32; dim]; centroids.len()];
        let mut counts = vec![0usize; centroids.len()];
        for (&c, v) in assignment.iter().zip(vectors) {
            counts[c] += 1;
            for (s, x) in sums[c].iter_mut().zip(v.iter()) {
                *s += x;
            }
        }
        for ((centroid, sum), &count) in centroids.iter_mut().zip(sums).zip(&counts) {
            // Empty clusters keep their previous centroid.
            if count > 0 {
                *centroid = sum.into_iter().map(|s| s / count as f32).collect();
            }
        }
    }
    centroids
}

impl VectorIndex for IvfFlatIndex {
    fn insert(&self, label: i64, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(VectorDbError::DimensionMismatch {
                expected: self.dimension,
                got: vector.len(),
            });
        }
        let mut inner = self.inner.write();
        if let Some(old) = inner.label_to_list.remove(&label) {
            inner.lists[old].remove(label);
        }
        let list = nearest_centroid(&inner.centroids, vector, self.metric);
        inner.lists[list].labels.push(label);
        inner.lists[list].vectors.push(vector.to_vec());
        inner.label_to_list.insert(label, list);
        Ok(())
    }

    fn delete(&self, label: i64) {
        let mut inner = self.inner.write();
        if let Some(list) = inner.label_to_list.remove(&label) {
            inner.lists[list].remove(label);
        }
    }

    fn contains(&self, label: i64) -> bool {
        self.inner.read().label_to_list.contains_key(&label)
    }

    fn labels(&self) -> Vec<i64> {
        self.inner.read().label_to_list.keys().copied().collect()
    }

    fn search(
        &self,
        query: &[f32],
        top_k: usize,
        params: &SearchParams,
        accept: &dyn Fn(i64) -> bool,
    ) -> Result<SearchResult> {
        if query.len() != self.dimension {
            return Err(VectorDbError::DimensionMismatch {
                expected: self.dimension,
                got: query.len(),
            });
        }
        if params.nprobe == 0 || params.nprobe > self.nlist {
            return Err(VectorDbError::InvalidSearch(format!(
                "nprobe must be in 1..={}, got {}",
                self.nlist, params.nprobe
            )));
        }

        let inner = self.inner.read();
        let mut probes: Vec<(f32, usize)> = inner
            .centroids
            .iter()
            .enumerate()
            .map(|(i, c)| (self.metric.distance(query, c), i))
            .collect();
        probes.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        probes.truncate(params.nprobe);

        let mut top = TopK::new(top_k);
        for (_, list_idx) in probes {
            let list = &inner.lists[list_idx];
            for (&label, vec) in list.labels.iter().zip(list.vectors.iter()) {
                if accept(label) {
                    top.push(label, self.metric.distance(query, vec));
                }
            }
        }
        Ok(top.into_result())
    }

    fn len(&self) -> usize {
        self.inner.read().label_to_list.len()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn metric(&self) -> DistanceMetric {
        self.metric
    }
}
