use std::sync::Arc;
use std::time::Instant;

use ads_core::AdMatch;
use ads_vectordb::{Column, ConsistencyLevel, Filter, SearchParams, SearchRequest, SearchResultSet, VectorDbError};
use tracing::debug;

use crate::collection::{VectorCollection, EMBEDDING_FIELD, PROJECT_FIELD};
use crate::error::{Result, RetrievalError};

/// Project-filtered approximate nearest-neighbor queries.
pub struct SimilaritySearch {
    collection: Arc<VectorCollection>,
}

impl SimilaritySearch {
    pub fn new(collection: Arc<VectorCollection>) -> Self {
        Self { collection }
    }

    /// Up to `k` ads of `project` nearest to `vector`, closest first.
    ///
    /// The project predicate runs inside the store's scan, so all `k` slots
    /// are filled from the project's own rows. Fewer than `k` matches is not
    /// an error.
    pub async fn query(
        &self,
        vector: &[f32],
        project: &str,
        k: usize,
        nprobe: usize,
        consistency: ConsistencyLevel,
    ) -> Result<Vec<AdMatch>> {
        let settings = self.collection.settings();
        if k == 0 {
            return Err(RetrievalError::InvalidRequest("k must be at least 1".into()));
        }
        if nprobe == 0 || nprobe > settings.nlist {
            return Err(RetrievalError::InvalidRequest(format!(
                "nprobe must be in 1..={}, got {nprobe}",
                settings.nlist
            )));
        }
        if vector.len() != settings.dimension {
            return Err(RetrievalError::DimensionMismatch { expected: settings.dimension, got: vector.len() });
        }
        self.collection.require_loaded()?;

        let request = SearchRequest {
            anns_field: EMBEDDING_FIELD.into(),
            vectors: vec![vector.to_vec()],
            top_k: k,
            filter: Some(Filter::eq(PROJECT_FIELD, project)),
            output_fields: vec![PROJECT_FIELD.into()],
            params: SearchParams { nprobe },
            consistency,
        };
        let name = self.collection.name();
        let store = self.collection.store();

        let started = Instant::now();
        let sets = self.collection.call("search", || store.search(name, request.clone())).await?;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

        let matches = match sets.first() {
            Some(set) => transpose(set)?,
            None => Vec::new(),
        };
        debug!(collection = name, project, k, nprobe, hits = matches.len(), latency_ms, "search");
        Ok(matches)
    }
}

/// Zip a column-oriented result set back into one [`AdMatch`] per hit.
///
/// Rows are paired by position: entry `i` of the id column, of the project
/// column, and of the scores all describe the same hit.
pub fn transpose(set: &SearchResultSet) -> Result<Vec<AdMatch>> {
    let ids = set.ids.as_int64().ok_or_else(|| malformed("id column is not int64"))?;
    let projects = set
        .field(PROJECT_FIELD)
        .and_then(Column::as_varchar)
        .ok_or_else(|| malformed("project column missing from result"))?;
    if ids.len() != set.scores.len() || projects.len() != set.scores.len() {
        return Err(malformed(&format!(
            "result columns differ in length (ids={}, projects={}, scores={})",
            ids.len(),
            projects.len(),
            set.scores.len()
        )));
    }
    Ok(ids
        .iter()
        .zip(projects)
        .zip(&set.scores)
        .map(|((id, project), distance)| AdMatch { id: *id, project: project.clone(), distance: *distance })
        .collect())
}

fn malformed(details: &str) -> RetrievalError {
    RetrievalError::Store(VectorDbError::InvalidColumns(details.to_string()))
}
