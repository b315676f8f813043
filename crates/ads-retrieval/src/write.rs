use std::collections::HashSet;
use std::sync::Arc;

use ads_vectordb::Column;
use tracing::{debug, warn};

use crate::collection::{VectorCollection, EMBEDDING_FIELD, ID_FIELD, PROJECT_FIELD, PROJECT_MAX_LENGTH};
use crate::error::{Result, RetrievalError, WriteRejection};

/// Column-oriented batch writes followed by a flush.
pub struct WriteSet {
    collection: Arc<VectorCollection>,
}

impl WriteSet {
    pub fn new(collection: Arc<VectorCollection>) -> Self {
        Self { collection }
    }

    /// Insert one batch and flush it. Either the whole batch is written or
    /// none of it; the rows are durable once this returns.
    pub async fn commit(&self, ids: &[i64], projects: &[String], vectors: &[Vec<f32>]) -> Result<usize> {
        self.collection.require_created()?;
        let columns = self.columns(ids, projects, vectors)?;
        let name = self.collection.name();
        let store = self.collection.store();

        // Not retried: a timed-out insert may have landed.
        let inserted = self
            .collection
            .call_once("insert", || store.insert(name, columns.clone()))
            .await?;
        if let Err(e) = self.collection.call("flush", || store.flush(name)).await {
            self.roll_back(&inserted).await;
            return Err(e);
        }
        self.collection.record_flushed(inserted.len());
        debug!(collection = name, rows = inserted.len(), "committed");
        Ok(inserted.len())
    }

    /// Remove rows whose flush failed, so a retried commit is not rejected
    /// as a duplicate of a write that was reported as failed.
    async fn roll_back(&self, ids: &[i64]) {
        let name = self.collection.name();
        let store = self.collection.store();
        match self
            .collection
            .call_once("delete_by_pks", || store.delete_by_pks(name, ids.to_vec()))
            .await
        {
            Ok(removed) => warn!(collection = name, removed, "flush failed, batch rolled back"),
            Err(e) => warn!(collection = name, error = %e, "flush failed and rollback failed"),
        }
    }

    fn columns(&self, ids: &[i64], projects: &[String], vectors: &[Vec<f32>]) -> Result<Vec<Column>> {
        if ids.is_empty() && projects.is_empty() && vectors.is_empty() {
            return Err(RetrievalError::WriteRejected(WriteRejection::EmptyBatch));
        }
        if ids.len() != projects.len() || ids.len() != vectors.len() {
            return Err(RetrievalError::WriteRejected(WriteRejection::LengthMismatch {
                ids: ids.len(),
                projects: projects.len(),
                vectors: vectors.len(),
            }));
        }

        let dimension = self.collection.settings().dimension;
        if let Some(v) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(RetrievalError::DimensionMismatch { expected: dimension, got: v.len() });
        }
        if let Some(p) = projects.iter().find(|p| p.len() > PROJECT_MAX_LENGTH) {
            return Err(RetrievalError::WriteRejected(WriteRejection::Malformed(format!(
                "project name is {} bytes, limit is {PROJECT_MAX_LENGTH}",
                p.len()
            ))));
        }
        let mut seen = HashSet::with_capacity(ids.len());
        if let Some(id) = ids.iter().find(|id| !seen.insert(**id)) {
            return Err(RetrievalError::WriteRejected(WriteRejection::DuplicateKey(*id)));
        }

        Ok(vec![
            Column::int64(ID_FIELD, ids.to_vec()),
            Column::varchar(PROJECT_FIELD, projects.to_vec()),
            Column::float_vector(EMBEDDING_FIELD, dimension, vectors.to_vec()),
        ])
    }
}
