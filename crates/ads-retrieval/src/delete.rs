use std::sync::Arc;

use ads_vectordb::{Column, ConsistencyLevel};
use tracing::{debug, info, warn};

use crate::collection::{CollectionState, VectorCollection, PROJECT_FIELD};
use crate::error::Result;

/// Idempotent deletes by primary key.
pub struct DeleteSet {
    collection: Arc<VectorCollection>,
}

impl DeleteSet {
    pub fn new(collection: Arc<VectorCollection>) -> Self {
        Self { collection }
    }

    /// Remove rows by id. Unknown ids are not an error; returns how many
    /// rows were actually removed.
    pub async fn delete(&self, ids: &[i64]) -> Result<usize> {
        self.collection.require_created()?;
        if ids.is_empty() {
            return Ok(0);
        }
        self.audit(ids).await;

        let name = self.collection.name();
        let store = self.collection.store();
        let removed = self
            .collection
            .call("delete_by_pks", || store.delete_by_pks(name, ids.to_vec()))
            .await?;
        self.collection.record_removed(removed);
        self.collection.call("flush", || store.flush(name)).await?;
        info!(collection = name, requested = ids.len(), removed, "deleted");
        Ok(removed)
    }

    /// Log what is about to be deleted. Failures here never block the delete.
    async fn audit(&self, ids: &[i64]) {
        if self.collection.state() != CollectionState::Loaded {
            return;
        }
        let name = self.collection.name();
        let store = self.collection.store();
        let found = self
            .collection
            .call_once("query_by_pks", || {
                store.query_by_pks(name, ids.to_vec(), vec![PROJECT_FIELD.to_string()], ConsistencyLevel::Strong)
            })
            .await;
        match found {
            Ok(columns) => {
                let ids = columns.first().and_then(Column::as_int64).unwrap_or_default();
                let projects = columns.get(1).and_then(Column::as_varchar).unwrap_or_default();
                debug!(collection = name, ?ids, ?projects, "rows to delete");
            }
            Err(e) => warn!(collection = name, error = %e, "pre-delete lookup failed"),
        }
    }
}
