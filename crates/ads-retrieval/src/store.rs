//! Async boundary to the vector store.
//!
//! The retrieval layer talks to the store only through [`VectorStore`], so a
//! remote client can replace [`LocalVectorStore`] without touching callers.

use std::sync::Arc;

use ads_vectordb::{
    CollectionSchema, Column, ConsistencyLevel, Database, IndexParams, SearchRequest, SearchResultSet, VectorDbError,
};
use async_trait::async_trait;

type StoreResult<T> = std::result::Result<T, VectorDbError>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn has_collection(&self, name: &str) -> StoreResult<bool>;

    async fn describe_collection(&self, name: &str) -> StoreResult<CollectionSchema>;

    async fn create_collection(&self, schema: CollectionSchema) -> StoreResult<()>;

    async fn drop_collection(&self, name: &str) -> StoreResult<()>;

    /// Column-oriented insert; returns the inserted primary keys.
    async fn insert(&self, collection: &str, columns: Vec<Column>) -> StoreResult<Vec<i64>>;

    async fn flush(&self, collection: &str) -> StoreResult<()>;

    /// Flushed row count.
    async fn num_entities(&self, collection: &str) -> StoreResult<usize>;

    async fn create_index(&self, collection: &str, field: &str, params: IndexParams) -> StoreResult<()>;

    async fn load(&self, collection: &str) -> StoreResult<()>;

    async fn release(&self, collection: &str) -> StoreResult<()>;

    async fn search(&self, collection: &str, request: SearchRequest) -> StoreResult<Vec<SearchResultSet>>;

    async fn query_by_pks(
        &self,
        collection: &str,
        pks: Vec<i64>,
        output_fields: Vec<String>,
        consistency: ConsistencyLevel,
    ) -> StoreResult<Vec<Column>>;

    /// Returns how many rows were removed; unknown keys are ignored.
    async fn delete_by_pks(&self, collection: &str, pks: Vec<i64>) -> StoreResult<usize>;
}

/// In-process store backed by an [`ads_vectordb::Database`].
#[derive(Clone, Default)]
pub struct LocalVectorStore {
    db: Arc<Database>,
}

impl LocalVectorStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }
}

#[async_trait]
impl VectorStore for LocalVectorStore {
    async fn has_collection(&self, name: &str) -> StoreResult<bool> {
        Ok(self.db.has_collection(name))
    }

    async fn describe_collection(&self, name: &str) -> StoreResult<CollectionSchema> {
        self.db.describe_collection(name)
    }

    async fn create_collection(&self, schema: CollectionSchema) -> StoreResult<()> {
        self.db.create_collection(schema).map(|_| ())
    }

    async fn drop_collection(&self, name: &str) -> StoreResult<()> {
        self.db.drop_collection(name)
    }

    async fn insert(&self, collection: &str, columns: Vec<Column>) -> StoreResult<Vec<i64>> {
        self.db.collection(collection)?.insert(columns)
    }

    async fn flush(&self, collection: &str) -> StoreResult<()> {
        self.db.collection(collection)?.flush().map(|_| ())
    }

    async fn num_entities(&self, collection: &str) -> StoreResult<usize> {
        Ok(self.db.collection(collection)?.num_entities())
    }

    async fn create_index(&self, collection: &str, field: &str, params: IndexParams) -> StoreResult<()> {
        let target = self.db.collection(collection)?;
        let field = field.to_string();
        // k-means training is CPU-bound; keep it off the async workers.
        tokio::task::spawn_blocking(move || target.create_index(&field, params))
            .await
            .map_err(|e| VectorDbError::Unavailable(format!("index build task failed: {e}")))?
    }

    async fn load(&self, collection: &str) -> StoreResult<()> {
        self.db.collection(collection)?.load()
    }

    async fn release(&self, collection: &str) -> StoreResult<()> {
        self.db.collection(collection)?.release();
        Ok(())
    }

    async fn search(&self, collection: &str, request: SearchRequest) -> StoreResult<Vec<SearchResultSet>> {
        self.db.collection(collection)?.search(&request)
    }

    async fn query_by_pks(
        &self,
        collection: &str,
        pks: Vec<i64>,
        output_fields: Vec<String>,
        consistency: ConsistencyLevel,
    ) -> StoreResult<Vec<Column>> {
        self.db.collection(collection)?.query_by_pks(&pks, &output_fields, consistency)
    }

    async fn delete_by_pks(&self, collection: &str, pks: Vec<i64>) -> StoreResult<usize> {
        Ok(self.db.collection(collection)?.delete_by_pks(&pks))
    }
}
