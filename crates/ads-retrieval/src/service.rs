use std::sync::Arc;
use std::time::Duration;

use ads_core::{normalize, AdMatch, AdsConfig, InsertAdRequest, ReadConsistency};
use ads_vectordb::ConsistencyLevel;
use tracing::debug;

use crate::collection::{CollectionSettings, VectorCollection};
use crate::delete::DeleteSet;
use crate::embedder::{build_embedder, TextEmbedder};
use crate::error::{Result, RetrievalError};
use crate::retry::{timed, RetryPolicy};
use crate::search::SimilaritySearch;
use crate::store::VectorStore;
use crate::write::WriteSet;

pub fn consistency_level(consistency: ReadConsistency) -> ConsistencyLevel {
    match consistency {
        ReadConsistency::Strong => ConsistencyLevel::Strong,
        ReadConsistency::Bounded => ConsistencyLevel::Bounded,
        ReadConsistency::Eventually => ConsistencyLevel::Eventually,
    }
}

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub top_k: usize,
    pub consistency: ConsistencyLevel,
    pub normalize_text: bool,
    pub embed_timeout: Duration,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self::from_config(&AdsConfig::default())
    }
}

impl ServiceSettings {
    pub fn from_config(config: &AdsConfig) -> Self {
        Self {
            top_k: config.vectordb.top_k,
            consistency: consistency_level(config.vectordb.consistency),
            normalize_text: config.embedding.normalize_text,
            embed_timeout: config.timeouts.embed(),
        }
    }
}

/// Insert, search and delete ads by text.
pub struct RetrievalService {
    collection: Arc<VectorCollection>,
    embedder: Arc<dyn TextEmbedder>,
    writes: WriteSet,
    searches: SimilaritySearch,
    deletes: DeleteSet,
    settings: ServiceSettings,
    retry: RetryPolicy,
}

impl RetrievalService {
    pub fn new(
        collection: Arc<VectorCollection>,
        embedder: Arc<dyn TextEmbedder>,
        settings: ServiceSettings,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            writes: WriteSet::new(collection.clone()),
            searches: SimilaritySearch::new(collection.clone()),
            deletes: DeleteSet::new(collection.clone()),
            collection,
            embedder,
            settings,
            retry,
        }
    }

    /// Wire a service from configuration over `store`.
    pub fn from_config(config: &AdsConfig, store: Arc<dyn VectorStore>) -> Result<Self> {
        let retry = RetryPolicy::from_config(&config.retry);
        let collection = Arc::new(VectorCollection::new(
            store,
            CollectionSettings::from_config(config),
            retry.clone(),
        ));
        let embedder = build_embedder(config)?;
        Ok(Self::new(collection, embedder, ServiceSettings::from_config(config), retry))
    }

    pub fn collection(&self) -> &Arc<VectorCollection> {
        &self.collection
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    pub async fn bootstrap(&self) -> Result<()> {
        self.collection.bootstrap().await
    }

    fn prepare(&self, text: &str) -> Result<String> {
        let prepared = if self.settings.normalize_text { normalize::normalize(text) } else { text.trim().to_string() };
        if prepared.is_empty() {
            return Err(RetrievalError::InvalidRequest("text is empty".into()));
        }
        Ok(prepared)
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        let expected = self.collection.settings().dimension;
        if vector.len() != expected {
            return Err(RetrievalError::DimensionMismatch { expected, got: vector.len() });
        }
        Ok(())
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let prepared = self.prepare(text)?;
        let limit = self.settings.embed_timeout;
        let embedder = self.embedder.as_ref();
        let vector = self.retry.run("embed", || timed("embed", limit, embedder.embed(&prepared))).await?;
        self.check_dimension(&vector)?;
        Ok(vector)
    }

    /// Embed `text` and store it as ad `id` of `project`. Nothing is written
    /// if embedding fails.
    pub async fn insert(&self, id: i64, project: &str, text: &str) -> Result<()> {
        let vector = self.embed(text).await?;
        self.writes.commit(&[id], &[project.to_string()], &[vector]).await?;
        debug!(id, project, "ad inserted");
        Ok(())
    }

    /// Embed and store several ads in one write.
    pub async fn insert_batch(&self, ads: &[InsertAdRequest]) -> Result<usize> {
        if ads.is_empty() {
            return self.writes.commit(&[], &[], &[]).await;
        }
        let texts = ads.iter().map(|ad| self.prepare(&ad.text)).collect::<Result<Vec<_>>>()?;
        let limit = self.settings.embed_timeout;
        let embedder = self.embedder.as_ref();
        let vectors = self
            .retry
            .run("embed_batch", || timed("embed_batch", limit, embedder.embed_batch(&texts)))
            .await?;
        if vectors.len() != ads.len() {
            return Err(RetrievalError::embedding(format!(
                "expected {} embeddings, got {}",
                ads.len(),
                vectors.len()
            )));
        }
        for v in &vectors {
            self.check_dimension(v)?;
        }
        let ids: Vec<i64> = ads.iter().map(|ad| ad.id).collect();
        let projects: Vec<String> = ads.iter().map(|ad| ad.project_name.clone()).collect();
        self.writes.commit(&ids, &projects, &vectors).await
    }

    /// Top `top_k` ads of `project` closest to `text`, at the configured
    /// consistency.
    pub async fn search(&self, project: &str, text: &str) -> Result<Vec<AdMatch>> {
        self.search_with(project, text, self.settings.top_k, self.settings.consistency).await
    }

    pub async fn search_with(
        &self,
        project: &str,
        text: &str,
        k: usize,
        consistency: ConsistencyLevel,
    ) -> Result<Vec<AdMatch>> {
        if k == 0 {
            return Err(RetrievalError::InvalidRequest("k must be at least 1".into()));
        }
        let vector = self.embed(text).await?;
        self.collection.ensure_loaded().await?;
        let nprobe = self.collection.settings().nprobe;
        self.searches.query(&vector, project, k, nprobe, consistency).await
    }

    /// Delete ad `id`. Deleting an unknown id succeeds.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let removed = self.deletes.delete(&[id]).await?;
        debug!(id, removed, "ad deleted");
        Ok(())
    }
}
