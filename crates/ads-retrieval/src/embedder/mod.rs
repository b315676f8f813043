//! Text → vector providers.

mod hashing;
mod openai;

use std::sync::Arc;
use std::time::Duration;

use ads_core::{AdsConfig, EmbeddingProviderKind};
use async_trait::async_trait;

use crate::error::Result;

pub use hashing::HashingEmbedder;
pub use openai::OpenAiEmbedder;

/// Maps text to a fixed-length embedding.
///
/// Implementations must return vectors of exactly `dimension()` floats; the
/// service checks this before any vector reaches the store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    fn dimension(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts, preserving order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}

/// Build the embedder selected by `embedding.provider`.
pub fn build_embedder(config: &AdsConfig) -> Result<Arc<dyn TextEmbedder>> {
    let dimension = config.vectordb.dimension;
    match config.embedding.provider {
        EmbeddingProviderKind::OpenAi => {
            let timeout = Duration::from_millis(config.timeouts.embed_ms);
            Ok(Arc::new(OpenAiEmbedder::new(&config.embedding, dimension, timeout)?))
        }
        EmbeddingProviderKind::Hashing => Ok(Arc::new(HashingEmbedder::new(dimension))),
    }
}
