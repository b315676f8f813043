use std::time::Duration;

use ads_core::EmbeddingConfig;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::TextEmbedder;
use crate::error::{Result, RetrievalError};

/// Input ceiling of the embedding models, in tokens.
const MAX_INPUT_TOKENS: usize = 8191;

/// OpenAI-compatible `/embeddings` endpoint.
///
/// Inputs longer than the model accepts are embedded in chunks and the
/// chunk vectors averaged, weighted by chunk length.
pub struct OpenAiEmbedder {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    dimension: usize,
}

impl OpenAiEmbedder {
    pub fn new(config: &EmbeddingConfig, dimension: usize, timeout: Duration) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| RetrievalError::embedding("OPENAI_API_KEY not set"))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RetrievalError::embedding(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            dimension,
        })
    }

    async fn request(&self, input: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest { model: &self.model, input };
        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = format!("embedding API error ({status}): {body}");
            return Err(if is_transient_status(status) {
                RetrievalError::embedding_transient(message)
            } else {
                RetrievalError::embedding(message)
            });
        }

        let mut data = response.json::<EmbeddingResponse>().await?.data;
        if data.len() != input.len() {
            return Err(RetrievalError::embedding(format!(
                "expected {} embeddings, got {}",
                input.len(),
                data.len()
            )));
        }
        data.sort_by_key(|d| d.index);
        debug!(model = %self.model, count = data.len(), "embedded");
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

/// Split `text` into pieces the model accepts whole. Byte-level BPE never
/// yields more tokens than bytes, so pieces are bounded in UTF-8 bytes and
/// cut on char boundaries, preferring the last whitespace.
fn chunk_input(text: &str, max_bytes: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut rest = text;
    while rest.len() > max_bytes {
        let mut end = max_bytes;
        while !rest.is_char_boundary(end) {
            end -= 1;
        }
        if end == 0 {
            end = rest.chars().next().map_or(rest.len(), char::len_utf8);
        }
        if let Some(space) = rest[..end].rfind(char::is_whitespace).filter(|&i| i > 0) {
            end = space;
        }
        chunks.push(&rest[..end]);
        rest = rest[end..].trim_start();
    }
    if !rest.is_empty() || chunks.is_empty() {
        chunks.push(rest);
    }
    chunks
}

/// Length-weighted mean of the chunk vectors, rescaled to unit length.
fn weighted_mean(chunks: &[&str], vectors: Vec<Vec<f32>>) -> Result<Vec<f32>> {
    let mut vectors = vectors.into_iter();
    let Some(first) = vectors.next() else {
        return Err(RetrievalError::embedding("no embedding returned"));
    };
    if chunks.len() == 1 {
        return Ok(first);
    }
    let mut sum: Vec<f32> = first.iter().map(|x| x * chunks[0].len() as f32).collect();
    for (chunk, v) in chunks[1..].iter().zip(vectors) {
        if v.len() != sum.len() {
            return Err(RetrievalError::DimensionMismatch { expected: sum.len(), got: v.len() });
        }
        let weight = chunk.len() as f32;
        for (s, x) in sum.iter_mut().zip(v) {
            *s += x * weight;
        }
    }
    let norm = sum.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        sum.iter_mut().for_each(|x| *x /= norm);
    }
    Ok(sum)
}

fn is_transient_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

#[async_trait]
impl TextEmbedder for OpenAiEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let chunks = chunk_input(text, MAX_INPUT_TOKENS);
        let input: Vec<String> = chunks.iter().map(|c| c.to_string()).collect();
        let vectors = self.request(&input).await?;
        if chunks.len() > 1 {
            debug!(chunks = chunks.len(), bytes = text.len(), "embedded long input in chunks");
        }
        weighted_mean(&chunks, vectors)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        if texts.iter().all(|t| t.len() <= MAX_INPUT_TOKENS) {
            return self.request(texts).await;
        }
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}
