//! Ad retrieval: text embeddings stored in one project-filtered IVF/L2
//! collection, behind insert, search and delete.

pub mod collection;
pub mod delete;
pub mod embedder;
pub mod error;
pub mod retry;
pub mod search;
pub mod service;
pub mod store;
pub mod write;

pub use collection::{ads_schema, CollectionSettings, CollectionState, VectorCollection};
pub use delete::DeleteSet;
pub use embedder::{build_embedder, HashingEmbedder, OpenAiEmbedder, TextEmbedder};
pub use error::{Result, RetrievalError, WriteRejection};
pub use retry::RetryPolicy;
pub use search::{transpose, SimilaritySearch};
pub use service::{consistency_level, RetrievalService, ServiceSettings};
pub use store::{LocalVectorStore, VectorStore};
pub use write::WriteSet;
