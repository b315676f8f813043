pub mod config;
pub mod error;
pub mod normalize;
pub mod types;

pub use config::{
    AdsConfig, EmbeddingConfig, EmbeddingProviderKind, Environment, ReadConsistency, RetryConfig, ServerConfig,
    TimeoutConfig, VectorDbConfig,
};
pub use error::{ConfigError, Result};
pub use types::{AdMatch, DeleteAdRequest, InsertAdRequest, SearchAdRequest, Status, StatusResponse};
