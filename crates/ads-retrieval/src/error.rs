use std::fmt;
use std::time::Duration;

use ads_vectordb::VectorDbError;
use thiserror::Error;

/// Why a write batch was refused before or by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteRejection {
    LengthMismatch { ids: usize, projects: usize, vectors: usize },
    DuplicateKey(i64),
    EmptyBatch,
    Malformed(String),
}

impl fmt::Display for WriteRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LengthMismatch { ids, projects, vectors } => {
                write!(f, "column lengths differ (ids={ids}, projects={projects}, vectors={vectors})")
            }
            Self::DuplicateKey(id) => write!(f, "id {id} already exists"),
            Self::EmptyBatch => write!(f, "empty batch"),
            Self::Malformed(details) => write!(f, "{details}"),
        }
    }
}

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Schema conflict: {0}")]
    SchemaConflict(String),

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Write rejected: {0}")]
    WriteRejected(WriteRejection),

    #[error("Index build failed: {0}")]
    IndexBuild(String),

    #[error("Collection not ready: {0}")]
    NotReady(String),

    #[error("Embedding failed: {message}")]
    Embedding { message: String, transient: bool },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{operation} timed out after {}ms", .after.as_millis())]
    Timeout { operation: &'static str, after: Duration },

    #[error("Vector store error: {0}")]
    Store(VectorDbError),
}

impl RetrievalError {
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding { message: message.into(), transient: false }
    }

    pub fn embedding_transient(message: impl Into<String>) -> Self {
        Self::Embedding { message: message.into(), transient: true }
    }

    /// Transient failures worth another attempt. Logical errors never are.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Embedding { transient, .. } => *transient,
            Self::Store(e) => e.is_transient(),
            _ => false,
        }
    }
}

impl From<VectorDbError> for RetrievalError {
    fn from(e: VectorDbError) -> Self {
        match e {
            VectorDbError::DimensionMismatch { expected, got } => Self::DimensionMismatch { expected, got },
            VectorDbError::DuplicateKey(id) => Self::WriteRejected(WriteRejection::DuplicateKey(id)),
            VectorDbError::InvalidColumns(details) => Self::WriteRejected(WriteRejection::Malformed(details)),
            VectorDbError::IndexBuild(details) => Self::IndexBuild(details),
            VectorDbError::IndexNotFound(name) => Self::NotReady(format!("no index on `{name}`")),
            VectorDbError::NotLoaded(name) => Self::NotReady(format!("`{name}` is not loaded")),
            VectorDbError::CollectionNotFound(name) => Self::NotReady(format!("`{name}` does not exist")),
            VectorDbError::InvalidSchema(details) => Self::SchemaConflict(details),
            VectorDbError::InvalidSearch(details) | VectorDbError::InvalidFilter(details) => {
                Self::InvalidRequest(details)
            }
            other => Self::Store(other),
        }
    }
}

impl From<reqwest::Error> for RetrievalError {
    fn from(e: reqwest::Error) -> Self {
        let transient = e.is_timeout() || e.is_connect() || e.is_request();
        Self::Embedding { message: e.to_string(), transient }
    }
}

pub type Result<T> = std::result::Result<T, RetrievalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_map_to_taxonomy() {
        assert!(matches!(
            RetrievalError::from(VectorDbError::DuplicateKey(7)),
            RetrievalError::WriteRejected(WriteRejection::DuplicateKey(7))
        ));
        assert!(matches!(
            RetrievalError::from(VectorDbError::DimensionMismatch { expected: 8, got: 3 }),
            RetrievalError::DimensionMismatch { expected: 8, got: 3 }
        ));
        assert!(matches!(RetrievalError::from(VectorDbError::NotLoaded("ads".into())), RetrievalError::NotReady(_)));
        assert!(matches!(RetrievalError::from(VectorDbError::IndexNotFound("ads".into())), RetrievalError::NotReady(_)));
        assert!(matches!(RetrievalError::from(VectorDbError::IndexBuild("empty".into())), RetrievalError::IndexBuild(_)));
        assert!(matches!(
            RetrievalError::from(VectorDbError::Unavailable("down".into())),
            RetrievalError::Store(VectorDbError::Unavailable(_))
        ));
    }

    #[test]
    fn test_retry_classification() {
        assert!(RetrievalError::from(VectorDbError::Unavailable("down".into())).is_retryable());
        assert!(RetrievalError::embedding_transient("503").is_retryable());
        assert!(RetrievalError::Timeout { operation: "search", after: Duration::from_millis(5) }.is_retryable());

        assert!(!RetrievalError::embedding("bad key").is_retryable());
        assert!(!RetrievalError::SchemaConflict("x".into()).is_retryable());
        assert!(!RetrievalError::WriteRejected(WriteRejection::EmptyBatch).is_retryable());
        assert!(!RetrievalError::DimensionMismatch { expected: 8, got: 4 }.is_retryable());
    }

    #[test]
    fn test_messages() {
        let e = RetrievalError::WriteRejected(WriteRejection::DuplicateKey(42));
        assert_eq!(e.to_string(), "Write rejected: id 42 already exists");
        let e = RetrievalError::Timeout { operation: "embed", after: Duration::from_millis(250) };
        assert_eq!(e.to_string(), "embed timed out after 250ms");
    }
}
