use thiserror::Error;

#[derive(Error, Debug)]
pub enum VectorDbError {
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),
    #[error("Collection already exists: {0}")]
    CollectionAlreadyExists(String),
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),
    #[error("Field not found: {0}")]
    FieldNotFound(String),
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("Duplicate primary key: {0}")]
    DuplicateKey(i64),
    #[error("Invalid columns: {0}")]
    InvalidColumns(String),
    #[error("Index build failed: {0}")]
    IndexBuild(String),
    #[error("Index not found on collection: {0}")]
    IndexNotFound(String),
    #[error("Collection not loaded: {0}")]
    NotLoaded(String),
    #[error("Invalid search request: {0}")]
    InvalidSearch(String),
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl VectorDbError {
    /// Transport-level failures that a client may retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, VectorDbError>;
