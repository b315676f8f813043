//! JSON error responses for the HTTP API.

use ads_core::StatusResponse;
use ads_retrieval::{RetrievalError, WriteRejection};
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::warn;

/// API error with status code and message.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, message: msg.into() }
    }
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self { status: StatusCode::CONFLICT, message: msg.into() }
    }
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self { status: StatusCode::REQUEST_TIMEOUT, message: msg.into() }
    }
    pub fn internal(msg: impl Into<String>) -> Self {
        Self { status: StatusCode::INTERNAL_SERVER_ERROR, message: msg.into() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(StatusResponse::error(self.message))).into_response()
    }
}

impl From<RetrievalError> for ApiError {
    fn from(err: RetrievalError) -> Self {
        let message = err.to_string();
        match err {
            RetrievalError::WriteRejected(WriteRejection::DuplicateKey(_)) => ApiError::conflict(message),
            RetrievalError::InvalidRequest(_)
            | RetrievalError::DimensionMismatch { .. }
            | RetrievalError::WriteRejected(_)
            | RetrievalError::Embedding { .. } => ApiError::bad_request(message),
            RetrievalError::NotReady(_) | RetrievalError::IndexBuild(_) => ApiError::conflict(message),
            RetrievalError::Timeout { operation: "embed" | "embed_batch", .. } => ApiError::bad_request(message),
            RetrievalError::Timeout { .. } => ApiError::timeout(message),
            RetrievalError::Store(_) | RetrievalError::SchemaConflict(_) => {
                warn!(error = %message, "request failed in the vector store");
                ApiError::internal(message)
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}
