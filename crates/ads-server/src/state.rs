//! Application state shared across all handlers.

use std::sync::Arc;
use std::time::Instant;

use ads_retrieval::RetrievalService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RetrievalService>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(service: Arc<RetrievalService>) -> Self {
        Self { service, start_time: Instant::now() }
    }
}
