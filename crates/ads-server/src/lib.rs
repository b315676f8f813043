//! Ads retrieval HTTP API server (Axum).
//!
//! `POST /api/insert`, `POST /api/search` and `DELETE /api/delete` over a
//! [`RetrievalService`], plus `GET /health`.

pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;

use std::sync::Arc;

use ads_core::AdsConfig;
use ads_retrieval::{LocalVectorStore, RetrievalService, VectorStore};
use anyhow::Context as _;
use axum::Router;
use state::AppState;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Build the application router with a custom state.
pub fn app_with_state(state: AppState) -> Router {
    Router::new()
        .merge(routes::health_routes())
        .merge(routes::ad_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Prepare the collection, then serve until ctrl-c.
pub async fn run(config: AdsConfig) -> anyhow::Result<()> {
    let store: Arc<dyn VectorStore> = Arc::new(LocalVectorStore::default());
    let service = RetrievalService::from_config(&config, store).context("failed to build retrieval service")?;
    service.bootstrap().await.context("failed to prepare the ads collection")?;

    let address = config.server.address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    info!(%address, collection = %config.vectordb.collection, "listening");

    axum::serve(listener, app_with_state(AppState::new(Arc::new(service))))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutting down");
    }
}
