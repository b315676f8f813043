use ads_core::{AdMatch, DeleteAdRequest, InsertAdRequest, SearchAdRequest, StatusResponse};
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

pub fn ad_routes() -> Router<AppState> {
    Router::new()
        .route("/api/insert", post(insert_ad))
        .route("/api/search", post(search_ads))
        .route("/api/delete", delete(delete_ad))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let collection = state.service.collection();
    Json(json!({
        "status": "ok",
        "collection": collection.name(),
        "state": format!("{:?}", collection.state()).to_lowercase(),
        "uptime_secs": state.start_time.elapsed().as_secs(),
    }))
}

async fn insert_ad(
    State(state): State<AppState>,
    payload: Result<Json<InsertAdRequest>, JsonRejection>,
) -> Result<Json<StatusResponse>, ApiError> {
    let Json(req) = payload?;
    state.service.insert(req.id, &req.project_name, &req.text).await?;
    Ok(Json(StatusResponse::success(format!("ad {} inserted", req.id))))
}

async fn search_ads(
    State(state): State<AppState>,
    payload: Result<Json<SearchAdRequest>, JsonRejection>,
) -> Result<Json<Vec<AdMatch>>, ApiError> {
    let Json(req) = payload?;
    let matches = state.service.search(&req.project_name, &req.text).await?;
    Ok(Json(matches))
}

async fn delete_ad(
    State(state): State<AppState>,
    payload: Result<Json<DeleteAdRequest>, JsonRejection>,
) -> Result<Json<StatusResponse>, ApiError> {
    let Json(req) = payload?;
    state.service.delete(req.id).await?;
    Ok(Json(StatusResponse::success(format!("ad {} deleted", req.id))))
}
