//! Route handlers.
//!
//! Handlers stay thin: parse input, call the pipeline, serialize.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::GatewayError;
use crate::http::server::AppState;
use crate::pipeline::{PipelineStats, Resolution, StreamStatus};

pub const SERVICE_NAME: &str = "stream-gateway";

#[derive(Debug, Deserialize)]
pub struct ResolveQuery {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub bypass_cache: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct BypassQuery {
    #[serde(default)]
    pub bypass_cache: bool,
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub urls: Vec<String>,
}

pub async fn root() -> Json<Value> {
    Json(json!({ "status": "ok", "service": SERVICE_NAME }))
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let pool = state.pipeline.pool();
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "pool": {
            "idle": pool.size(),
            "capacity": pool.capacity(),
        },
    }))
}

pub async fn resolve(
    State(state): State<AppState>,
    Query(query): Query<ResolveQuery>,
) -> Result<Json<Resolution>, GatewayError> {
    let resolution = state.pipeline.resolve(&query.url, query.bypass_cache).await?;
    Ok(Json(resolution))
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub results: Vec<StreamStatus>,
}

pub async fn status_batch(
    State(state): State<AppState>,
    Query(query): Query<BypassQuery>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<BatchResponse>, GatewayError> {
    let results = state
        .pipeline
        .status_batch(&request.urls, query.bypass_cache)
        .await?;
    Ok(Json(BatchResponse { results }))
}

pub async fn cache_stats(State(state): State<AppState>) -> Json<PipelineStats> {
    Json(state.pipeline.stats())
}
