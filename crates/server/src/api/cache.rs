//! Cache administration handlers.

use axum::{extract::State, http::StatusCode, Json};
use filemill_core::{cache::ReconcileReport, CacheStats};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::state::AppState;

/// Response for clearing the cache
#[derive(Debug, Serialize)]
pub struct ClearCacheResponse {
    pub removed: usize,
}

/// Error response for cache operations
#[derive(Debug, Serialize)]
pub struct CacheErrorResponse {
    pub error: String,
}

pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<CacheStats> {
    Json(state.orchestrator().cache_stats().await)
}

/// Remove every cached artifact
pub async fn clear_cache(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ClearCacheResponse>, (StatusCode, Json<CacheErrorResponse>)> {
    match state.orchestrator().clear_cache().await {
        Ok(removed) => {
            info!(removed, "Cache cleared via API");
            Ok(Json(ClearCacheResponse { removed }))
        }
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(CacheErrorResponse {
                error: e.to_string(),
            }),
        )),
    }
}

/// Sweep orphaned artifacts and dangling index entries
pub async fn reconcile(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ReconcileReport>, (StatusCode, Json<CacheErrorResponse>)> {
    state
        .orchestrator()
        .reconcile_cache()
        .await
        .map(Json)
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(CacheErrorResponse {
                    error: e.to_string(),
                }),
            )
        })
}
