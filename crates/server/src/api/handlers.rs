use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use filemill_core::{converter::ToolStatus, SanitizedConfig, ToolRoute};
use serde::Serialize;
use std::sync::Arc;

use crate::metrics::{collect_dynamic_metrics, encode_metrics};
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    /// "ok" when every tool was found at startup, "degraded" otherwise
    pub status: String,
    pub tools: Vec<ToolStatus>,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let tools = state.tools();
    let status = if tools.all_available() { "ok" } else { "degraded" };
    Json(HealthResponse {
        status: status.to_string(),
        tools: tools.tools.clone(),
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<SanitizedConfig> {
    Json(state.sanitized_config())
}

#[derive(Serialize)]
pub struct FormatsResponse {
    pub conversions: Vec<ToolRoute>,
}

/// Every supported (source, target) pair and the tool that handles it.
pub async fn list_formats(State(state): State<Arc<AppState>>) -> Json<FormatsResponse> {
    Json(FormatsResponse {
        conversions: state.orchestrator().supported_conversions(),
    })
}

/// Prometheus text exposition.
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    collect_dynamic_metrics(&state).await;
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        encode_metrics(),
    )
}
