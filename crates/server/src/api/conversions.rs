//! Conversion API handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use filemill_core::{
    ConversionResult, ConversionTask, ErrorKind, OrchestratorError, QueueStats, TaskId,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for submitting a conversion
#[derive(Debug, Deserialize)]
pub struct ConversionRequest {
    /// File already present on the server's filesystem
    pub source_path: PathBuf,
    /// Source format as an extension or MIME type
    pub source_format: String,
    /// Target format as an extension or MIME type
    pub target_format: String,
}

/// Response for an accepted conversion
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub task_id: TaskId,
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ConversionErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
}

type ApiError = (StatusCode, Json<ConversionErrorResponse>);

fn error_response(err: OrchestratorError) -> ApiError {
    let status = match &err {
        OrchestratorError::TaskNotFound(_) => StatusCode::NOT_FOUND,
        OrchestratorError::AlreadyTerminal { .. } => StatusCode::CONFLICT,
        OrchestratorError::Converter(e) => match e.kind() {
            ErrorKind::UnsupportedConversion => StatusCode::BAD_REQUEST,
            ErrorKind::SourceUnreadable => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        },
        OrchestratorError::Cache(_) | OrchestratorError::Io(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    (
        status,
        Json(ConversionErrorResponse {
            kind: err.kind(),
            error: err.to_string(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Enqueue a conversion
pub async fn submit_conversion(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ConversionRequest>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let task_id = state
        .orchestrator()
        .submit_conversion(&body.source_path, &body.source_format, &body.target_format)
        .await
        .map_err(error_response)?;

    debug!(task_id = %task_id, "Conversion accepted");
    Ok((StatusCode::ACCEPTED, Json(SubmitResponse { task_id })))
}

/// Get a task snapshot by ID
pub async fn get_conversion(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ConversionTask>, ApiError> {
    state
        .orchestrator()
        .get_status(&id)
        .await
        .map(Json)
        .map_err(error_response)
}

/// Wait for a task to finish and return its result
pub async fn get_conversion_result(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ConversionResult>, ApiError> {
    state
        .orchestrator()
        .get_result(&id)
        .await
        .map(Json)
        .map_err(error_response)
}

/// Cancel a pending or processing task
pub async fn cancel_conversion(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ConversionTask>, ApiError> {
    state
        .orchestrator()
        .cancel(&id)
        .await
        .map(Json)
        .map_err(error_response)
}

/// Convert synchronously: 200 with the result on success, 422 on failure
pub async fn convert(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ConversionRequest>,
) -> (StatusCode, Json<ConversionResult>) {
    let result = state
        .orchestrator()
        .convert(&body.source_path, &body.source_format, &body.target_format)
        .await;

    let status = if result.success {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    (status, Json(result))
}

/// Queue counters
pub async fn processor_status(State(state): State<Arc<AppState>>) -> Json<QueueStats> {
    Json(state.orchestrator().processor_stats().await)
}
