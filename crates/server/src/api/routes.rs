use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{cache, conversions, handlers, middleware::metrics_middleware, ws};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health, config and capabilities
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/formats", get(handlers::list_formats))
        // Conversions
        .route("/conversions", post(conversions::submit_conversion))
        .route("/conversions/{id}", get(conversions::get_conversion))
        .route("/conversions/{id}", delete(conversions::cancel_conversion))
        .route("/conversions/{id}/result", get(conversions::get_conversion_result))
        .route("/convert", post(conversions::convert))
        .route("/processor/status", get(conversions::processor_status))
        // Cache administration
        .route("/cache/stats", get(cache::get_stats))
        .route("/cache", delete(cache::clear_cache))
        .route("/cache/reconcile", post(cache::reconcile))
        // Real-time task events
        .route("/ws", get(ws::ws_handler))
        .with_state(Arc::clone(&state));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}
