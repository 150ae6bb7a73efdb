//! HTTP route table.

use axum::{http::StatusCode, middleware, response::IntoResponse, routing::get, Router};

use crate::handlers::{health_handler, metrics_handler, root_handler};
use crate::middleware::track_requests;
use crate::state::SharedState;

/// Builds the router with all endpoints wrapped by request instrumentation.
///
/// The fallback is registered before the layer so unmatched paths are
/// counted with their 404 status.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), track_requests))
        .with_state(state)
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "404 page not found\n")
}
