//! Health check endpoint handler.
//!
//! `/health` answers `OK` without probing the sampler, so a stalled sampler
//! never turns the server unhealthy.

use axum::{http::StatusCode, response::IntoResponse};
use tracing::{debug, instrument};

pub const HEALTH_BODY: &str = "OK\n";

/// Handler for the /health endpoint.
#[instrument]
pub async fn health_handler() -> impl IntoResponse {
    debug!("Processing /health request");
    (
        StatusCode::OK,
        [("Content-Type", "text/plain; charset=utf-8")],
        HEALTH_BODY,
    )
}
