//! Root endpoint handler for the landing page.

use axum::{http::StatusCode, response::IntoResponse};
use tracing::{debug, instrument};

pub const ROOT_BODY: &str = "Test Server is running\n\
                             Metrics available at /metrics\n\
                             Health check at /health\n";

/// Handler for the root `/` endpoint.
#[instrument]
pub async fn root_handler() -> impl IntoResponse {
    debug!("Processing / request");
    (
        StatusCode::OK,
        [("Content-Type", "text/plain; charset=utf-8")],
        ROOT_BODY,
    )
}
