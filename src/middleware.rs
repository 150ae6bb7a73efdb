//! Request instrumentation layer.
//!
//! Every request passing through the router, including `/metrics` and
//! `/health` scrapes, is counted by `(method, path, status)` and its
//! wall-clock duration observed by `(method, path)`.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::trace;

use crate::state::SharedState;

/// Records request count and latency around the inner service.
///
/// The status comes from the response the inner service produced. Handlers
/// that never set one yield 200, which is what gets recorded.
pub async fn track_requests(
    State(state): State<SharedState>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().as_str().to_owned();
    let path = request.uri().path().to_owned();

    let response = next.run(request).await;

    let elapsed = start.elapsed().as_secs_f64();
    let status = response.status().as_u16();
    state
        .metrics
        .observe_request(&method, &path, status, elapsed);

    trace!("{} {} -> {} in {:.6}s", method, path, status, elapsed);
    response
}
