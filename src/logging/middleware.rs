//! Per-request logging and request ids.

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tower_http::request_id::{
    MakeRequestUuid, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tracing::Instrument;

/// Log one line per finished request and run the handler inside a span carrying the
/// request id, so every event it emits can be correlated.
pub async fn log_request(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let request_id = request
        .extensions()
        .get::<RequestId>()
        .and_then(|id| id.header_value().to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let span = tracing::info_span!("request", request_id = %request_id, method = %method, path = %path);
    let response = next.run(request).instrument(span.clone()).await;

    let status = response.status();
    let duration_ms = start.elapsed().as_millis();
    let _entered = span.enter();

    if status.is_server_error() {
        tracing::error!(status = %status, duration_ms, "request failed");
    } else if status.is_client_error() {
        tracing::warn!(status = %status, duration_ms, "request rejected");
    } else if path.starts_with("/health") || path.starts_with("/uploads") {
        // health checks and static files are noisy at info
        tracing::debug!(status = %status, duration_ms, "request completed");
    } else {
        tracing::info!(status = %status, duration_ms, "request completed");
    }

    response
}

pub fn request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::x_request_id(MakeRequestUuid)
}

pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::x_request_id()
}
