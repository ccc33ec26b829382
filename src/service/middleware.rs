//! Service middleware for request metrics.
//!
//! ## Metrics Exposed
//!
//! Emitted as `tracing` events on target `graph_timeline::metrics`, to be
//! aggregated from logs:
//!
//! - `request_metric` - path, method, status and latency of every request
//! - `view_metric` - size of each rendered view and time spent building it

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::info;

/// Metrics middleware that records request counts and latency.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    info!(
        target: "graph_timeline::metrics",
        metric_type = "request",
        path = %path,
        method = %method,
        status = response.status().as_u16(),
        latency_ms = start.elapsed().as_millis() as u64,
        "request_metric"
    );

    response
}

/// Record view construction metrics.
///
/// Call this after a session query to track view sizes.
pub fn record_view_metrics(node_count: usize, edge_count: usize, relevant_count: usize, latency_ms: u64) {
    info!(
        target: "graph_timeline::metrics",
        metric_type = "view",
        node_count = node_count,
        edge_count = edge_count,
        relevant_count = relevant_count,
        latency_ms = latency_ms,
        "view_metric"
    );
}
