//! Graph Timeline REST Service
//!
//! Exposes a loaded timeline over HTTP for the browser client.
//!
//! ## Endpoints
//!
//! - `GET /data?depth&mutationNum&nodeName&tokenName` - Navigate and render a view
//! - `GET /health` - Detailed service health check
//! - `GET /health/live` - Liveness probe

pub mod middleware;
pub mod routes;
pub mod state;

pub use middleware::{metrics_middleware, record_view_metrics};
pub use routes::{create_router, ErrorResponse, GraphViewDto};
pub use state::{ServiceConfig, ServiceState};
