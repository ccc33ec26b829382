//! Axum routes for the graph timeline service.

use axum::{
    extract::{Json, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::navigator::NavigationError;
use crate::timeline::{GraphView, ViewQuery};
use crate::types::{Edge, MutationBatch, Node};
use crate::GRAPH_TIMELINE_SCHEMA_VERSION;

use super::middleware::record_view_metrics;
use super::state::ServiceState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query string of `GET /data`.
///
/// Kept as raw strings so that a missing or malformed value is reported
/// with its own error code rather than a generic extractor rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataParams {
    /// Maximum hops from the searched nodes. Required.
    pub depth: Option<String>,
    /// Version to show. Required.
    pub mutation_num: Option<String>,
    /// Searched node name.
    pub node_name: Option<String>,
    /// Searched token.
    pub token_name: Option<String>,
}

impl DataParams {
    /// Validate parameters into a view query.
    pub fn into_query(self) -> Result<ViewQuery, ErrorResponse> {
        let depth_raw = self
            .depth
            .ok_or_else(|| ErrorResponse::new("MISSING_PARAMETER", "Improper depth parameter, cannot generate graph"))?;
        let version_raw = self.mutation_num.ok_or_else(|| {
            ErrorResponse::new("MISSING_PARAMETER", "Improper mutation number parameter, cannot generate graph")
        })?;

        let depth: usize = depth_raw.trim().parse().map_err(|_| {
            ErrorResponse::new("INVALID_DEPTH", "Depth must be a non-negative integer").with_details(depth_raw.clone())
        })?;
        let version: i64 = version_raw.trim().parse().map_err(|_| {
            ErrorResponse::new("INVALID_VERSION", "Mutation number must be an integer").with_details(version_raw.clone())
        })?;

        Ok(ViewQuery {
            version,
            depth,
            node_name: self.node_name.unwrap_or_default(),
            token: self.token_name.unwrap_or_default(),
        })
    }
}

/// One node of the rendered graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDto {
    /// Node name.
    pub name: String,
    /// Tokens, sorted.
    pub tokens: Vec<String>,
    /// Opaque metadata.
    pub metadata: String,
}

impl From<Node> for NodeDto {
    fn from(node: Node) -> Self {
        Self {
            name: node.name,
            tokens: node.tokens.into_iter().collect(),
            metadata: node.metadata,
        }
    }
}

/// Informational view state for the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionDto {
    /// Machine-readable name.
    pub kind: String,
    /// Message to display.
    pub message: String,
}

/// Response of `GET /data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphViewDto {
    /// Schema version of this payload.
    pub schema_version: String,
    /// Version shown.
    pub version: usize,
    /// Visible nodes.
    pub nodes: Vec<NodeDto>,
    /// Visible edges.
    pub edges: Vec<Edge>,
    /// Indices of log batches relevant to the view.
    pub mutation_indices: Vec<usize>,
    /// Batch just applied, filtered to the view. Absent when not moving forward.
    pub mutation_diff: Option<MutationBatch>,
    /// Total number of batches.
    pub num_mutations: usize,
    /// Names the view was expanded from.
    pub queried: Vec<String>,
    /// Fingerprint of the whole snapshot at this version.
    pub snapshot_hash: String,
    /// Informational state, if any.
    pub condition: Option<ConditionDto>,
}

impl From<GraphView> for GraphViewDto {
    fn from(view: GraphView) -> Self {
        Self {
            schema_version: GRAPH_TIMELINE_SCHEMA_VERSION.to_string(),
            version: view.version,
            nodes: view.subgraph.nodes.into_iter().map(NodeDto::from).collect(),
            edges: view.subgraph.edges,
            mutation_indices: view.relevant_indices,
            mutation_diff: view.diff,
            num_mutations: view.num_mutations,
            queried: view.queried.into_iter().collect(),
            snapshot_hash: view.snapshot_hash,
            condition: view.condition.map(|c| ConditionDto {
                kind: c.kind().to_string(),
                message: c.message().to_string(),
            }),
        }
    }
}

/// Service health response (detailed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `healthy` once the timeline is loaded.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Payload schema version.
    pub schema_version: String,
    /// Nodes in the genesis graph.
    pub genesis_nodes: usize,
    /// Batches in the log.
    pub num_mutations: usize,
    /// Version the shared session sits at.
    pub current_version: usize,
}

/// Simple liveness response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessResponse {
    /// Always `alive`.
    pub status: String,
}

/// Structured error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
    /// Machine-readable error code.
    pub code: String,
    /// Additional error details (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    /// Create a new error response with code and message.
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            details: None,
        }
    }

    /// Add details to the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// HTTP status for this error code.
    pub fn status(&self) -> StatusCode {
        match self.code.as_str() {
            "REPLAY_FAILED" => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<NavigationError> for ErrorResponse {
    fn from(err: NavigationError) -> Self {
        match err {
            NavigationError::InvalidVersion { requested, max } => {
                ErrorResponse::new("INVALID_VERSION", format!("Mutation number must be in 0..={}", max))
                    .with_details(requested.to_string())
            }
            other @ NavigationError::Replay { .. } => ErrorResponse::new("REPLAY_FAILED", other.to_string()),
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> axum::response::Response {
        tracing::warn!(
            code = %self.code,
            error = %self.error,
            details = ?self.details,
            "Request error"
        );
        (self.status(), Json(self)).into_response()
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Navigate the shared session and render the requested view.
async fn data_handler(
    State(state): State<Arc<ServiceState>>,
    Query(params): Query<DataParams>,
) -> Result<Json<GraphViewDto>, ErrorResponse> {
    let query = params.into_query()?;
    let start = Instant::now();

    // A backward step replays the whole log; keep it off the async workers.
    let worker = Arc::clone(&state);
    let view = tokio::task::spawn_blocking(move || {
        let mut session = worker.session.lock();
        session.query(&worker.timeline, &query)
    })
    .await
    .map_err(|e| ErrorResponse::new("REPLAY_FAILED", format!("View worker failed: {}", e)))??;

    record_view_metrics(
        view.subgraph.num_nodes(),
        view.subgraph.num_edges(),
        view.relevant_indices.len(),
        start.elapsed().as_millis() as u64,
    );

    Ok(Json(view.into()))
}

/// Health check endpoint (detailed).
async fn health_handler(State(state): State<Arc<ServiceState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        schema_version: GRAPH_TIMELINE_SCHEMA_VERSION.to_string(),
        genesis_nodes: state.timeline.genesis().num_nodes(),
        num_mutations: state.timeline.num_mutations(),
        current_version: state.current_version(),
    })
}

/// Liveness probe endpoint.
///
/// Returns 200 if the process is alive.
async fn liveness_handler() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "alive".to_string(),
    })
}

// ============================================================================
// Router Construction
// ============================================================================

/// Create the Axum router for the graph timeline service.
pub fn create_router(state: ServiceState) -> Router {
    let state = Arc::new(state);

    Router::new()
        .route("/data", get(data_handler))
        .route("/health", get(health_handler))
        .route("/health/live", get(liveness_handler))
        .with_state(state)
}
