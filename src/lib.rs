//! # graph-timeline-kernel
//!
//! Versioned DAG engine for stepping through a graph's mutation history.
//!
//! The kernel answers one question:
//!
//! > Given a version and a search, which part of the graph is visible and
//! > which mutations **concern it**?
//!
//! ## Core Contract
//!
//! 1. Load a genesis graph and an immutable log of mutation batches once
//! 2. Navigate to any version: forward by incremental replay, backward by
//!    full replay from genesis
//! 3. Extract a depth-bounded induced subgraph around searched nodes
//! 4. Report the log batches relevant to the visible nodes, and the
//!    just-applied batch filtered to them
//!
//! ## Architecture
//!
//! ```text
//! NodeDefinitions ─→ GraphSnapshot (genesis) ─┐
//! RawBatches ──────→ MutationLog ─────────────┼─→ Timeline ─→ Session::query ─→ GraphView
//!                                             └─→ RelevanceIndex
//! ```
//!
//! ## Invariants
//!
//! - Every snapshot at every version is acyclic; a cycle-closing edge is
//!   rejected and the snapshot is left unchanged
//! - Genesis and the log are never mutated after load
//! - Version V is genesis with batches `[0, V)` applied, whichever replay
//!   path produced it

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod graph;
pub mod apply;
pub mod log;
pub mod navigator;
pub mod slicer;
pub mod relevance;
pub mod timeline;
pub mod canonical;
pub mod loader;

#[cfg(feature = "service")]
pub mod service;

// Re-exports
pub use types::{Node, NodeDefinition, Edge, Mutation, MutationBatch, TokenOp, InducedSubgraph};
pub use graph::{GraphSnapshot, GraphError, load_genesis};
pub use apply::{apply, apply_batch};
pub use log::{MutationLog, RawMutation, RawBatch, RawTokenChange, LogError, load_mutation_log, load_flat_mutation_log};
pub use navigator::{graph_at_version, check_version, NavigationError};
pub use slicer::{reachable_subgraph, full_graph};
pub use relevance::{RelevanceIndex, filter_batch, NO_FILTER};
pub use timeline::{Timeline, Session, ViewQuery, GraphView, ViewCondition};
pub use canonical::{to_canonical_bytes, canonical_hash, canonical_hash_hex};
pub use loader::{LoadError, parse_genesis, parse_mutation_log, load_timeline};

// Service re-exports (when service feature is enabled)
#[cfg(feature = "service")]
pub use service::{create_router, ServiceConfig, ServiceState};

/// Schema version of the exported view payloads.
/// Increment on breaking changes to any exported type.
pub const GRAPH_TIMELINE_SCHEMA_VERSION: &str = "1.0.0";
