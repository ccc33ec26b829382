//! Core types for the graph timeline.

pub mod node;
pub mod edge;
pub mod mutation;
pub mod subgraph;

pub use node::{Node, NodeDefinition};
pub use edge::Edge;
pub use mutation::{Mutation, MutationBatch, TokenOp};
pub use subgraph::InducedSubgraph;
