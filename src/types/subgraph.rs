//! Induced subgraph export.
//!
//! The result of reachability extraction: a node subset plus exactly the
//! snapshot edges connecting members of that subset. Nodes are ordered by
//! name and edges by (parent, child) so exports are deterministic.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::edge::Edge;
use super::node::Node;
use crate::canonical::canonical_hash_hex;

/// A node subset and the edges among its members.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InducedSubgraph {
    /// Visited nodes with their current tokens and metadata (sorted by name).
    pub nodes: Vec<Node>,
    /// Edges whose endpoints were both visited (sorted).
    pub edges: Vec<Edge>,
}

impl InducedSubgraph {
    /// Create a subgraph, sorting nodes and edges.
    pub fn new(mut nodes: Vec<Node>, mut edges: Vec<Edge>) -> Self {
        nodes.sort();
        nodes.dedup();
        edges.sort();
        edges.dedup();
        Self { nodes, edges }
    }

    /// An empty subgraph ("filtered to nothing").
    pub fn empty() -> Self {
        Self::default()
    }

    /// Check whether a node is part of the subgraph.
    pub fn contains_node(&self, name: &str) -> bool {
        self.nodes
            .binary_search_by(|n| n.name.as_str().cmp(name))
            .is_ok()
    }

    /// Check whether an edge is part of the subgraph.
    pub fn contains_edge(&self, parent: &str, child: &str) -> bool {
        self.edges
            .iter()
            .any(|e| e.parent == parent && e.child == child)
    }

    /// Names of the nodes in the subgraph.
    pub fn node_names(&self) -> BTreeSet<String> {
        self.nodes.iter().map(|n| n.name.clone()).collect()
    }

    /// Number of nodes.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges.
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Check if the subgraph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Content hash over node names, tokens, metadata and edges.
    pub fn fingerprint(&self) -> String {
        let nodes: Vec<(&str, &BTreeSet<String>, &str)> = self
            .nodes
            .iter()
            .map(|n| (n.name.as_str(), &n.tokens, n.metadata.as_str()))
            .collect();
        canonical_hash_hex(&(nodes, &self.edges))
    }
}
