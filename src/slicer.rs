//! Depth-bounded reachability extraction.
//!
//! Expands around a set of root nodes and returns the induced subgraph:
//! the visited nodes plus exactly the snapshot edges among them.
//!
//! ## Algorithm
//!
//! 1. Seed the frontier with every root present in the snapshot (distance 0)
//! 2. While the frontier is not empty:
//!    - Pop the next candidate (FIFO, so distances are non-decreasing)
//!    - Stop expanding it if it sits at `max_depth`
//!    - Push unvisited parents and children at distance + 1
//! 3. Collect edges whose endpoints were both visited
//!
//! Edges are followed in both directions: the display shows ancestors and
//! descendants around a searched node.

use std::collections::{BTreeSet, VecDeque};

use crate::graph::GraphSnapshot;
use crate::types::InducedSubgraph;

/// Induced subgraph within `max_depth` undirected hops of any root.
///
/// With no roots, or no root present in the snapshot, returns the whole
/// graph: "no filter" is the default display mode.
pub fn reachable_subgraph(
    snapshot: &GraphSnapshot,
    roots: &BTreeSet<String>,
    max_depth: usize,
) -> InducedSubgraph {
    let present: Vec<&str> = roots
        .iter()
        .map(String::as_str)
        .filter(|name| snapshot.contains_node(name))
        .collect();

    if present.is_empty() {
        return full_graph(snapshot);
    }

    let mut visited: BTreeSet<&str> = BTreeSet::new();
    let mut frontier: VecDeque<(&str, usize)> = VecDeque::new();

    for root in present {
        visited.insert(root);
        frontier.push_back((root, 0));
    }

    while let Some((name, distance)) = frontier.pop_front() {
        // Skip expansion if at max depth
        if distance >= max_depth {
            continue;
        }

        let neighbours = snapshot
            .parents_of(name)
            .into_iter()
            .chain(snapshot.children_of(name));

        for next in neighbours {
            if visited.insert(next) {
                frontier.push_back((next, distance + 1));
            }
        }
    }

    let nodes = visited
        .iter()
        .filter_map(|name| snapshot.node(name).cloned())
        .collect();

    let edges = snapshot
        .edges()
        .into_iter()
        .filter(|e| visited.contains(e.parent.as_str()) && visited.contains(e.child.as_str()))
        .collect();

    let subgraph = InducedSubgraph::new(nodes, edges);
    tracing::debug!(
        roots = roots.len(),
        max_depth,
        nodes = subgraph.num_nodes(),
        edges = subgraph.num_edges(),
        "Reachable subgraph extracted"
    );
    subgraph
}

/// The whole snapshot as an induced subgraph.
pub fn full_graph(snapshot: &GraphSnapshot) -> InducedSubgraph {
    InducedSubgraph::new(snapshot.nodes().cloned().collect(), snapshot.edges())
}
