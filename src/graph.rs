//! Graph snapshot: the owned adjacency structure behind every version.
//!
//! A [`GraphSnapshot`] holds the node set, forward and backward adjacency,
//! and a token index. Uses BTreeMap/BTreeSet for deterministic iteration
//! order. Cloning yields a fully independent snapshot.
//!
//! ## Invariants
//!
//! - Every edge endpoint exists in the node set.
//! - The edge set is acyclic.
//! - `token_index` lists exactly the nodes currently carrying each token.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::canonical::canonical_hash_hex;
use crate::types::{Edge, Node, NodeDefinition};

/// Error type for graph construction and mutation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// Adding the edge would close a cycle.
    #[error("Edge {from} -> {to} would create a cycle")]
    CycleDetected {
        /// Parent of the rejected edge.
        from: String,
        /// Child of the rejected edge.
        to: String,
    },
    /// The genesis definitions do not form a DAG.
    #[error("Genesis graph is not a DAG: cycle through node {node}")]
    GenesisCycle {
        /// A node lying on a cycle.
        node: String,
    },
    /// A genesis definition lists a child that is not defined.
    #[error("Node {parent} lists undefined child {child}")]
    UnknownChild {
        /// Node whose definition is broken.
        parent: String,
        /// Missing child name.
        child: String,
    },
}

/// The graph's state at one version.
#[derive(Debug, Clone, Default)]
pub struct GraphSnapshot {
    /// Nodes by name.
    pub(crate) nodes: BTreeMap<String, Node>,
    /// Parent -> Children mapping.
    pub(crate) children: BTreeMap<String, BTreeSet<String>>,
    /// Child -> Parents mapping.
    pub(crate) parents: BTreeMap<String, BTreeSet<String>>,
    /// Token -> names of nodes currently carrying it.
    pub(crate) token_index: BTreeMap<String, BTreeSet<String>>,
}

impl GraphSnapshot {
    /// Create a new empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from genesis node definitions.
    ///
    /// Fails if a definition names an undefined child or if the edges
    /// contain a cycle. No partial graph is ever returned.
    pub fn create(definitions: &BTreeMap<String, NodeDefinition>) -> Result<Self, GraphError> {
        let mut snapshot = Self::new();

        for (name, def) in definitions {
            snapshot.insert_node(Node::with_payload(
                name.clone(),
                def.tokens.iter().cloned(),
                def.metadata.clone(),
            ));
        }

        for (name, def) in definitions {
            for child in &def.children {
                if !definitions.contains_key(child) {
                    return Err(GraphError::UnknownChild {
                        parent: name.clone(),
                        child: child.clone(),
                    });
                }
                snapshot.link(name, child);
            }
        }

        if let Some(node) = snapshot.find_cycle_node() {
            return Err(GraphError::GenesisCycle { node });
        }

        tracing::debug!(
            nodes = snapshot.num_nodes(),
            edges = snapshot.num_edges(),
            "Genesis snapshot built"
        );

        Ok(snapshot)
    }

    /// Independent copy of this snapshot.
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Current node names, sorted.
    pub fn node_names(&self) -> BTreeSet<String> {
        self.nodes.keys().cloned().collect()
    }

    /// Token -> names of nodes carrying it in this snapshot.
    pub fn token_index(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.token_index
    }

    /// Names of nodes currently carrying a token.
    pub fn nodes_with_token(&self, token: &str) -> BTreeSet<String> {
        self.token_index.get(token).cloned().unwrap_or_default()
    }

    /// Look up a node by name.
    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.get(name)
    }

    /// Check whether a node exists.
    pub fn contains_node(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Check whether the edge `parent -> child` exists.
    pub fn contains_edge(&self, parent: &str, child: &str) -> bool {
        self.children
            .get(parent)
            .map_or(false, |set| set.contains(child))
    }

    /// Iterate all nodes in name order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// All edges, sorted by (parent, child).
    pub fn edges(&self) -> Vec<Edge> {
        self.children
            .iter()
            .flat_map(|(parent, kids)| kids.iter().map(move |child| Edge::new(parent.clone(), child.clone())))
            .collect()
    }

    /// Child names of a node (sorted).
    pub fn children_of(&self, name: &str) -> Vec<&str> {
        self.children
            .get(name)
            .map(|set| set.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Parent names of a node (sorted).
    pub fn parents_of(&self, name: &str) -> Vec<&str> {
        self.parents
            .get(name)
            .map(|set| set.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Number of nodes.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges.
    pub fn num_edges(&self) -> usize {
        self.children.values().map(BTreeSet::len).sum()
    }

    /// Check if the snapshot has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Content hash over node names, tokens, metadata and edges.
    ///
    /// Two snapshots with the same fingerprint hold the same graph.
    pub fn fingerprint(&self) -> String {
        let nodes: Vec<(&str, &BTreeSet<String>, &str)> = self
            .nodes
            .values()
            .map(|n| (n.name.as_str(), &n.tokens, n.metadata.as_str()))
            .collect();
        canonical_hash_hex(&(nodes, self.edges()))
    }

    /// Check whether `to` can reach `from` by following child edges.
    ///
    /// Adding `from -> to` closes a cycle exactly when this holds.
    pub fn would_create_cycle(&self, from: &str, to: &str) -> bool {
        if from == to {
            return true;
        }

        let mut visited: BTreeSet<&str> = BTreeSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        queue.push_back(to);
        visited.insert(to);

        while let Some(current) = queue.pop_front() {
            if let Some(kids) = self.children.get(current) {
                for kid in kids {
                    if kid == from {
                        return true;
                    }
                    if visited.insert(kid.as_str()) {
                        queue.push_back(kid.as_str());
                    }
                }
            }
        }

        false
    }

    /// Check the whole edge set for cycles.
    pub fn is_acyclic(&self) -> bool {
        self.find_cycle_node().is_none()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Raw structural edits. They keep the indices consistent but do not
    // check acyclicity; the apply module owns that.
    // ─────────────────────────────────────────────────────────────────────

    /// Insert or replace a node, keeping its edges and re-indexing tokens.
    pub(crate) fn insert_node(&mut self, node: Node) {
        if let Some(old) = self.nodes.remove(&node.name) {
            self.unindex_tokens(&old.name, old.tokens.iter());
        }
        self.index_tokens(&node.name, node.tokens.iter());
        self.nodes.insert(node.name.clone(), node);
    }

    /// Remove a node and every incident edge. Returns the removed node.
    pub(crate) fn remove_node(&mut self, name: &str) -> Option<Node> {
        let node = self.nodes.remove(name)?;
        self.unindex_tokens(name, node.tokens.iter());

        if let Some(kids) = self.children.remove(name) {
            for kid in kids {
                remove_from(&mut self.parents, &kid, name);
            }
        }
        if let Some(parents) = self.parents.remove(name) {
            for parent in parents {
                remove_from(&mut self.children, &parent, name);
            }
        }

        Some(node)
    }

    /// Insert the edge `parent -> child`. Returns false if it already existed.
    pub(crate) fn link(&mut self, parent: &str, child: &str) -> bool {
        let added = self
            .children
            .entry(parent.to_string())
            .or_default()
            .insert(child.to_string());
        self.parents
            .entry(child.to_string())
            .or_default()
            .insert(parent.to_string());
        added
    }

    /// Remove the edge `parent -> child`. Returns false if it was absent.
    pub(crate) fn unlink(&mut self, parent: &str, child: &str) -> bool {
        let removed = remove_from(&mut self.children, parent, child);
        remove_from(&mut self.parents, child, parent);
        removed
    }

    /// Attach tokens to an existing node. Returns the newly attached ones.
    pub(crate) fn add_tokens(&mut self, name: &str, tokens: &[String]) -> Vec<String> {
        let Some(node) = self.nodes.get_mut(name) else {
            return Vec::new();
        };
        let added: Vec<String> = tokens
            .iter()
            .filter(|t| node.tokens.insert((*t).clone()))
            .cloned()
            .collect();
        self.index_tokens(name, added.iter());
        added
    }

    /// Detach tokens from an existing node. Returns the detached ones.
    pub(crate) fn remove_tokens(&mut self, name: &str, tokens: &[String]) -> Vec<String> {
        let Some(node) = self.nodes.get_mut(name) else {
            return Vec::new();
        };
        let removed: Vec<String> = tokens
            .iter()
            .filter(|t| node.tokens.remove(t.as_str()))
            .cloned()
            .collect();
        self.unindex_tokens(name, removed.iter());
        removed
    }

    fn index_tokens<'a>(&mut self, name: &str, tokens: impl Iterator<Item = &'a String>) {
        for token in tokens {
            self.token_index
                .entry(token.clone())
                .or_default()
                .insert(name.to_string());
        }
    }

    fn unindex_tokens<'a>(&mut self, name: &str, tokens: impl Iterator<Item = &'a String>) {
        for token in tokens {
            remove_from(&mut self.token_index, token, name);
        }
    }

    /// Kahn's algorithm; returns a node left with nonzero in-degree, if any.
    fn find_cycle_node(&self) -> Option<String> {
        let mut in_degree: BTreeMap<&str, usize> = self
            .nodes
            .keys()
            .map(|name| (name.as_str(), self.parents.get(name).map_or(0, BTreeSet::len)))
            .collect();

        let mut ready: VecDeque<&str> = in_degree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(name, _)| *name)
            .collect();

        let mut processed = 0usize;
        while let Some(name) = ready.pop_front() {
            processed += 1;
            for kid in self.children_of(name) {
                if let Some(d) = in_degree.get_mut(kid) {
                    *d -= 1;
                    if *d == 0 {
                        ready.push_back(kid);
                    }
                }
            }
        }

        if processed == in_degree.len() {
            None
        } else {
            in_degree
                .into_iter()
                .find(|(_, d)| *d > 0)
                .map(|(name, _)| name.to_string())
        }
    }
}

/// Content equality: same nodes (including tokens and metadata) and edges.
impl PartialEq for GraphSnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.nodes.len() == other.nodes.len()
            && self
                .nodes
                .values()
                .zip(other.nodes.values())
                .all(|(a, b)| a.same_payload(b))
            && self.children == other.children
    }
}

impl Eq for GraphSnapshot {}

/// Remove `value` from the set under `key`, dropping the set when emptied.
fn remove_from(map: &mut BTreeMap<String, BTreeSet<String>>, key: &str, value: &str) -> bool {
    let Some(set) = map.get_mut(key) else {
        return false;
    };
    let removed = set.remove(value);
    if set.is_empty() {
        map.remove(key);
    }
    removed
}

/// Build the genesis snapshot from parsed node definitions.
pub fn load_genesis(definitions: &BTreeMap<String, NodeDefinition>) -> Result<GraphSnapshot, GraphError> {
    GraphSnapshot::create(definitions)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Genesis `{A->B, A->C, B->D}`.
    pub(crate) fn sample_definitions() -> BTreeMap<String, NodeDefinition> {
        let mut defs = BTreeMap::new();
        defs.insert("A".to_string(), NodeDefinition::with_children(["B", "C"]));
        defs.insert("B".to_string(), NodeDefinition::with_children(["D"]).tokens(["red"]));
        defs.insert("C".to_string(), NodeDefinition::default().tokens(["red", "blue"]));
        defs.insert("D".to_string(), NodeDefinition::default());
        defs
    }

    pub(crate) fn sample_genesis() -> GraphSnapshot {
        GraphSnapshot::create(&sample_definitions()).unwrap()
    }

    #[test]
    fn test_create_builds_edges_and_tokens() {
        let graph = sample_genesis();

        assert_eq!(graph.num_nodes(), 4);
        assert_eq!(
            graph.edges(),
            vec![Edge::new("A", "B"), Edge::new("A", "C"), Edge::new("B", "D")]
        );
        assert_eq!(graph.parents_of("D"), vec!["B"]);
        assert_eq!(
            graph.nodes_with_token("red"),
            ["B", "C"].iter().map(|s| s.to_string()).collect()
        );
    }

    #[test]
    fn test_create_rejects_cycle() {
        let mut defs = sample_definitions();
        defs.insert("D".to_string(), NodeDefinition::with_children(["A"]));

        let err = GraphSnapshot::create(&defs).unwrap_err();
        assert!(matches!(err, GraphError::GenesisCycle { .. }));
    }

    #[test]
    fn test_create_rejects_self_loop() {
        let mut defs = BTreeMap::new();
        defs.insert("A".to_string(), NodeDefinition::with_children(["A"]));

        assert!(GraphSnapshot::create(&defs).is_err());
    }

    #[test]
    fn test_create_rejects_unknown_child() {
        let mut defs = sample_definitions();
        defs.insert("D".to_string(), NodeDefinition::with_children(["Z"]));

        let err = GraphSnapshot::create(&defs).unwrap_err();
        assert_eq!(
            err,
            GraphError::UnknownChild { parent: "D".to_string(), child: "Z".to_string() }
        );
    }

    #[test]
    fn test_copy_is_independent() {
        let original = sample_genesis();
        let mut copy = original.copy();

        copy.remove_node("B");
        copy.add_tokens("A", &["green".to_string()]);

        assert!(original.contains_node("B"));
        assert!(original.contains_edge("B", "D"));
        assert!(original.nodes_with_token("green").is_empty());
        assert_ne!(original, copy);
    }

    #[test]
    fn test_remove_node_drops_incident_edges_and_tokens() {
        let mut graph = sample_genesis();
        graph.remove_node("B");

        assert!(!graph.contains_edge("A", "B"));
        assert!(graph.parents_of("D").is_empty());
        assert_eq!(graph.nodes_with_token("red").len(), 1);
        assert!(graph.is_acyclic());
    }

    #[test]
    fn test_would_create_cycle() {
        let graph = sample_genesis();

        assert!(graph.would_create_cycle("D", "A"));
        assert!(graph.would_create_cycle("A", "A"));
        assert!(!graph.would_create_cycle("C", "D"));
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = sample_genesis();
        let mut b = sample_genesis();
        assert_eq!(a.fingerprint(), b.fingerprint());

        b.remove_tokens("C", &["blue".to_string()]);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }
}
