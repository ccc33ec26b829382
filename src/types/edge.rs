//! Edge types for the graph timeline.

use serde::{Deserialize, Serialize};

/// Directed edge in the graph, from parent to child.
///
/// Edges carry no attributes. Implements `Ord` for deterministic
/// ordering: (parent, child).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Edge {
    /// Parent node name (source).
    pub parent: String,
    /// Child node name (target).
    pub child: String,
}

impl Edge {
    /// Create a new edge.
    pub fn new(parent: impl Into<String>, child: impl Into<String>) -> Self {
        Self {
            parent: parent.into(),
            child: child.into(),
        }
    }

    /// Check whether the edge touches a node.
    pub fn touches(&self, name: &str) -> bool {
        self.parent == name || self.child == name
    }
}

impl std::fmt::Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.parent, self.child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_ordering() {
        let e1 = Edge::new("A", "B");
        let e2 = Edge::new("A", "C");
        let e3 = Edge::new("B", "C");

        // Same parent, different child
        assert!(e1 < e2);
        // Different parent
        assert!(e1 < e3);
        assert!(e2 < e3);
    }

    #[test]
    fn test_edge_is_directed() {
        assert_ne!(Edge::new("A", "B"), Edge::new("B", "A"));
        assert!(Edge::new("A", "B").touches("B"));
        assert!(!Edge::new("A", "B").touches("C"));
    }
}
