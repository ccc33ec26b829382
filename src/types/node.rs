//! Node types for the graph timeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

/// A node in the versioned graph.
///
/// Identity is the name alone. Tokens and metadata are payload that may
/// legitimately differ between versions of the "same" logical node, so
/// `PartialEq`, `Eq`, `Hash` and `Ord` only look at `name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Unique, stable node name.
    pub name: String,
    /// Tokens currently attached to the node (order irrelevant).
    pub tokens: BTreeSet<String>,
    /// Opaque metadata blob. Never parsed by the engine.
    #[serde(default)]
    pub metadata: String,
}

impl Node {
    /// Create a node with no tokens and empty metadata.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tokens: BTreeSet::new(),
            metadata: String::new(),
        }
    }

    /// Create a node with tokens and metadata.
    pub fn with_payload<I, T>(name: impl Into<String>, tokens: I, metadata: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            name: name.into(),
            tokens: tokens.into_iter().map(Into::into).collect(),
            metadata: metadata.into(),
        }
    }

    /// Check whether the node carries a token.
    pub fn has_token(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }

    /// Compare name, tokens and metadata.
    ///
    /// `==` only compares names; use this when payload matters.
    pub fn same_payload(&self, other: &Self) -> bool {
        self.name == other.name && self.tokens == other.tokens && self.metadata == other.metadata
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.name.cmp(&other.name)
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Parsed definition of a genesis node, as handed over by the loader.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDefinition {
    /// Names of the node's children.
    #[serde(default)]
    pub children: Vec<String>,
    /// Tokens attached at genesis.
    #[serde(default)]
    pub tokens: Vec<String>,
    /// Opaque metadata blob.
    #[serde(default)]
    pub metadata: String,
}

impl NodeDefinition {
    /// Definition with the given children and no payload.
    pub fn with_children<I, T>(children: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            children: children.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Builder-style token setter.
    pub fn tokens<I, T>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tokens = tokens.into_iter().map(Into::into).collect();
        self
    }
}
