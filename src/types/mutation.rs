//! Mutation types.
//!
//! A [`Mutation`] is one elementary change to the graph. Mutations are grouped
//! into [`MutationBatch`]es; one batch is one version step.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Direction of a token change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenOp {
    /// Attach tokens (idempotent).
    Add,
    /// Detach tokens (absent tokens are ignored).
    Remove,
}

impl TokenOp {
    /// Parse a token op from its wire name.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "ADD" | "ADD_TOKEN" => Some(Self::Add),
            "REMOVE" | "DELETE" | "DELETE_TOKEN" | "REMOVE_TOKEN" => Some(Self::Remove),
            _ => None,
        }
    }
}

impl std::fmt::Display for TokenOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Add => write!(f, "add"),
            Self::Remove => write!(f, "remove"),
        }
    }
}

/// One elementary graph mutation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mutation {
    /// Create a node with no tokens and no edges.
    AddNode {
        /// Node name.
        name: String,
    },
    /// Create the edge `from -> to`.
    AddEdge {
        /// Parent node.
        from: String,
        /// Child node.
        to: String,
    },
    /// Remove a node and every edge touching it.
    DeleteNode {
        /// Node name.
        name: String,
    },
    /// Remove the edge `from -> to`.
    DeleteEdge {
        /// Parent node.
        from: String,
        /// Child node.
        to: String,
    },
    /// Add or remove tokens on a node.
    ChangeToken {
        /// Target node.
        name: String,
        /// Add or remove.
        op: TokenOp,
        /// Tokens to add or remove.
        tokens: Vec<String>,
    },
}

impl Mutation {
    /// `AddNode(name)`.
    pub fn add_node(name: impl Into<String>) -> Self {
        Self::AddNode { name: name.into() }
    }

    /// `AddEdge(from, to)`.
    pub fn add_edge(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::AddEdge { from: from.into(), to: to.into() }
    }

    /// `DeleteNode(name)`.
    pub fn delete_node(name: impl Into<String>) -> Self {
        Self::DeleteNode { name: name.into() }
    }

    /// `DeleteEdge(from, to)`.
    pub fn delete_edge(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::DeleteEdge { from: from.into(), to: to.into() }
    }

    /// `ChangeToken(name, op, tokens)`.
    pub fn change_token<I, T>(name: impl Into<String>, op: TokenOp, tokens: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self::ChangeToken {
            name: name.into(),
            op,
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    /// Names of the nodes this mutation references.
    ///
    /// The created/deleted node, both edge endpoints, or the token target.
    pub fn touched_nodes(&self) -> Vec<&str> {
        match self {
            Self::AddNode { name } | Self::DeleteNode { name } | Self::ChangeToken { name, .. } => {
                vec![name.as_str()]
            }
            Self::AddEdge { from, to } | Self::DeleteEdge { from, to } => {
                vec![from.as_str(), to.as_str()]
            }
        }
    }

    /// Check whether the mutation references any of the given names.
    pub fn touches_any(&self, names: &BTreeSet<String>) -> bool {
        self.touched_nodes().into_iter().any(|n| names.contains(n))
    }

    /// Tokens mentioned by a `ChangeToken` mutation; empty otherwise.
    pub fn tokens(&self) -> &[String] {
        match self {
            Self::ChangeToken { tokens, .. } => tokens,
            _ => &[],
        }
    }

    /// Short kind label, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AddNode { .. } => "add_node",
            Self::AddEdge { .. } => "add_edge",
            Self::DeleteNode { .. } => "delete_node",
            Self::DeleteEdge { .. } => "delete_edge",
            Self::ChangeToken { .. } => "change_token",
        }
    }
}

impl std::fmt::Display for Mutation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AddNode { name } => write!(f, "AddNode({})", name),
            Self::AddEdge { from, to } => write!(f, "AddEdge({}, {})", from, to),
            Self::DeleteNode { name } => write!(f, "DeleteNode({})", name),
            Self::DeleteEdge { from, to } => write!(f, "DeleteEdge({}, {})", from, to),
            Self::ChangeToken { name, op, tokens } => {
                write!(f, "ChangeToken({}, {}, [{}])", name, op, tokens.join(", "))
            }
        }
    }
}

/// Ordered group of mutations applied together as one version step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationBatch {
    /// Mutations in application order.
    pub mutations: Vec<Mutation>,
}

impl MutationBatch {
    /// Create a batch from mutations.
    pub fn new(mutations: Vec<Mutation>) -> Self {
        Self { mutations }
    }

    /// A batch holding a single mutation.
    pub fn single(mutation: Mutation) -> Self {
        Self { mutations: vec![mutation] }
    }

    /// Names of every node referenced by any mutation in the batch.
    pub fn touched_nodes(&self) -> BTreeSet<&str> {
        self.mutations.iter().flat_map(Mutation::touched_nodes).collect()
    }

    /// Number of mutations in the batch.
    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    /// Check if the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    /// Iterate the mutations in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Mutation> {
        self.mutations.iter()
    }
}

impl From<Mutation> for MutationBatch {
    fn from(mutation: Mutation) -> Self {
        Self::single(mutation)
    }
}

impl FromIterator<Mutation> for MutationBatch {
    fn from_iter<I: IntoIterator<Item = Mutation>>(iter: I) -> Self {
        Self { mutations: iter.into_iter().collect() }
    }
}

impl<'a> IntoIterator for &'a MutationBatch {
    type Item = &'a Mutation;
    type IntoIter = std::slice::Iter<'a, Mutation>;

    fn into_iter(self) -> Self::IntoIter {
        self.mutations.iter()
    }
}
