//! The mutation log and its raw descriptor format.
//!
//! A [`MutationLog`] is an immutable, 0-indexed sequence of batches. It is
//! built once from parsed [`RawBatch`]es (or a flat list of
//! [`RawMutation`]s, one per batch) and never changes afterwards.

use serde::{Deserialize, Serialize};

use crate::types::{Mutation, MutationBatch, TokenOp};

/// Error type for mutation log loading.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LogError {
    /// The descriptor type is not recognized.
    #[error("Batch {batch}, mutation {position}: unknown mutation type {kind:?}")]
    UnknownMutationType {
        /// Batch index.
        batch: usize,
        /// Position within the batch.
        position: usize,
        /// The offending type string.
        kind: String,
    },
    /// No start node given.
    #[error("Batch {batch}, mutation {position}: missing start node")]
    MissingStartNode {
        /// Batch index.
        batch: usize,
        /// Position within the batch.
        position: usize,
    },
    /// Edge mutation without an end node.
    #[error("Batch {batch}, mutation {position}: edge mutation is missing its end node")]
    MissingEndNode {
        /// Batch index.
        batch: usize,
        /// Position within the batch.
        position: usize,
    },
    /// Token mutation without a token change.
    #[error("Batch {batch}, mutation {position}: token mutation is missing its token change")]
    MissingTokenChange {
        /// Batch index.
        batch: usize,
        /// Position within the batch.
        position: usize,
    },
    /// The token change type is not recognized.
    #[error("Batch {batch}, mutation {position}: unknown token change type {kind:?}")]
    UnknownTokenOp {
        /// Batch index.
        batch: usize,
        /// Position within the batch.
        position: usize,
        /// The offending type string.
        kind: String,
    },
}

/// Token change part of a raw descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTokenChange {
    /// `ADD_TOKEN` or `DELETE_TOKEN`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Tokens to add or remove.
    #[serde(default, alias = "tokenName", alias = "tokens")]
    pub token_name: Vec<String>,
}

/// Elementary mutation as handed over by the loader.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMutation {
    /// `ADD_NODE`, `ADD_EDGE`, `DELETE_NODE`, `DELETE_EDGE` or `CHANGE_TOKEN`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Node name, or edge parent.
    #[serde(default, alias = "startNode")]
    pub start_node: String,
    /// Edge child (edge mutations only).
    #[serde(default, alias = "endNode")]
    pub end_node: String,
    /// Token change (token mutations only).
    #[serde(default, alias = "tokenChange")]
    pub token_change: Option<RawTokenChange>,
}

impl RawMutation {
    /// Convert to a typed mutation. `batch` and `position` locate errors.
    pub fn to_mutation(&self, batch: usize, position: usize) -> Result<Mutation, LogError> {
        if self.start_node.is_empty() {
            return Err(LogError::MissingStartNode { batch, position });
        }
        let name = self.start_node.clone();

        let edge_end = || {
            if self.end_node.is_empty() {
                Err(LogError::MissingEndNode { batch, position })
            } else {
                Ok(self.end_node.clone())
            }
        };

        match self.kind.to_uppercase().as_str() {
            "ADD_NODE" => Ok(Mutation::AddNode { name }),
            "DELETE_NODE" => Ok(Mutation::DeleteNode { name }),
            "ADD_EDGE" => Ok(Mutation::AddEdge { from: name, to: edge_end()? }),
            "DELETE_EDGE" => Ok(Mutation::DeleteEdge { from: name, to: edge_end()? }),
            "CHANGE_TOKEN" => {
                let change = self
                    .token_change
                    .as_ref()
                    .ok_or(LogError::MissingTokenChange { batch, position })?;
                let op = TokenOp::from_str(&change.kind).ok_or_else(|| LogError::UnknownTokenOp {
                    batch,
                    position,
                    kind: change.kind.clone(),
                })?;
                Ok(Mutation::ChangeToken {
                    name,
                    op,
                    tokens: change.token_name.clone(),
                })
            }
            _ => Err(LogError::UnknownMutationType {
                batch,
                position,
                kind: self.kind.clone(),
            }),
        }
    }
}

/// Batch of raw descriptors applied as one version step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawBatch {
    /// Descriptors in application order.
    #[serde(default, alias = "mutation")]
    pub mutations: Vec<RawMutation>,
}

/// Immutable, ordered sequence of mutation batches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationLog {
    batches: Vec<MutationBatch>,
}

impl MutationLog {
    /// Create a log from batches.
    pub fn new(batches: Vec<MutationBatch>) -> Self {
        Self { batches }
    }

    /// Create a flat log: one mutation per version step.
    pub fn from_flat(mutations: Vec<Mutation>) -> Self {
        Self {
            batches: mutations.into_iter().map(MutationBatch::single).collect(),
        }
    }

    /// Number of batches (the highest valid version).
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    /// Check if the log is empty.
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Batch at an index.
    pub fn batch(&self, index: usize) -> Option<&MutationBatch> {
        self.batches.get(index)
    }

    /// All batches in order.
    pub fn batches(&self) -> &[MutationBatch] {
        &self.batches
    }

    /// Iterate `(index, batch)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &MutationBatch)> {
        self.batches.iter().enumerate()
    }

    /// Total number of elementary mutations across all batches.
    pub fn total_mutations(&self) -> usize {
        self.batches.iter().map(MutationBatch::len).sum()
    }
}

/// Build a log from parsed raw batches.
pub fn load_mutation_log(raw: &[RawBatch]) -> Result<MutationLog, LogError> {
    let batches = raw
        .iter()
        .enumerate()
        .map(|(batch, raw_batch)| {
            raw_batch
                .mutations
                .iter()
                .enumerate()
                .map(|(position, m)| m.to_mutation(batch, position))
                .collect::<Result<MutationBatch, LogError>>()
        })
        .collect::<Result<Vec<_>, _>>()?;

    let log = MutationLog::new(batches);
    tracing::info!(
        batches = log.len(),
        mutations = log.total_mutations(),
        "Mutation log loaded"
    );
    Ok(log)
}

/// Build a flat log (one mutation per batch) from parsed raw mutations.
pub fn load_flat_mutation_log(raw: &[RawMutation]) -> Result<MutationLog, LogError> {
    let batches: Vec<RawBatch> = raw
        .iter()
        .map(|m| RawBatch { mutations: vec![m.clone()] })
        .collect();
    load_mutation_log(&batches)
}
