//! JSON loading of genesis definitions and mutation logs.
//!
//! ## File formats
//!
//! Genesis:
//!
//! ```json
//! { "nodes": { "A": { "children": ["B"], "tokens": ["red"], "metadata": "..." },
//!              "B": {} } }
//! ```
//!
//! Mutations, either batched or flat (one mutation per version step):
//!
//! ```json
//! { "batches": [ { "mutations": [ { "type": "ADD_NODE", "start_node": "E" } ] } ] }
//! { "mutations": [ { "type": "ADD_EDGE", "start_node": "A", "end_node": "E" } ] }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::graph::{load_genesis, GraphError, GraphSnapshot};
use crate::log::{load_flat_mutation_log, load_mutation_log, LogError, MutationLog, RawBatch, RawMutation};
use crate::navigator::NavigationError;
use crate::timeline::Timeline;
use crate::types::NodeDefinition;

/// Error type for loading.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// Offending path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The content is not valid JSON for the expected shape.
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// Genesis definitions are inconsistent.
    #[error("Invalid genesis graph: {0}")]
    Graph(#[from] GraphError),
    /// A mutation descriptor is malformed.
    #[error("Invalid mutation log: {0}")]
    Log(#[from] LogError),
    /// The log cannot be replayed on the genesis graph.
    #[error("Mutation log does not replay: {0}")]
    Replay(#[from] NavigationError),
}

/// Genesis file contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenesisFile {
    /// Node definitions by name.
    #[serde(alias = "nodes_map", alias = "nodesMap")]
    pub nodes: BTreeMap<String, NodeDefinition>,
}

/// Mutation file contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MutationFile {
    /// A list of batches.
    Batches {
        /// Batches in log order.
        batches: Vec<RawBatch>,
    },
    /// A flat list, one mutation per batch.
    Flat {
        /// Mutations in log order.
        mutations: Vec<RawMutation>,
    },
}

/// Parse genesis JSON into a snapshot.
pub fn parse_genesis(json: &str) -> Result<GraphSnapshot, LoadError> {
    let file: GenesisFile = serde_json::from_str(json)?;
    Ok(load_genesis(&file.nodes)?)
}

/// Parse mutation JSON into a log.
pub fn parse_mutation_log(json: &str) -> Result<MutationLog, LoadError> {
    let file: MutationFile = serde_json::from_str(json)?;
    let log = match file {
        MutationFile::Batches { batches } => load_mutation_log(&batches)?,
        MutationFile::Flat { mutations } => load_flat_mutation_log(&mutations)?,
    };
    Ok(log)
}

fn read(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Load and validate both files into a timeline.
pub fn load_timeline(genesis_path: &Path, mutations_path: &Path) -> Result<Timeline, LoadError> {
    let genesis = parse_genesis(&read(genesis_path)?)?;
    let log = parse_mutation_log(&read(mutations_path)?)?;
    Ok(Timeline::new(genesis, log)?)
}
