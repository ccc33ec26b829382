//! Version navigation (time travel).
//!
//! Produces the snapshot at a requested version from the genesis snapshot,
//! the log and the caller's current position.
//!
//! ## Strategy
//!
//! - `target == current`: copy of the current snapshot.
//! - `target > current`: apply batches `[current, target)` to a copy of the
//!   current snapshot. O(target - current).
//! - `target < current`: mutations are not invertible (removed tokens and
//!   deleted edges are lost), so replay `[0, target)` from a copy of genesis.
//!
//! Neither `genesis` nor `current` is ever modified. A failed replay
//! discards its working copy.

use crate::apply::apply_batch;
use crate::graph::{GraphError, GraphSnapshot};
use crate::log::MutationLog;

/// Error type for navigation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    /// Requested version outside `[0, log.len()]`.
    #[error("Invalid version {requested}: must be between 0 and {max}")]
    InvalidVersion {
        /// The requested version.
        requested: i64,
        /// Highest valid version (the log length).
        max: usize,
    },
    /// A log batch could not be applied.
    #[error("Batch {index} (mutation {position}) failed during replay: {source}")]
    Replay {
        /// Batch index in the log.
        index: usize,
        /// Position of the failing mutation within the batch.
        position: usize,
        /// Underlying graph error.
        #[source]
        source: GraphError,
    },
}

/// Validate a raw requested version against the log.
pub fn check_version(requested: i64, log: &MutationLog) -> Result<usize, NavigationError> {
    usize::try_from(requested)
        .ok()
        .filter(|v| *v <= log.len())
        .ok_or(NavigationError::InvalidVersion { requested, max: log.len() })
}

/// Snapshot at `target_version`.
///
/// `current` must be the snapshot at `current_version`.
pub fn graph_at_version(
    genesis: &GraphSnapshot,
    current: &GraphSnapshot,
    current_version: usize,
    target_version: usize,
    log: &MutationLog,
) -> Result<GraphSnapshot, NavigationError> {
    if target_version > log.len() {
        return Err(NavigationError::InvalidVersion {
            requested: i64::try_from(target_version).unwrap_or(i64::MAX),
            max: log.len(),
        });
    }
    let target = target_version;

    if target == current_version {
        return Ok(current.copy());
    }

    let (mut working, start) = if target > current_version {
        tracing::debug!(from = current_version, to = target, "Forward replay from current");
        (current.copy(), current_version)
    } else {
        tracing::debug!(from = current_version, to = target, "Full replay from genesis");
        (genesis.copy(), 0)
    };

    replay(&mut working, log, start, target)?;
    Ok(working)
}

/// Apply batches `[from, to)` of the log to `snapshot`.
pub fn replay(
    snapshot: &mut GraphSnapshot,
    log: &MutationLog,
    from: usize,
    to: usize,
) -> Result<(), NavigationError> {
    for (index, batch) in log.batches().iter().enumerate().take(to).skip(from) {
        apply_batch(snapshot, batch).map_err(|(position, source)| {
            tracing::warn!(index, position, error = %source, "Rejected batch during replay");
            NavigationError::Replay { index, position, source }
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::tests::sample_genesis;
    use crate::types::{Edge, Mutation};

    fn sample_log() -> MutationLog {
        MutationLog::from_flat(vec![
            Mutation::add_node("E"),
            Mutation::add_edge("A", "E"),
            Mutation::delete_edge("A", "C"),
            Mutation::delete_node("D"),
        ])
    }

    #[test]
    fn test_same_version_returns_copy() {
        let genesis = sample_genesis();
        let log = sample_log();
        let result = graph_at_version(&genesis, &genesis, 0, 0, &log).unwrap();
        assert_eq!(result, genesis);
    }

    #[test]
    fn test_forward_to_version_two() {
        let genesis = sample_genesis();
        let log = sample_log();
        let v2 = graph_at_version(&genesis, &genesis, 0, 2, &log).unwrap();

        assert_eq!(v2.num_nodes(), 5);
        assert_eq!(
            v2.edges(),
            vec![Edge::new("A", "B"), Edge::new("A", "C"), Edge::new("A", "E"), Edge::new("B", "D")]
        );
    }

    #[test]
    fn test_backward_matches_forward() {
        let genesis = sample_genesis();
        let log = sample_log();
        let v4 = graph_at_version(&genesis, &genesis, 0, 4, &log).unwrap();
        let back_to_1 = graph_at_version(&genesis, &v4, 4, 1, &log).unwrap();
        let forward_1 = graph_at_version(&genesis, &genesis, 0, 1, &log).unwrap();

        assert_eq!(back_to_1, forward_1);
    }

    #[test]
    fn test_inputs_untouched() {
        let genesis = sample_genesis();
        let log = sample_log();
        let before = genesis.clone();

        let v3 = graph_at_version(&genesis, &genesis, 0, 3, &log).unwrap();
        let v3_before = v3.clone();
        let _ = graph_at_version(&genesis, &v3, 3, 4, &log).unwrap();

        assert_eq!(genesis, before);
        assert_eq!(v3, v3_before);
    }

    #[test]
    fn test_invalid_version() {
        let genesis = sample_genesis();
        let log = sample_log();

        assert_eq!(
            graph_at_version(&genesis, &genesis, 0, 5, &log).unwrap_err(),
            NavigationError::InvalidVersion { requested: 5, max: 4 }
        );
        assert!(check_version(-1, &log).is_err());
        assert_eq!(
            graph_at_version(&genesis, &genesis, 0, usize::MAX, &log).unwrap_err(),
            NavigationError::InvalidVersion { requested: i64::MAX, max: 4 }
        );
        assert_eq!(check_version(4, &log), Ok(4));
    }

    #[test]
    fn test_replay_failure_reports_batch() {
        let genesis = sample_genesis();
        let log = MutationLog::from_flat(vec![Mutation::add_node("E"), Mutation::add_edge("D", "A")]);

        let err = graph_at_version(&genesis, &genesis, 0, 2, &log).unwrap_err();
        assert!(matches!(err, NavigationError::Replay { index: 1, position: 0, .. }));
    }
}
