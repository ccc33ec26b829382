//! Relevance indexing and diff filtering.
//!
//! The [`RelevanceIndex`] answers "which log batches concern these nodes?"
//! and "which nodes ever carried this token?". It indexes the log, not a
//! snapshot, so it never goes stale once built.
//!
//! The empty-string key stands for "no filter" and maps to every index.

use std::collections::{BTreeMap, BTreeSet};

use crate::graph::GraphSnapshot;
use crate::log::MutationLog;
use crate::navigator::{replay, NavigationError};
use crate::types::MutationBatch;

/// Key under which every batch index is recorded.
pub const NO_FILTER: &str = "";

/// Precomputed node/token -> mutation index lookup.
#[derive(Debug, Clone, Default)]
pub struct RelevanceIndex {
    /// Node name -> sorted batch indices touching it.
    by_node: BTreeMap<String, Vec<usize>>,
    /// Token -> nodes that carried it at any version.
    token_carriers: BTreeMap<String, BTreeSet<String>>,
    /// Token -> sorted batch indices whose token changes mention it.
    by_token: BTreeMap<String, Vec<usize>>,
}

impl RelevanceIndex {
    /// Build the index by walking the log forward from genesis.
    ///
    /// The walk doubles as load-time validation: a batch that would close
    /// a cycle fails the build.
    pub fn build(genesis: &GraphSnapshot, log: &MutationLog) -> Result<Self, NavigationError> {
        let mut index = Self::default();
        index
            .by_node
            .insert(NO_FILTER.to_string(), (0..log.len()).collect());

        let mut working = genesis.copy();
        index.record_carriers(&working);

        for (i, batch) in log.iter() {
            // The empty name is reserved for the no-filter entry.
            for name in batch.touched_nodes().into_iter().filter(|n| !n.is_empty()) {
                index.by_node.entry(name.to_string()).or_default().push(i);
            }

            let tokens: BTreeSet<&String> = batch.iter().flat_map(|m| m.tokens()).collect();
            for token in tokens {
                index.by_token.entry(token.clone()).or_default().push(i);
            }

            replay(&mut working, log, i, i + 1)?;
            index.record_carriers(&working);
        }

        tracing::debug!(
            nodes = index.by_node.len() - 1,
            tokens = index.token_carriers.len(),
            batches = log.len(),
            "Relevance index built"
        );

        Ok(index)
    }

    fn record_carriers(&mut self, snapshot: &GraphSnapshot) {
        for (token, carriers) in snapshot.token_index() {
            self.token_carriers
                .entry(token.clone())
                .or_default()
                .extend(carriers.iter().cloned());
        }
    }

    /// Sorted batch indices touching a single node.
    pub fn indices_for(&self, name: &str) -> &[usize] {
        self.by_node.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Sorted union of batch indices touching any of `names`.
    ///
    /// An empty set is the "no filter" marker and yields every index.
    pub fn relevant_indices(&self, names: &BTreeSet<String>) -> BTreeSet<usize> {
        if names.is_empty() {
            return self.indices_for(NO_FILTER).iter().copied().collect();
        }
        names
            .iter()
            .filter(|name| !name.is_empty())
            .flat_map(|name| self.indices_for(name).iter().copied())
            .collect()
    }

    /// Nodes that carried `token` at any version, including genesis.
    pub fn nodes_with_token(&self, token: &str) -> BTreeSet<String> {
        self.token_carriers.get(token).cloned().unwrap_or_default()
    }

    /// Sorted batch indices whose token changes mention `token`.
    pub fn mutation_indices_of_token(&self, token: &str) -> &[usize] {
        self.by_token.get(token).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Mutations of `batch` whose touched nodes intersect `names`.
///
/// An empty result is valid: the step changed something, but nothing in
/// the given node set.
pub fn filter_batch(batch: &MutationBatch, names: &BTreeSet<String>) -> MutationBatch {
    batch
        .iter()
        .filter(|m| m.touches_any(names))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::tests::sample_genesis;
    use crate::types::{Mutation, TokenOp};

    fn names(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn sample_log() -> MutationLog {
        MutationLog::from_flat(vec![
            Mutation::add_node("E"),
            Mutation::add_edge("A", "E"),
            Mutation::delete_edge("A", "C"),
            Mutation::delete_node("D"),
        ])
    }

    #[test]
    fn test_relevant_indices_single_node() {
        let index = RelevanceIndex::build(&sample_genesis(), &sample_log()).unwrap();

        assert_eq!(index.relevant_indices(&names(&["D"])), [3].into_iter().collect());
        assert_eq!(index.relevant_indices(&names(&["A"])), [1, 2].into_iter().collect());
        assert!(index.relevant_indices(&names(&["Z"])).is_empty());
    }

    #[test]
    fn test_empty_set_means_all() {
        let index = RelevanceIndex::build(&sample_genesis(), &sample_log()).unwrap();
        assert_eq!(index.relevant_indices(&BTreeSet::new()), (0..4).collect());
    }

    #[test]
    fn test_union_is_sorted() {
        let index = RelevanceIndex::build(&sample_genesis(), &sample_log()).unwrap();
        let got: Vec<_> = index.relevant_indices(&names(&["D", "E"])).into_iter().collect();
        assert_eq!(got, vec![0, 1, 3]);
    }

    #[test]
    fn test_empty_name_does_not_disturb_all_indices() {
        let log = MutationLog::from_flat(vec![Mutation::add_node("A"), Mutation::add_node("")]);
        let index = RelevanceIndex::build(&sample_genesis(), &log).unwrap();

        assert_eq!(index.indices_for(NO_FILTER), &[0, 1]);
        assert_eq!(index.indices_for("A"), &[0]);
    }

    #[test]
    fn test_token_carriers_span_history() {
        let log = MutationLog::from_flat(vec![
            Mutation::change_token("D", TokenOp::Add, ["red"]),
            Mutation::change_token("B", TokenOp::Remove, ["red"]),
            Mutation::delete_node("D"),
        ]);
        let index = RelevanceIndex::build(&sample_genesis(), &log).unwrap();

        // B and C carry red at genesis, D gains it later and is then deleted.
        assert_eq!(index.nodes_with_token("red"), names(&["B", "C", "D"]));
        assert_eq!(index.mutation_indices_of_token("red"), &[0, 1]);
        assert!(index.mutation_indices_of_token("green").is_empty());
    }

    #[test]
    fn test_build_rejects_cyclic_log() {
        let log = MutationLog::from_flat(vec![Mutation::add_edge("D", "A")]);
        assert!(RelevanceIndex::build(&sample_genesis(), &log).is_err());
    }

    #[test]
    fn test_filter_batch() {
        let batch = MutationBatch::single(Mutation::delete_node("D"));

        assert_eq!(filter_batch(&batch, &names(&["D"])), batch);
        assert!(filter_batch(&batch, &names(&["Z"])).is_empty());
    }

    #[test]
    fn test_filter_batch_keeps_order() {
        let batch = MutationBatch::new(vec![
            Mutation::add_node("E"),
            Mutation::delete_edge("A", "C"),
            Mutation::add_edge("A", "E"),
        ]);

        let filtered = filter_batch(&batch, &names(&["E"]));
        assert_eq!(
            filtered.mutations,
            vec![Mutation::add_node("E"), Mutation::add_edge("A", "E")]
        );
    }
}
