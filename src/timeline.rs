//! Timeline and session: the query flow over a loaded history.
//!
//! A [`Timeline`] bundles the immutable pieces loaded once at startup
//! (genesis, log, relevance index). It is never mutated after
//! construction and can be shared across threads behind an `Arc`.
//!
//! A [`Session`] is one caller's current position in that history. It is
//! single-writer state; callers navigating independently each hold their
//! own session.
//!
//! ```text
//! ViewQuery → Session::query → graph_at_version → reachable_subgraph
//!                                    ↓                    ↓
//!                              RelevanceIndex  →  GraphView (+ ViewCondition)
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::graph::GraphSnapshot;
use crate::log::MutationLog;
use crate::navigator::{check_version, graph_at_version, NavigationError};
use crate::relevance::{filter_batch, RelevanceIndex};
use crate::slicer::reachable_subgraph;
use crate::types::{InducedSubgraph, MutationBatch};

/// Immutable history: genesis snapshot, mutation log and its index.
#[derive(Debug, Clone)]
pub struct Timeline {
    genesis: GraphSnapshot,
    log: MutationLog,
    index: RelevanceIndex,
}

impl Timeline {
    /// Bundle genesis and log, building the relevance index.
    ///
    /// Fails if any batch of the log cannot be replayed (cycle).
    pub fn new(genesis: GraphSnapshot, log: MutationLog) -> Result<Self, NavigationError> {
        let index = RelevanceIndex::build(&genesis, &log)?;
        tracing::info!(
            nodes = genesis.num_nodes(),
            edges = genesis.num_edges(),
            batches = log.len(),
            "Timeline loaded"
        );
        Ok(Self { genesis, log, index })
    }

    /// The genesis snapshot (version 0).
    pub fn genesis(&self) -> &GraphSnapshot {
        &self.genesis
    }

    /// The mutation log.
    pub fn log(&self) -> &MutationLog {
        &self.log
    }

    /// The relevance index.
    pub fn index(&self) -> &RelevanceIndex {
        &self.index
    }

    /// Number of batches, i.e. the highest version.
    pub fn num_mutations(&self) -> usize {
        self.log.len()
    }

    /// Snapshot at a version, replayed from genesis.
    pub fn graph_at(&self, version: usize) -> Result<GraphSnapshot, NavigationError> {
        graph_at_version(&self.genesis, &self.genesis, 0, version, &self.log)
    }

    /// A new session positioned at genesis.
    pub fn session(&self) -> Session {
        Session {
            current: self.genesis.copy(),
            version: 0,
        }
    }
}

/// Parameters of one view request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewQuery {
    /// Requested version. Signed so out-of-range input can be reported.
    pub version: i64,
    /// Maximum undirected hops from the searched nodes.
    pub depth: usize,
    /// Searched node name; empty for none.
    #[serde(default)]
    pub node_name: String,
    /// Searched token; empty for none.
    #[serde(default)]
    pub token: String,
}

impl ViewQuery {
    /// Unfiltered query at a version.
    pub fn at(version: i64) -> Self {
        Self { version, ..Self::default() }
    }

    /// Builder-style depth setter.
    pub fn depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    /// Builder-style node filter.
    pub fn node(mut self, name: impl Into<String>) -> Self {
        self.node_name = name.into();
        self
    }

    /// Builder-style token filter.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = token.into();
        self
    }

    /// Check whether a node or token filter is active.
    pub fn is_filtered(&self) -> bool {
        !self.node_name.is_empty() || !self.token.is_empty()
    }
}

/// Reportable state of a view. Not an error: the view is still returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewCondition {
    /// The searched node/token is absent from this version and never mutated.
    NotFound,
    /// The searched node/token is absent here but mutated at another step.
    AbsentAtVersion,
    /// The searched node/token is visible but the step to this version does
    /// not touch it.
    NotMutatedAtVersion,
    /// The step to this version touches the searched nodes, but depth or
    /// filter hide every mutation of it.
    FilteredToEmpty,
}

impl ViewCondition {
    /// User-facing message.
    pub fn message(&self) -> &'static str {
        match self {
            Self::NotFound => "The searched node/token does not exist anywhere in this graph or in mutations.",
            Self::AbsentAtVersion => {
                "The searched node/token does not exist in this graph, so nothing is shown. \
                 However, it is mutated at some other step. Navigate to a graph where it exists."
            }
            Self::NotMutatedAtVersion => {
                "The searched node/token exists in this graph, but is not mutated in this step. \
                 Navigate forward or backward to see where it is mutated."
            }
            Self::FilteredToEmpty => {
                "The searched nodes are mutated in this step, but the current depth or filter hides \
                 the mutation. Increase the depth or clear the filter to view it."
            }
        }
    }

    /// Stable machine-readable name.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::AbsentAtVersion => "absent_at_version",
            Self::NotMutatedAtVersion => "not_mutated_at_version",
            Self::FilteredToEmpty => "filtered_to_empty",
        }
    }
}

impl std::fmt::Display for ViewCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind())
    }
}

/// Everything the boundary layer needs to render one version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphView {
    /// Version the view shows.
    pub version: usize,
    /// Visible nodes and edges.
    pub subgraph: InducedSubgraph,
    /// Sorted indices of log batches relevant to the view.
    pub relevant_indices: Vec<usize>,
    /// The batch just applied (forward navigation only), filtered to the view.
    pub diff: Option<MutationBatch>,
    /// Total number of batches in the log.
    pub num_mutations: usize,
    /// Root names the subgraph was expanded from.
    pub queried: BTreeSet<String>,
    /// Fingerprint of the full snapshot at `version`.
    pub snapshot_hash: String,
    /// Informational state, if any.
    pub condition: Option<ViewCondition>,
}

/// One caller's current position in a timeline.
#[derive(Debug, Clone)]
pub struct Session {
    current: GraphSnapshot,
    version: usize,
}

impl Session {
    /// Session positioned at genesis.
    pub fn new(timeline: &Timeline) -> Self {
        timeline.session()
    }

    /// Current version.
    pub fn version(&self) -> usize {
        self.version
    }

    /// Current snapshot.
    pub fn current(&self) -> &GraphSnapshot {
        &self.current
    }

    /// Move to `target`. On error the session keeps its position.
    pub fn navigate(&mut self, timeline: &Timeline, target: usize) -> Result<&GraphSnapshot, NavigationError> {
        let next = graph_at_version(timeline.genesis(), &self.current, self.version, target, timeline.log())?;
        self.current = next;
        self.version = target;
        Ok(&self.current)
    }

    /// Navigate to the query's version and build the view.
    pub fn query(&mut self, timeline: &Timeline, query: &ViewQuery) -> Result<GraphView, NavigationError> {
        let target = check_version(query.version, timeline.log())?;
        let node_filter = !query.node_name.is_empty();
        let token_filter = !query.token.is_empty();
        let moved_forward = target > self.version;

        // Roots: the searched node, plus token carriers before and after navigating.
        let mut queried: BTreeSet<String> = BTreeSet::new();
        if node_filter {
            queried.insert(query.node_name.clone());
        }
        if token_filter {
            queried.extend(self.current.nodes_with_token(&query.token));
        }

        self.navigate(timeline, target)?;

        if token_filter {
            queried.extend(self.current.nodes_with_token(&query.token));
        }

        let any_root_present = queried.iter().any(|n| self.current.contains_node(n));
        let subgraph = if query.is_filtered() && !any_root_present {
            InducedSubgraph::empty()
        } else {
            reachable_subgraph(&self.current, &queried, query.depth)
        };

        let diff = if moved_forward {
            target.checked_sub(1).and_then(|step| timeline.log().batch(step)).cloned()
        } else {
            None
        };

        let index = timeline.index();
        let (relevant, filtered_diff) = if !query.is_filtered() {
            (index.relevant_indices(&BTreeSet::new()), diff.clone())
        } else {
            let mut visible = subgraph.node_names();
            if node_filter {
                visible.insert(query.node_name.clone());
            }

            let mut relevant = if visible.is_empty() {
                BTreeSet::new()
            } else {
                index.relevant_indices(&visible)
            };

            let mut diff_names = visible;
            if token_filter {
                // Nodes that used to carry the token may no longer exist.
                let carriers = index.nodes_with_token(&query.token);
                relevant.extend(index.mutation_indices_of_token(&query.token).iter().copied());
                if !carriers.is_empty() {
                    relevant.extend(index.relevant_indices(&carriers));
                }
                diff_names.extend(queried.iter().cloned());
                diff_names.extend(carriers);
            }

            let filtered = diff.as_ref().map(|d| filter_batch(d, &diff_names));
            (relevant, filtered)
        };

        let condition = classify(
            query,
            target,
            &subgraph,
            &relevant,
            diff.as_ref(),
            filtered_diff.as_ref(),
        );

        if let Some(c) = condition {
            tracing::debug!(version = target, condition = %c, "View condition");
        }

        Ok(GraphView {
            version: target,
            subgraph,
            relevant_indices: relevant.into_iter().collect(),
            diff: filtered_diff,
            num_mutations: timeline.num_mutations(),
            queried,
            snapshot_hash: self.current.fingerprint(),
            condition,
        })
    }
}

/// Pick the condition to report for a view, if any.
fn classify(
    query: &ViewQuery,
    version: usize,
    subgraph: &InducedSubgraph,
    relevant: &BTreeSet<usize>,
    diff: Option<&MutationBatch>,
    filtered_diff: Option<&MutationBatch>,
) -> Option<ViewCondition> {
    // The batch that produced this version.
    let step_relevant = version
        .checked_sub(1)
        .map_or(false, |step| relevant.contains(&step));

    let diff_hidden = filtered_diff.map_or(false, MutationBatch::is_empty);

    if query.is_filtered() && subgraph.is_empty() {
        if relevant.is_empty() {
            return Some(ViewCondition::NotFound);
        }
        if !step_relevant {
            return Some(ViewCondition::AbsentAtVersion);
        }
    }

    if query.is_filtered() && !step_relevant && diff.map_or(true, MutationBatch::is_empty) {
        return Some(ViewCondition::NotMutatedAtVersion);
    }

    if step_relevant && diff_hidden {
        return Some(ViewCondition::FilteredToEmpty);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::tests::sample_genesis;
    use crate::types::{Mutation, TokenOp};

    fn sample_timeline() -> Timeline {
        let log = MutationLog::from_flat(vec![
            Mutation::add_node("E"),
            Mutation::add_edge("A", "E"),
            Mutation::delete_edge("A", "C"),
            Mutation::delete_node("D"),
        ]);
        Timeline::new(sample_genesis(), log).unwrap()
    }

    #[test]
    fn test_unfiltered_view_shows_everything() {
        let timeline = sample_timeline();
        let mut session = timeline.session();

        let view = session.query(&timeline, &ViewQuery::at(2).depth(3)).unwrap();

        assert_eq!(view.version, 2);
        assert_eq!(view.subgraph.num_nodes(), 5);
        assert_eq!(view.relevant_indices, vec![0, 1, 2, 3]);
        assert_eq!(view.diff, Some(MutationBatch::single(Mutation::add_edge("A", "E"))));
        assert_eq!(view.num_mutations, 4);
        assert_eq!(view.condition, None);
        assert_eq!(session.version(), 2);
    }

    #[test]
    fn test_backward_navigation_has_no_diff() {
        let timeline = sample_timeline();
        let mut session = timeline.session();
        session.navigate(&timeline, 4).unwrap();

        let view = session.query(&timeline, &ViewQuery::at(1)).unwrap();
        assert!(view.diff.is_none());
        assert_eq!(session.current(), &timeline.graph_at(1).unwrap());
    }

    #[test]
    fn test_node_filter() {
        let timeline = sample_timeline();
        let mut session = timeline.session();

        let view = session.query(&timeline, &ViewQuery::at(2).depth(1).node("D")).unwrap();

        assert_eq!(view.subgraph.node_names().len(), 2);
        assert!(view.subgraph.contains_edge("B", "D"));
        // B and D are untouched until the last step.
        assert_eq!(view.relevant_indices, vec![3]);
        // The step to version 2 only adds A -> E, which is off screen.
        assert_eq!(view.diff, Some(MutationBatch::default()));
        assert_eq!(view.condition, None);
    }

    #[test]
    fn test_not_mutated_at_version() {
        let timeline = sample_timeline();
        let mut session = timeline.session();
        session.navigate(&timeline, 2).unwrap();

        // Same version again: nothing was applied, D is visible but untouched.
        let view = session.query(&timeline, &ViewQuery::at(2).depth(1).node("D")).unwrap();
        assert!(view.diff.is_none());
        assert_eq!(view.condition, Some(ViewCondition::NotMutatedAtVersion));
    }

    #[test]
    fn test_filtered_diff() {
        let timeline = sample_timeline();
        let mut session = timeline.session();
        session.navigate(&timeline, 3).unwrap();

        let view = session.query(&timeline, &ViewQuery::at(4).depth(0).node("D")).unwrap();

        // D is gone at version 4, but the step that removed it is relevant.
        assert!(view.subgraph.is_empty());
        assert_eq!(view.diff, Some(MutationBatch::single(Mutation::delete_node("D"))));
        assert_eq!(view.condition, None);
    }

    #[test]
    fn test_not_found() {
        let timeline = sample_timeline();
        let mut session = timeline.session();

        let view = session.query(&timeline, &ViewQuery::at(1).node("Z")).unwrap();

        assert!(view.subgraph.is_empty());
        assert!(view.relevant_indices.is_empty());
        assert_eq!(view.condition, Some(ViewCondition::NotFound));
    }

    #[test]
    fn test_absent_at_version() {
        let timeline = sample_timeline();
        let mut session = timeline.session();

        // E does not exist at genesis but is created by batch 0.
        let view = session.query(&timeline, &ViewQuery::at(0).node("E")).unwrap();

        assert!(view.subgraph.is_empty());
        assert_eq!(view.relevant_indices, vec![0, 1]);
        assert_eq!(view.condition, Some(ViewCondition::AbsentAtVersion));
    }

    #[test]
    fn test_visible_mutation_survives_filter() {
        let genesis = sample_genesis();
        let log = MutationLog::new(vec![MutationBatch::new(vec![
            Mutation::change_token("C", TokenOp::Add, ["green"]),
            Mutation::add_node("F"),
        ])]);
        let timeline = Timeline::new(genesis, log).unwrap();
        let mut session = timeline.session();

        let view = session.query(&timeline, &ViewQuery::at(1).depth(0).node("F")).unwrap();

        assert_eq!(view.diff, Some(MutationBatch::single(Mutation::add_node("F"))));
        assert_eq!(view.condition, None);
    }

    #[test]
    fn test_filtered_to_empty() {
        let genesis = sample_genesis();
        // Nobody ever carries "green", but the step mentions it.
        let log = MutationLog::from_flat(vec![Mutation::change_token("D", TokenOp::Remove, ["green"])]);
        let timeline = Timeline::new(genesis, log).unwrap();
        let mut session = timeline.session();

        let view = session.query(&timeline, &ViewQuery::at(1).token("green")).unwrap();

        assert!(view.subgraph.is_empty());
        assert_eq!(view.relevant_indices, vec![0]);
        assert_eq!(view.diff, Some(MutationBatch::default()));
        assert_eq!(view.condition, Some(ViewCondition::FilteredToEmpty));
    }

    #[test]
    fn test_token_filter_tracks_former_carriers() {
        let genesis = sample_genesis();
        let log = MutationLog::from_flat(vec![
            Mutation::change_token("B", TokenOp::Remove, ["red"]),
            Mutation::change_token("C", TokenOp::Remove, ["red"]),
        ]);
        let timeline = Timeline::new(genesis, log).unwrap();
        let mut session = timeline.session();
        session.navigate(&timeline, 1).unwrap();

        let view = session.query(&timeline, &ViewQuery::at(2).token("red")).unwrap();

        // C carried red before this step, so it is still a root.
        assert!(view.queried.contains("C"));
        assert_eq!(view.relevant_indices, vec![0, 1]);
        assert_eq!(
            view.diff,
            Some(MutationBatch::single(Mutation::change_token("C", TokenOp::Remove, ["red"])))
        );
    }

    #[test]
    fn test_deleted_token_carrier_is_absent_not_missing() {
        let mut defs = std::collections::BTreeMap::new();
        defs.insert("A".to_string(), crate::types::NodeDefinition::with_children(["X"]));
        defs.insert("X".to_string(), crate::types::NodeDefinition::default().tokens(["t"]));
        let genesis = GraphSnapshot::create(&defs).unwrap();
        let log = MutationLog::from_flat(vec![Mutation::delete_node("X"), Mutation::add_node("Q")]);
        let timeline = Timeline::new(genesis, log).unwrap();
        let mut session = timeline.session();
        session.navigate(&timeline, 2).unwrap();

        let view = session.query(&timeline, &ViewQuery::at(2).token("t")).unwrap();

        assert!(view.subgraph.is_empty());
        assert_eq!(view.relevant_indices, vec![0]);
        assert_eq!(view.condition, Some(ViewCondition::AbsentAtVersion));
    }

    #[test]
    fn test_invalid_version_keeps_position() {
        let timeline = sample_timeline();
        let mut session = timeline.session();
        session.navigate(&timeline, 2).unwrap();

        let err = session.query(&timeline, &ViewQuery::at(9)).unwrap_err();
        assert!(matches!(err, NavigationError::InvalidVersion { requested: 9, max: 4 }));
        assert!(session.query(&timeline, &ViewQuery::at(-1)).is_err());
        assert_eq!(session.version(), 2);
    }
}
