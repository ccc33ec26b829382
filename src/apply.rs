//! Mutation application.
//!
//! Applies elementary mutations to a [`GraphSnapshot`] in place.
//!
//! Missing endpoints are silent no-ops: a log may reference nodes that a
//! prior batch deleted or a later batch creates, and replay must tolerate
//! that. The only reported failure is an `AddEdge` that would close a
//! cycle, which is validated before anything is touched.

use crate::graph::{GraphError, GraphSnapshot};
use crate::types::{Mutation, MutationBatch, Node, TokenOp};

/// Apply one mutation to `snapshot`.
///
/// On error the snapshot is unchanged.
pub fn apply(snapshot: &mut GraphSnapshot, mutation: &Mutation) -> Result<(), GraphError> {
    match mutation {
        Mutation::AddNode { name } => {
            // Re-adding resets the payload; existing edges survive.
            snapshot.insert_node(Node::new(name.clone()));
        }
        Mutation::AddEdge { from, to } => {
            if !snapshot.contains_node(from) || !snapshot.contains_node(to) {
                return Ok(());
            }
            if snapshot.contains_edge(from, to) {
                return Ok(());
            }
            if snapshot.would_create_cycle(from, to) {
                return Err(GraphError::CycleDetected {
                    from: from.clone(),
                    to: to.clone(),
                });
            }
            snapshot.link(from, to);
        }
        Mutation::DeleteNode { name } => {
            snapshot.remove_node(name);
        }
        Mutation::DeleteEdge { from, to } => {
            snapshot.unlink(from, to);
        }
        Mutation::ChangeToken { name, op, tokens } => match op {
            TokenOp::Add => {
                snapshot.add_tokens(name, tokens);
            }
            TokenOp::Remove => {
                snapshot.remove_tokens(name, tokens);
            }
        },
    }
    Ok(())
}

/// Apply every mutation of a batch in order.
///
/// Stops at the first failure and returns its position within the batch.
/// Mutations before the failing one stay applied; callers that need
/// all-or-nothing semantics apply to a copy.
pub fn apply_batch(snapshot: &mut GraphSnapshot, batch: &MutationBatch) -> Result<(), (usize, GraphError)> {
    for (position, mutation) in batch.iter().enumerate() {
        apply(snapshot, mutation).map_err(|e| (position, e))?;
    }
    Ok(())
}

impl GraphSnapshot {
    /// Apply one mutation. See [`apply`].
    pub fn apply_mutation(&mut self, mutation: &Mutation) -> Result<(), GraphError> {
        apply(self, mutation)
    }

    /// Apply a batch. See [`apply_batch`].
    pub fn apply_batch(&mut self, batch: &MutationBatch) -> Result<(), (usize, GraphError)> {
        apply_batch(self, batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::tests::sample_genesis;
    use crate::types::Edge;

    #[test]
    fn test_add_node() {
        let mut graph = sample_genesis();
        apply(&mut graph, &Mutation::add_node("E")).unwrap();

        let node = graph.node("E").unwrap();
        assert!(node.tokens.is_empty());
        assert!(graph.children_of("E").is_empty());
    }

    #[test]
    fn test_readd_node_keeps_edges_resets_tokens() {
        let mut graph = sample_genesis();
        apply(&mut graph, &Mutation::add_node("B")).unwrap();

        assert!(graph.contains_edge("A", "B"));
        assert!(graph.contains_edge("B", "D"));
        assert!(graph.node("B").unwrap().tokens.is_empty());
        assert!(!graph.nodes_with_token("red").contains("B"));
    }

    #[test]
    fn test_add_edge_missing_endpoint_is_noop() {
        let mut graph = sample_genesis();
        let before = graph.clone();

        apply(&mut graph, &Mutation::add_edge("A", "Z")).unwrap();
        apply(&mut graph, &Mutation::add_edge("Z", "A")).unwrap();

        assert_eq!(graph, before);
    }

    #[test]
    fn test_add_edge_cycle_rejected_and_unchanged() {
        let mut graph = sample_genesis();
        let before = graph.clone();

        let err = apply(&mut graph, &Mutation::add_edge("D", "A")).unwrap_err();

        assert_eq!(err, GraphError::CycleDetected { from: "D".to_string(), to: "A".to_string() });
        assert_eq!(graph, before);
        assert!(graph.is_acyclic());
    }

    #[test]
    fn test_add_existing_edge_is_noop() {
        let mut graph = sample_genesis();
        apply(&mut graph, &Mutation::add_edge("A", "B")).unwrap();
        assert_eq!(graph.num_edges(), 3);
    }

    #[test]
    fn test_delete_node_twice() {
        let mut once = sample_genesis();
        apply(&mut once, &Mutation::delete_node("B")).unwrap();

        let mut twice = once.clone();
        apply(&mut twice, &Mutation::delete_node("B")).unwrap();

        assert_eq!(once, twice);
        assert_eq!(once.edges(), vec![Edge::new("A", "C")]);
    }

    #[test]
    fn test_delete_missing_edge_is_noop() {
        let mut graph = sample_genesis();
        let before = graph.clone();
        apply(&mut graph, &Mutation::delete_edge("C", "D")).unwrap();
        assert_eq!(graph, before);
    }

    #[test]
    fn test_change_token_add_is_idempotent() {
        let mut graph = sample_genesis();
        let m = Mutation::change_token("D", TokenOp::Add, ["a"]);
        apply(&mut graph, &m).unwrap();
        apply(&mut graph, &m).unwrap();

        let tokens: Vec<_> = graph.node("D").unwrap().tokens.iter().cloned().collect();
        assert_eq!(tokens, vec!["a".to_string()]);
        assert_eq!(graph.nodes_with_token("a").len(), 1);
    }

    #[test]
    fn test_change_token_remove_absent_is_noop() {
        let mut graph = sample_genesis();
        apply(&mut graph, &Mutation::change_token("C", TokenOp::Remove, ["blue", "nope"])).unwrap();

        assert!(graph.nodes_with_token("blue").is_empty());
        assert!(graph.node("C").unwrap().has_token("red"));
    }

    #[test]
    fn test_change_token_missing_node_is_noop() {
        let mut graph = sample_genesis();
        let before = graph.clone();
        apply(&mut graph, &Mutation::change_token("Z", TokenOp::Add, ["a"])).unwrap();
        assert_eq!(graph, before);
        assert!(graph.nodes_with_token("a").is_empty());
    }

    #[test]
    fn test_apply_batch_reports_position() {
        let mut graph = sample_genesis();
        let batch = MutationBatch::new(vec![
            Mutation::add_node("E"),
            Mutation::add_edge("D", "A"),
        ]);

        let (position, err) = graph.apply_batch(&batch).unwrap_err();
        assert_eq!(position, 1);
        assert!(matches!(err, GraphError::CycleDetected { .. }));
    }
}
