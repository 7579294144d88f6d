//! Deterministic spanning forest over the adjacency graph.

use std::collections::VecDeque;

use crate::graph::{AdjacencyGraph, SpanningTree};
use crate::records::RecordId;

/// Multi-source BFS from `roots`.
///
/// Neighbors are examined in ascending id order, and the first node to reach a
/// neighbor becomes its parent. Nodes are never re-parented, so the result is
/// acyclic.
pub fn build_spanning_tree(adjacency: &AdjacencyGraph, roots: &[RecordId]) -> SpanningTree {
    let mut tree = SpanningTree::default();
    let mut queue = VecDeque::new();

    for root in roots {
        if tree.parent.contains_key(root) {
            continue;
        }
        tree.parent.insert(root.clone(), None);
        tree.edge_kind.insert(root.clone(), None);
        queue.push_back(root.clone());
    }

    while let Some(node) = queue.pop_front() {
        for (neighbor, kind) in adjacency.neighbors(&node) {
            if tree.parent.contains_key(neighbor) {
                continue;
            }
            tree.parent.insert(neighbor.clone(), Some(node.clone()));
            tree.edge_kind.insert(neighbor.clone(), Some(*kind));
            queue.push_back(neighbor.clone());
        }
    }

    tree
}
