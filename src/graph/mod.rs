//! Relationship graph: lazy BFS discovery over the record store, spanning-tree
//! rendering and knowledge-graph assembly.
//!
//! Nodes are plain [`RecordId`] values and edges live in an id-keyed adjacency
//! map, so cycles in the underlying records never turn into cyclic ownership.

mod assemble;
mod prune;
mod render;
mod spanning;
mod traversal;

pub use assemble::{assemble, GraphEdge, GraphNode, KnowledgeGraph};
pub use prune::{is_empty_scalar, prune};
pub use render::{render_forest, render_tree};
pub use spanning::build_spanning_tree;
pub use traversal::traverse;

use std::collections::{BTreeMap, BTreeSet};

use crate::records::{EdgeKind, RecordId};

/// Every id dequeued during a traversal.
pub type VisitedSet = BTreeSet<RecordId>;

/// Undirected typed edges stored in both directions.
///
/// Neighbor sets are ordered by `(id, kind)`, which is the tie-break order the
/// spanning-tree builder relies on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdjacencyGraph {
    edges: BTreeMap<RecordId, BTreeSet<(RecordId, EdgeKind)>>,
}

impl AdjacencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `a -kind- b` in both directions. Self-references are ignored.
    pub fn link(&mut self, a: &RecordId, b: &RecordId, kind: EdgeKind) {
        if a == b {
            return;
        }
        self.edges.entry(a.clone()).or_default().insert((b.clone(), kind));
        self.edges.entry(b.clone()).or_default().insert((a.clone(), kind));
    }

    /// Neighbors of `id`, sorted by neighbor id then edge kind.
    pub fn neighbors(&self, id: &RecordId) -> impl Iterator<Item = &(RecordId, EdgeKind)> {
        self.edges.get(id).into_iter().flatten()
    }

    pub fn contains_edge(&self, a: &RecordId, b: &RecordId, kind: EdgeKind) -> bool {
        self.edges
            .get(a)
            .is_some_and(|n| n.contains(&(b.clone(), kind)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RecordId, &BTreeSet<(RecordId, EdgeKind)>)> {
        self.edges.iter()
    }

    pub fn node_count(&self) -> usize {
        self.edges.len()
    }

    /// Number of undirected edges
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum::<usize>() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Output of [`traverse`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Traversal {
    pub adjacency: AdjacencyGraph,
    pub visited: VisitedSet,
}

/// Cycle-free parent assignment derived from an adjacency graph.
///
/// Roots map to `None` in both maps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpanningTree {
    pub parent: BTreeMap<RecordId, Option<RecordId>>,
    pub edge_kind: BTreeMap<RecordId, Option<EdgeKind>>,
}

impl SpanningTree {
    pub fn is_root(&self, id: &RecordId) -> bool {
        matches!(self.parent.get(id), Some(None))
    }
}
