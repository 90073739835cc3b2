//! Dense adjacency storage for the per-round pointer graphs
//!
//! The preprocessor builds two throwaway graphs per round over the same node
//! universe (one backward dependence graph, one forward impact graph), so the
//! storage is a flat Vec-of-Vecs indexed by `PointerId` that is cleared and
//! reused between phases instead of reallocated.
//!
//! Dependence edges can carry an optional base pointer: a field access x.f
//! depends not only on its source but also on the base x that names the
//! field, and liveness has to flow to both.

use serde::{Deserialize, Serialize};

use crate::domain::pointer::PointerId;

/// One outgoing edge of the round graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointerEdge {
    /// Edge head
    pub target: PointerId,

    /// Base pointer of the field access that induced this edge, if any
    pub base: Option<PointerId>,
}

/// Reusable adjacency lists over the dense pointer universe
#[derive(Debug, Default, Clone)]
pub struct PointerGraph {
    edges: Vec<Vec<PointerEdge>>,
}

impl PointerGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-size the outer table for the expected pointer universe
    pub fn with_capacity(max_nodes: usize) -> Self {
        Self {
            edges: Vec::with_capacity(max_nodes),
        }
    }

    /// Drop all edges and size the node universe to n, keeping allocations
    pub fn reset(&mut self, n: usize) {
        for list in &mut self.edges {
            list.clear();
        }
        self.edges.resize_with(n, Vec::new);
        self.edges.truncate(n);
    }

    /// Number of nodes in the current universe
    #[inline]
    pub fn node_count(&self) -> usize {
        self.edges.len()
    }

    /// Total number of edges
    pub fn edge_count(&self) -> usize {
        self.edges.iter().map(Vec::len).sum()
    }

    /// Add the edge from → to
    #[inline]
    pub fn add_edge(&mut self, from: PointerId, to: PointerId) {
        self.edges[from as usize].push(PointerEdge { target: to, base: None });
    }

    /// Add the edge from → to, remembering the field-access base pointer
    #[inline]
    pub fn add_edge_with_base(&mut self, from: PointerId, to: PointerId, base: PointerId) {
        self.edges[from as usize].push(PointerEdge {
            target: to,
            base: Some(base),
        });
    }

    /// Outgoing edges of a node
    #[inline]
    pub fn edges(&self, node: PointerId) -> &[PointerEdge] {
        &self.edges[node as usize]
    }

    /// Move every edge of `from` onto `to`, leaving `from` empty
    ///
    /// Used when SCC contraction elects `to` as the representative of `from`.
    pub fn splice(&mut self, from: PointerId, to: PointerId) {
        if from == to {
            return;
        }
        let moved = std::mem::take(&mut self.edges[from as usize]);
        self.edges[to as usize].extend(moved);
    }
}
