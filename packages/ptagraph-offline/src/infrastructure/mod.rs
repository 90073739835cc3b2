//! Infrastructure layer for constraint-graph preprocessing
//!
//! Algorithmic building blocks with no knowledge of the pass pipeline:
//! - **UnionFind**: O(α(n)) disjoint sets with by-size survivor election
//! - **PointerGraph**: reusable dense adjacency lists with base-annotated
//!   edges and list splicing for contraction
//! - **SccCondenser**: iterative Tarjan + Kahn topological numbering with
//!   per-component priority blocks

pub mod graph;
pub mod scc;
pub mod union_find;

pub use graph::{PointerEdge, PointerGraph};
pub use scc::{CondenseStats, SccCondenser};
pub use union_find::UnionFind;
