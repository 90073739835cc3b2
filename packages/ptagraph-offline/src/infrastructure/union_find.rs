//! Union-Find (Disjoint Set Union) over dense pointer ids
//!
//! Arena-style implementation used in two places:
//! - Cross-round pointer equivalences held by the registry (grows via `push`)
//! - Round-scoped SCC contraction inside the condenser (rebuilt via `reset`)
//!
//! Union is by set size and reports the surviving root, so callers can move
//! per-node payloads (adjacency lists, liveness) onto the representative.
//!
//! # References
//! - Tarjan, R. E. "Efficiency of a Good But Not Linear Set Union Algorithm" (1975)

use serde::{Deserialize, Serialize};

/// Union-Find with path compression and union by size
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct UnionFind {
    /// Parent pointers (self-loop = root)
    parent: Vec<u32>,

    /// Size of each set (only valid for roots)
    size: Vec<u32>,

    /// Number of disjoint sets
    set_count: usize,
}

impl UnionFind {
    /// Create a new Union-Find with n singleton elements (0..n-1)
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n as u32).collect(),
            size: vec![1; n],
            set_count: n,
        }
    }

    /// Append one singleton element and return its id
    pub fn push(&mut self) -> u32 {
        let id = self.parent.len() as u32;
        self.parent.push(id);
        self.size.push(1);
        self.set_count += 1;
        id
    }

    /// Discard all sets and reinitialize to n singletons
    pub fn reset(&mut self, n: usize) {
        self.parent.clear();
        self.parent.extend(0..n as u32);
        self.size.clear();
        self.size.resize(n, 1);
        self.set_count = n;
    }

    /// Find the representative of x with two-pass path compression
    ///
    /// Complexity: O(α(n)) amortized where α is inverse Ackermann function
    #[inline]
    pub fn find(&mut self, x: u32) -> u32 {
        let mut root = x;
        while self.parent[root as usize] != root {
            root = self.parent[root as usize];
        }
        // Second pass: point the whole chain at the root
        let mut cur = x;
        while cur != root {
            let next = self.parent[cur as usize];
            self.parent[cur as usize] = root;
            cur = next;
        }
        root
    }

    /// Union two sets by size; returns the surviving root
    ///
    /// The larger set's root survives; on ties the root of `x` does.
    pub fn union(&mut self, x: u32, y: u32) -> u32 {
        let root_x = self.find(x);
        let root_y = self.find(y);

        if root_x == root_y {
            return root_x;
        }

        let (winner, loser) = if self.size[root_x as usize] >= self.size[root_y as usize] {
            (root_x, root_y)
        } else {
            (root_y, root_x)
        };

        self.parent[loser as usize] = winner;
        self.size[winner as usize] += self.size[loser as usize];
        self.set_count -= 1;
        winner
    }

    /// Check if two elements are in the same set
    #[inline]
    pub fn same_set(&mut self, x: u32, y: u32) -> bool {
        self.find(x) == self.find(y)
    }

    /// Size of the set containing x
    #[inline]
    pub fn size_of(&mut self, x: u32) -> u32 {
        let root = self.find(x);
        self.size[root as usize]
    }

    /// Number of disjoint sets
    #[inline]
    pub fn count(&self) -> usize {
        self.set_count
    }

    /// Total number of elements
    #[inline]
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }
}
