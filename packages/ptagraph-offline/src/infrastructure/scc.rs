//! SCC Condensation and Topological Priority Assignment
//!
//! Collapses the strongly connected components of the impact graph and
//! numbers every pointer with a worklist priority:
//! - Iterative Tarjan with an explicit frame stack (no recursion, so deeply
//!   nested assignment chains cannot overflow the call stack)
//! - Components are contracted through union-find while they are popped;
//!   member adjacency lists are spliced onto the surviving representative
//! - Kahn's algorithm numbers the condensation in topological order, and
//!   each component reserves a contiguous priority block as wide as its
//!   member count so merged pointers still get distinct priorities
//!
//! Priorities satisfy: every pointer of a component sorts before every
//! pointer of its successor components, and the representative holds the
//! smallest priority of its block.
//!
//! # References
//! - Tarjan, R. E. "Depth-First Search and Linear Graph Algorithms" (1972)

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::pointer::{PointerId, PointerTable};
use crate::infrastructure::graph::PointerGraph;
use crate::infrastructure::union_find::UnionFind;

const UNVISITED: u32 = u32::MAX;

/// One suspended DFS visit on the explicit traversal stack
#[derive(Debug, Clone, Copy)]
struct Frame {
    node: PointerId,
    edge_ix: usize,
}

/// Outcome of one condensation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CondenseStats {
    /// Number of condensed nodes (strongly connected components)
    pub scc_count: usize,

    /// Number of pointers folded away by contraction
    pub collapsed: usize,
}

/// Reusable SCC condensation state over the dense pointer universe
///
/// All scratch arrays persist across rounds and are re-dimensioned by
/// `assign_priorities`, so steady-state rounds allocate nothing.
#[derive(Debug, Default)]
pub struct SccCondenser {
    /// DFS discovery order (UNVISITED sentinel = not yet seen)
    pre: Vec<u32>,

    /// Tarjan low-link values
    low: Vec<u32>,

    /// Membership in the component stack
    on_stack: Vec<bool>,

    /// Component stack
    scc_stack: Vec<PointerId>,

    /// Explicit DFS stack
    call_stack: Vec<Frame>,

    /// In-degrees of the condensation, counted per edge
    in_degree: Vec<u32>,

    /// Kahn worklist
    queue: VecDeque<PointerId>,

    /// Remaining priority slots per component block
    block: Vec<u32>,

    /// Round-scoped contraction substrate
    uf: UnionFind,

    timer: u32,
}

impl SccCondenser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Condense `graph` and write topological priorities into `table`
    ///
    /// The graph is mutated: every contracted node's adjacency list is
    /// spliced onto its component representative.
    pub fn assign_priorities(
        &mut self,
        graph: &mut PointerGraph,
        table: &mut PointerTable,
    ) -> CondenseStats {
        let n = graph.node_count();
        self.reset(n);
        table.clear_priorities();

        if n == 0 {
            return CondenseStats::default();
        }

        for v in 0..n as u32 {
            if self.pre[v as usize] == UNVISITED {
                self.strong_connect(v, graph);
            }
        }

        // In-degrees of the condensation. Multi-edges count multiply here
        // and are decremented multiply below, so the totals agree.
        for i in 0..n as u32 {
            let s = self.uf.find(i);
            for edge in graph.edges(i) {
                let t = self.uf.find(edge.target);
                if t != s {
                    self.in_degree[t as usize] += 1;
                }
            }
        }

        // Hand every member's edges to its representative
        for i in 0..n as u32 {
            let r = self.uf.find(i);
            if r != i {
                graph.splice(i, r);
            }
        }

        // Kahn over the condensation; each component reserves a priority
        // block as wide as its member count
        self.queue.clear();
        for s in 0..n as u32 {
            if self.uf.find(s) == s && self.in_degree[s as usize] == 0 {
                self.queue.push_back(s);
            }
        }

        let mut counter: u32 = 0;
        while let Some(s) = self.queue.pop_front() {
            table.set_priority(s, counter);
            counter += self.uf.size_of(s);

            for ix in 0..graph.edges(s).len() {
                let raw = graph.edges(s)[ix].target;
                let t = self.uf.find(raw);
                if t == s {
                    continue;
                }
                self.in_degree[t as usize] -= 1;
                if self.in_degree[t as usize] == 0 {
                    self.queue.push_back(t);
                }
            }
        }

        // Number non-representatives backwards through their block so every
        // pointer of the component gets a distinct slot above the rep's
        self.block.clear();
        self.block.resize(n, 0);
        for i in 0..n as u32 {
            if self.uf.find(i) == i {
                self.block[i as usize] = self.uf.size_of(i);
            }
        }
        for i in (0..n as u32).rev() {
            let r = self.uf.find(i);
            if r == i {
                continue;
            }
            if let Some(base) = table.priority(r) {
                let slot = self.block[r as usize] - 1;
                table.set_priority(i, base + slot);
                self.block[r as usize] -= 1;
            }
        }

        let scc_count = self.uf.count();
        let stats = CondenseStats {
            scc_count,
            collapsed: n - scc_count,
        };
        debug!(
            "Condensed {} nodes into {} components ({} collapsed)",
            n, stats.scc_count, stats.collapsed
        );
        stats
    }

    /// Component representative of a node, valid after `assign_priorities`
    #[inline]
    pub fn component_rep(&mut self, p: PointerId) -> PointerId {
        self.uf.find(p)
    }

    fn reset(&mut self, n: usize) {
        self.pre.clear();
        self.pre.resize(n, UNVISITED);
        self.low.clear();
        self.low.resize(n, 0);
        self.on_stack.clear();
        self.on_stack.resize(n, false);
        self.in_degree.clear();
        self.in_degree.resize(n, 0);
        self.scc_stack.clear();
        self.call_stack.clear();
        self.queue.clear();
        self.uf.reset(n);
        self.timer = 0;
    }

    #[inline]
    fn discover(&mut self, v: PointerId) {
        self.pre[v as usize] = self.timer;
        self.low[v as usize] = self.timer;
        self.timer += 1;
        self.scc_stack.push(v);
        self.on_stack[v as usize] = true;
    }

    /// Tarjan's DFS from `root`, driven by an explicit frame stack
    fn strong_connect(&mut self, root: PointerId, graph: &PointerGraph) {
        self.discover(root);
        self.call_stack.push(Frame { node: root, edge_ix: 0 });

        while let Some(frame) = self.call_stack.last_mut() {
            let v = frame.node;
            let out = graph.edges(v);

            let next = if frame.edge_ix < out.len() {
                let w = out[frame.edge_ix].target;
                frame.edge_ix += 1;
                Some(w)
            } else {
                None
            };

            match next {
                Some(w) => {
                    if self.pre[w as usize] == UNVISITED {
                        self.discover(w);
                        self.call_stack.push(Frame { node: w, edge_ix: 0 });
                    } else if self.on_stack[w as usize] && self.pre[w as usize] < self.low[v as usize]
                    {
                        self.low[v as usize] = self.pre[w as usize];
                    }
                }
                None => {
                    self.call_stack.pop();
                    if let Some(parent) = self.call_stack.last() {
                        let p = parent.node as usize;
                        if self.low[v as usize] < self.low[p] {
                            self.low[p] = self.low[v as usize];
                        }
                    }
                    if self.low[v as usize] == self.pre[v as usize] {
                        self.pop_component(v);
                    }
                }
            }
        }
    }

    /// Pop one finished component off the stack, contracting it on the spot
    fn pop_component(&mut self, root: PointerId) {
        let mut rep: Option<PointerId> = None;
        while let Some(w) = self.scc_stack.pop() {
            self.on_stack[w as usize] = false;
            rep = Some(match rep {
                None => w,
                Some(r) => self.uf.union(r, w),
            });
            if w == root {
                break;
            }
        }
    }
}
