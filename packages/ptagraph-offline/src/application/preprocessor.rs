//! Offline Constraint-Graph Preprocessor
//!
//! Per-round pass pipeline that shrinks a constraint system before the main
//! points-to solve:
//! 1. Backward dependence graph over the constraints, with unreachable-code
//!    elimination folded into the sweep
//! 2. Seed liveness propagation and constraint distillation
//! 3. Forward impact graph, SCC condensation, topological priorities
//! 4. Single-definition local-variable merging (approximate rounds only)
//!
//! A round is `init_round` → `select_seeds` / `add_seeds` → `run_preprocessing`,
//! with `teardown` releasing scratch memory once no more rounds are expected.
//! Constraint statuses only ever move away from `Active` inside a round; new
//! constraints and pointers may be added between rounds as the call graph
//! grows.
//!
//! # Complexity
//! - Graph passes: O(V + E) over pointers and constraint-induced edges
//! - Condensation and numbering: O(V + E) Tarjan + Kahn
//! - Steady-state rounds reuse all scratch buffers

use std::collections::VecDeque;
use std::time::Instant;

use rustc_hash::FxHashSet;
use tracing::{debug, info};

use crate::application::seeding::{self, SeedPolicy};
use crate::domain::constraint::{Constraint, ConstraintKind, ConstraintSet, ConstraintStatus};
use crate::domain::pointer::{PointerId, PointerKind, PointerTable, VarHandle};
use crate::error::{PrepError, Result};
use crate::infrastructure::graph::PointerGraph;
use crate::infrastructure::scc::SccCondenser;
use crate::ports::{PointsToMode, PrepSession};

/// Statistics for one preprocessing round
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct PrepStats {
    pub round: u32,
    pub policy: SeedPolicy,
    pub mode: PointsToMode,

    /// Size of the pointer universe this round
    pub pointers: usize,

    /// Seed pointers elected by policy and client
    pub seeds: usize,

    /// Pointers reached by the backward dependence sweep
    pub live_pointers: usize,

    pub constraints_total: usize,
    pub active_before: usize,
    pub active_after: usize,

    /// Constraints demoted for touching unreachable code
    pub marked_unreachable: usize,

    /// Constraints demoted to isolated queries
    pub distilled: usize,

    /// Assignments subsumed by local-variable merging
    pub merged_locals: usize,

    pub scc_count: usize,
    pub collapsed: usize,

    pub duration_distill_ms: f64,
    pub duration_weights_ms: f64,
    pub duration_ms: f64,
}

/// Offline preprocessing driver
///
/// Owns the durable state (pointer registry, constraint set) and the
/// round-scoped scratch (graphs, worklist, condenser). The embedding solver
/// supplies program facts through a [`PrepSession`] per call.
#[derive(Debug)]
pub struct OfflinePreprocessor {
    max_pointers: usize,

    table: PointerTable,
    constraints: ConstraintSet,

    graph: PointerGraph,
    condenser: SccCondenser,
    worklist: VecDeque<PointerId>,

    /// In-degree scratch for the merge pass
    in_degree: Vec<u32>,

    /// Field-pointer scratch for store distillation
    field_scratch: FxHashSet<PointerId>,

    policy: SeedPolicy,
    seeds: usize,
    round: u32,
    armed: bool,
}

impl OfflinePreprocessor {
    /// Create a driver for a pointer universe of at most `max_pointers`
    pub fn new(max_pointers: usize) -> Self {
        Self {
            max_pointers,
            table: PointerTable::new(),
            constraints: ConstraintSet::new(),
            graph: PointerGraph::with_capacity(max_pointers),
            condenser: SccCondenser::new(),
            worklist: VecDeque::new(),
            in_degree: Vec::new(),
            field_scratch: FxHashSet::default(),
            policy: SeedPolicy::default(),
            seeds: 0,
            round: 0,
            armed: false,
        }
    }

    /// Pointer registry, for queries
    #[inline]
    pub fn table(&self) -> &PointerTable {
        &self.table
    }

    /// Pointer registry, for registration and retirement
    #[inline]
    pub fn table_mut(&mut self) -> &mut PointerTable {
        &mut self.table
    }

    /// Constraint set with current statuses
    #[inline]
    pub fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }

    /// Rounds completed or in flight
    #[inline]
    pub fn round(&self) -> u32 {
        self.round
    }

    /// Seed policy recorded by the current or most recent round
    #[inline]
    pub fn seed_policy(&self) -> SeedPolicy {
        self.policy
    }

    /// Add a constraint; operands must be registered pointers
    ///
    /// The allocation source is an object id and is not checked against the
    /// pointer universe.
    pub fn add_constraint(&mut self, constraint: Constraint) -> Result<()> {
        let n = self.table.len() as PointerId;
        if constraint.lhs >= n {
            return Err(PrepError::registration(format!(
                "constraint receiver {} is not a registered pointer",
                constraint.lhs
            )));
        }
        if constraint.kind != ConstraintKind::Alloc && constraint.rhs >= n {
            return Err(PrepError::registration(format!(
                "constraint source {} is not a registered pointer",
                constraint.rhs
            )));
        }
        self.constraints.add(constraint);
        Ok(())
    }

    /// Start a round: size the scratch to the current universe and clear
    /// per-round pointer state
    pub fn init_round(&mut self) -> Result<()> {
        let n = self.table.len();
        if n > self.max_pointers {
            return Err(PrepError::capacity(format!(
                "{} pointers exceed the configured capacity of {}",
                n, self.max_pointers
            )));
        }
        self.graph.reset(n);
        self.table.clear_liveness();
        self.worklist.clear();
        self.seeds = 0;
        self.round += 1;
        self.armed = true;
        debug!("Round {} initialized over {} pointers", self.round, n);
        Ok(())
    }

    /// Elect the seed pointers for this round
    ///
    /// Virtual-call receivers are seeded before the policy body runs; the
    /// call graph can only grow through their points-to sets.
    pub fn select_seeds(&mut self, policy: SeedPolicy, session: &PrepSession<'_>) -> Result<()> {
        self.ensure_armed()?;
        self.seeds += seeding::seed_handles(
            &mut self.table,
            &mut self.worklist,
            session.program.virtual_call_bases(),
        );
        self.seeds += seeding::run_policy(policy, &mut self.table, &mut self.worklist, session);
        self.policy = policy;
        Ok(())
    }

    /// Seed client-chosen variables on top of the policy selection
    ///
    /// Handles that no longer resolve are skipped.
    pub fn add_seeds<I>(&mut self, handles: I) -> Result<()>
    where
        I: IntoIterator<Item = VarHandle>,
    {
        self.ensure_armed()?;
        self.seeds += seeding::seed_handles(&mut self.table, &mut self.worklist, handles);
        Ok(())
    }

    /// Run the full pass pipeline for the current round
    pub fn run_preprocessing(&mut self, session: &PrepSession<'_>) -> Result<PrepStats> {
        self.ensure_armed()?;
        let total_start = Instant::now();

        let pointers = self.table.len();
        let constraints_total = self.constraints.len();
        let active_before = self.constraints.count_with_status(ConstraintStatus::Active);
        let mode = session.points_to.mode();

        let distill_start = Instant::now();
        let marked_unreachable = self.build_dependence_graph(session);
        self.propagate_liveness();
        let live_pointers = self.table.iter().filter(|(_, v)| v.live).count();
        let distilled = self.distill_constraints(session);
        let duration_distill_ms = distill_start.elapsed().as_secs_f64() * 1000.0;

        let weights_start = Instant::now();
        self.build_impact_graph(session);
        let condense = self.condenser.assign_priorities(&mut self.graph, &mut self.table);
        let merged_locals = if mode == PointsToMode::Approximate {
            self.merge_local_variables()
        } else {
            debug!("Exact points-to sets: local-variable merging skipped");
            0
        };
        let duration_weights_ms = weights_start.elapsed().as_secs_f64() * 1000.0;

        let active_after = self.constraints.count_with_status(ConstraintStatus::Active);
        self.armed = false;

        let stats = PrepStats {
            round: self.round,
            policy: self.policy,
            mode,
            pointers,
            seeds: self.seeds,
            live_pointers,
            constraints_total,
            active_before,
            active_after,
            marked_unreachable,
            distilled,
            merged_locals,
            scc_count: condense.scc_count,
            collapsed: condense.collapsed,
            duration_distill_ms,
            duration_weights_ms,
            duration_ms: total_start.elapsed().as_secs_f64() * 1000.0,
        };

        info!(
            "Round {} ({}): {} -> {} active constraints, {}/{} pointers live, {} components, {:.2}ms",
            stats.round,
            stats.policy.as_str(),
            stats.active_before,
            stats.active_after,
            stats.live_pointers,
            stats.pointers,
            stats.scc_count,
            stats.duration_ms
        );
        Ok(stats)
    }

    /// Release all round-scoped scratch memory
    ///
    /// The pointer registry and the constraint set survive; a later
    /// `init_round` re-dimensions the scratch.
    pub fn teardown(&mut self) {
        self.graph = PointerGraph::new();
        self.condenser = SccCondenser::new();
        self.worklist = VecDeque::new();
        self.in_degree = Vec::new();
        self.field_scratch = FxHashSet::default();
        self.armed = false;
        debug!("Released preprocessing scratch memory");
    }

    fn ensure_armed(&self) -> Result<()> {
        if self.armed {
            Ok(())
        } else {
            Err(PrepError::lifecycle(
                "init_round must precede seeding and preprocessing",
            ))
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Phase 1: backward dependence graph
    // ═══════════════════════════════════════════════════════════════════════

    /// Build the dependence graph (edges from dependents to dependencies)
    /// and demote constraints touching unreachable code
    ///
    /// Non-active assignments still contribute edges: an assignment subsumed
    /// by merging must not disconnect the graph for later rounds.
    fn build_dependence_graph(&mut self, session: &PrepSession<'_>) -> usize {
        let table = &mut self.table;
        let graph = &mut self.graph;
        let mut marked = 0;

        for cons in self.constraints.constraints.iter_mut() {
            if cons.status == ConstraintStatus::MarkForRemoval {
                continue;
            }
            if !cons.is_active() && cons.kind != ConstraintKind::Assign {
                continue;
            }

            let mut dead = local_of_unreachable(table, session, cons.lhs);
            if !dead && cons.kind != ConstraintKind::Alloc {
                dead = local_of_unreachable(table, session, cons.rhs);
            }
            if dead {
                cons.status = ConstraintStatus::MarkForRemoval;
                marked += 1;
                continue;
            }

            match cons.kind {
                ConstraintKind::Alloc => {}
                ConstraintKind::Assign => {
                    // dst = src: dst depends on src
                    graph.add_edge(cons.lhs, cons.rhs);
                }
                ConstraintKind::Load => {
                    // dst = base.f: dst depends on every o.f, and on base
                    let Some(field) = cons.field else { continue };
                    let rep = table.representative(cons.rhs);
                    for obj in session.points_to.points_to(rep) {
                        if let Some(fa) = table.instance_field(obj, field) {
                            graph.add_edge_with_base(cons.lhs, fa, cons.rhs);
                        }
                    }
                }
                ConstraintKind::Store => {
                    // base.f = src: every o.f depends on src, and on base
                    let Some(field) = cons.field else { continue };
                    let rep = table.representative(cons.lhs);
                    for obj in session.points_to.points_to(rep) {
                        if let Some(fa) = table.instance_field(obj, field) {
                            graph.add_edge_with_base(fa, cons.rhs, cons.lhs);
                        }
                    }
                }
            }
        }

        debug!(
            "Dependence graph: {} edges, {} constraints in unreachable code",
            graph.edge_count(),
            marked
        );
        marked
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Phase 2: liveness propagation and distillation
    // ═══════════════════════════════════════════════════════════════════════

    /// Flood liveness backwards from the seeds, through field-access bases
    fn propagate_liveness(&mut self) {
        let table = &mut self.table;
        let graph = &self.graph;

        while let Some(i) = self.worklist.pop_front() {
            for edge in graph.edges(i) {
                if !table.is_live(edge.target) {
                    table.mark_live(edge.target);
                    self.worklist.push_back(edge.target);
                }
                if let Some(base) = edge.base {
                    if !table.is_live(base) {
                        table.mark_live(base);
                        self.worklist.push_back(base);
                    }
                }
            }
        }
    }

    /// Demote constraints that cannot influence any live pointer
    ///
    /// A store is kept if any reachable field pointer is live; keeping it
    /// then forces all those field pointers live, since the store writes
    /// every one of them.
    fn distill_constraints(&mut self, session: &PrepSession<'_>) -> usize {
        let table = &mut self.table;
        let scratch = &mut self.field_scratch;
        let mut distilled = 0;

        for cons in self.constraints.constraints.iter_mut() {
            if !cons.is_active() {
                continue;
            }

            let keep = match cons.kind {
                ConstraintKind::Alloc | ConstraintKind::Assign | ConstraintKind::Load => {
                    table.is_live(cons.lhs)
                }
                ConstraintKind::Store => {
                    let Some(field) = cons.field else { continue };
                    scratch.clear();
                    let mut any_live = false;
                    let rep = table.representative(cons.lhs);
                    for obj in session.points_to.points_to(rep) {
                        if let Some(fa) = table.instance_field(obj, field) {
                            scratch.insert(fa);
                            any_live |= table.is_live(fa);
                        }
                    }
                    if any_live {
                        for &fa in scratch.iter() {
                            table.mark_live(fa);
                        }
                    }
                    any_live
                }
            };

            if !keep {
                cons.status = ConstraintStatus::IndepQuery;
                distilled += 1;
            }
        }

        debug!("Distilled {} constraints into isolated queries", distilled);
        distilled
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Phase 3: forward impact graph
    // ═══════════════════════════════════════════════════════════════════════

    /// Rebuild the scratch graph with value-flow direction (source → sink)
    fn build_impact_graph(&mut self, session: &PrepSession<'_>) {
        let n = self.table.len();
        self.graph.reset(n);
        self.worklist.clear();

        let table = &mut self.table;
        let graph = &mut self.graph;

        for cons in self.constraints.constraints.iter() {
            if !cons.is_active() {
                continue;
            }
            match cons.kind {
                // Allocations inject values but induce no edge
                ConstraintKind::Alloc => {}
                ConstraintKind::Assign => {
                    graph.add_edge(cons.rhs, cons.lhs);
                }
                ConstraintKind::Load => {
                    let Some(field) = cons.field else { continue };
                    let rep = table.representative(cons.rhs);
                    for obj in session.points_to.points_to(rep) {
                        if let Some(fa) = table.instance_field(obj, field) {
                            graph.add_edge(fa, cons.lhs);
                        }
                    }
                }
                ConstraintKind::Store => {
                    let Some(field) = cons.field else { continue };
                    let rep = table.representative(cons.lhs);
                    for obj in session.points_to.points_to(rep) {
                        if let Some(fa) = table.instance_field(obj, field) {
                            graph.add_edge(cons.rhs, fa);
                        }
                    }
                }
            }
        }

        debug!("Impact graph: {} edges over {} pointers", graph.edge_count(), n);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Phase 4: local-variable merging
    // ═══════════════════════════════════════════════════════════════════════

    /// Collapse single-definition same-type local copies into one class
    ///
    /// `x = y` merges x into y's class when both are locals of the same
    /// routine with equal static types and the assignment is the only value
    /// inflow of x. The subsumed assignment gets status `EqualPtrs`.
    fn merge_local_variables(&mut self) -> usize {
        let n = self.table.len();
        self.in_degree.clear();
        self.in_degree.resize(n, 0);

        // Value inflow per pointer: impact edges plus allocation receivers
        for i in 0..n as PointerId {
            for edge in self.graph.edges(i) {
                self.in_degree[edge.target as usize] += 1;
            }
        }
        for cons in self.constraints.constraints.iter() {
            if cons.is_active() && cons.kind == ConstraintKind::Alloc {
                self.in_degree[cons.lhs as usize] += 1;
            }
        }

        let table = &mut self.table;
        let counts = &self.in_degree;
        let mut merged = 0;

        for cons in self.constraints.constraints.iter_mut() {
            if !cons.is_active() || cons.kind != ConstraintKind::Assign {
                continue;
            }
            let (PointerKind::Local { routine: r1 }, PointerKind::Local { routine: r2 }) =
                (table.kind(cons.lhs), table.kind(cons.rhs))
            else {
                continue;
            };
            if r1 != r2 {
                continue;
            }
            if counts[cons.lhs as usize] != 1 {
                continue;
            }
            if table.static_type(cons.lhs) != table.static_type(cons.rhs) {
                continue;
            }

            let live = table.is_live(cons.lhs) || table.is_live(cons.rhs);
            let root = table.merge(cons.lhs, cons.rhs);
            if live {
                table.mark_live(root);
            }
            cons.status = ConstraintStatus::EqualPtrs;
            merged += 1;
        }

        debug!("Merged {} single-definition local copies", merged);
        merged
    }
}

/// Check if a pointer is a local of an unreachable routine
fn local_of_unreachable(
    table: &PointerTable,
    session: &PrepSession<'_>,
    p: PointerId,
) -> bool {
    match table.kind(p) {
        PointerKind::Local { routine } => !session.program.is_reachable(routine),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::pointer::{ObjId, RoutineId, TypeId};
    use crate::ports::{CallEdge, CastChecker, CastSite, PointsToSource, ProgramView};

    struct StubProgram;

    impl ProgramView for StubProgram {
        fn is_reachable(&self, _routine: RoutineId) -> bool {
            true
        }
        fn is_library(&self, _routine: RoutineId) -> bool {
            false
        }
        fn is_concrete(&self, _routine: RoutineId) -> bool {
            true
        }
        fn reachable_routines(&self) -> Box<dyn Iterator<Item = RoutineId> + '_> {
            Box::new(std::iter::once(0))
        }
        fn call_edges(&self, _routine: RoutineId) -> Box<dyn Iterator<Item = CallEdge> + '_> {
            Box::new(std::iter::empty())
        }
        fn cast_sites(&self, _routine: RoutineId) -> Box<dyn Iterator<Item = CastSite> + '_> {
            Box::new(std::iter::empty())
        }
        fn virtual_call_bases(&self) -> Box<dyn Iterator<Item = VarHandle> + '_> {
            Box::new(std::iter::empty())
        }
        fn object_type(&self, _obj: ObjId) -> TypeId {
            0
        }
    }

    struct StubCasts;

    impl CastChecker for StubCasts {
        fn cast_never_fails(&self, _from: TypeId, _to: TypeId) -> bool {
            true
        }
    }

    struct StubPts;

    impl PointsToSource for StubPts {
        fn points_to(&self, _pointer: PointerId) -> Box<dyn Iterator<Item = ObjId> + '_> {
            Box::new(std::iter::empty())
        }
    }

    #[test]
    fn test_operations_require_initialized_round() {
        let mut pre = OfflinePreprocessor::new(16);
        let (program, casts, pts) = (StubProgram, StubCasts, StubPts);
        let session = PrepSession::new(&program, &casts, &pts);

        assert!(matches!(
            pre.select_seeds(SeedPolicy::AllUserCode, &session),
            Err(PrepError::Lifecycle(_))
        ));
        assert!(matches!(pre.add_seeds([1]), Err(PrepError::Lifecycle(_))));
        assert!(matches!(
            pre.run_preprocessing(&session),
            Err(PrepError::Lifecycle(_))
        ));
    }

    #[test]
    fn test_capacity_guard() {
        let mut pre = OfflinePreprocessor::new(1);
        pre.table_mut().register_local(1, 0, 0).unwrap();
        pre.table_mut().register_local(2, 0, 0).unwrap();

        let err = pre.init_round().unwrap_err();
        assert!(matches!(err, PrepError::Capacity(_)));
    }

    #[test]
    fn test_add_constraint_validates_operands() {
        let mut pre = OfflinePreprocessor::new(16);
        let p = pre.table_mut().register_local(1, 0, 0).unwrap();

        assert!(pre.add_constraint(Constraint::assign(p, 5)).is_err());
        assert!(pre.add_constraint(Constraint::assign(5, p)).is_err());
        // Allocation source lives in the object space, not checked here
        assert!(pre.add_constraint(Constraint::alloc(p, 99)).is_ok());
    }

    #[test]
    fn test_round_is_single_shot() {
        let mut pre = OfflinePreprocessor::new(16);
        let (program, casts, pts) = (StubProgram, StubCasts, StubPts);
        let session = PrepSession::new(&program, &casts, &pts);

        pre.init_round().unwrap();
        pre.select_seeds(SeedPolicy::AllUserCode, &session).unwrap();
        let stats = pre.run_preprocessing(&session).unwrap();
        assert_eq!(stats.round, 1);

        // A second run needs a fresh init
        assert!(matches!(
            pre.run_preprocessing(&session),
            Err(PrepError::Lifecycle(_))
        ));
        pre.init_round().unwrap();
        let stats = pre.run_preprocessing(&session).unwrap();
        assert_eq!(stats.round, 2);
    }

    #[test]
    fn test_smoke_pipeline_keeps_user_chain() {
        let mut pre = OfflinePreprocessor::new(16);
        let x = pre.table_mut().register_local(1, 0, 7).unwrap();
        let y = pre.table_mut().register_local(2, 0, 7).unwrap();
        pre.add_constraint(Constraint::alloc(x, 0)).unwrap();
        pre.add_constraint(Constraint::assign(y, x)).unwrap();

        let (program, casts, pts) = (StubProgram, StubCasts, StubPts);
        let session = PrepSession::new(&program, &casts, &pts);

        pre.init_round().unwrap();
        pre.select_seeds(SeedPolicy::AllUserCode, &session).unwrap();
        let stats = pre.run_preprocessing(&session).unwrap();

        assert_eq!(stats.pointers, 2);
        assert_eq!(stats.seeds, 2);
        assert_eq!(stats.live_pointers, 2);
        assert_eq!(stats.marked_unreachable, 0);
        assert_eq!(stats.distilled, 0);
        // y = x is y's only inflow, same routine and type: merged
        assert_eq!(stats.merged_locals, 1);
        assert_eq!(stats.active_after, 1);
        let rx = pre.table_mut().representative(x);
        let ry = pre.table_mut().representative(y);
        assert_eq!(rx, ry);

        // Priorities were assigned to the whole universe
        assert!(pre.table().priority(x).is_some());
        assert!(pre.table().priority(y).is_some());
    }

    #[test]
    fn test_teardown_then_new_round() {
        let mut pre = OfflinePreprocessor::new(16);
        pre.table_mut().register_local(1, 0, 0).unwrap();

        let (program, casts, pts) = (StubProgram, StubCasts, StubPts);
        let session = PrepSession::new(&program, &casts, &pts);

        pre.init_round().unwrap();
        pre.run_preprocessing(&session).unwrap();
        pre.teardown();

        pre.init_round().unwrap();
        let stats = pre.run_preprocessing(&session).unwrap();
        assert_eq!(stats.round, 2);
    }
}
