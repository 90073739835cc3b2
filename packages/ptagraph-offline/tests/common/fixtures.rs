//! Program-fact fixture backing all three session ports
//!
//! One builder stands in for the call graph, the type hierarchy, and the
//! previous round's points-to assignment, so tests describe a whole program
//! in a few lines and hand the same value to every port slot.

use rustc_hash::{FxHashMap, FxHashSet};

use ptagraph_offline::{
    CallEdge, CastChecker, CastSite, ObjId, PointerId, PointsToMode, PointsToSource, PrepSession,
    ProgramView, RoutineId, TypeId, VarHandle,
};

/// In-memory program description implementing all session ports
#[derive(Debug, Default)]
pub struct TestProgram {
    reachable: FxHashSet<RoutineId>,
    library: FxHashSet<RoutineId>,
    non_concrete: FxHashSet<RoutineId>,
    call_edges: FxHashMap<RoutineId, Vec<CallEdge>>,
    cast_sites: FxHashMap<RoutineId, Vec<CastSite>>,
    virtual_bases: Vec<VarHandle>,
    object_types: FxHashMap<ObjId, TypeId>,
    points_to: FxHashMap<PointerId, Vec<ObjId>>,
    safe_casts: FxHashSet<(TypeId, TypeId)>,
    mode: PointsToMode,
}

impl TestProgram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a routine reachable from the entry points
    pub fn with_reachable(mut self, routine: RoutineId) -> Self {
        self.reachable.insert(routine);
        self
    }

    /// Mark a routine as library code
    pub fn with_library(mut self, routine: RoutineId) -> Self {
        self.library.insert(routine);
        self
    }

    /// Mark a routine as abstract or native (no body)
    pub fn with_non_concrete(mut self, routine: RoutineId) -> Self {
        self.non_concrete.insert(routine);
        self
    }

    /// Add an outgoing call edge to a routine
    pub fn with_call_edge(
        mut self,
        routine: RoutineId,
        receiver: Option<VarHandle>,
        resolved_targets: u32,
    ) -> Self {
        self.call_edges
            .entry(routine)
            .or_default()
            .push(CallEdge { receiver, resolved_targets });
        self
    }

    /// Add a downcast site to a routine
    pub fn with_cast(mut self, routine: RoutineId, operand: VarHandle, target_type: TypeId) -> Self {
        self.cast_sites
            .entry(routine)
            .or_default()
            .push(CastSite { operand, target_type });
        self
    }

    /// Register a virtual-call receiver, seeded in every round
    pub fn with_virtual_base(mut self, handle: VarHandle) -> Self {
        self.virtual_bases.push(handle);
        self
    }

    /// Record the run-time type of an abstract object
    pub fn with_object_type(mut self, obj: ObjId, ty: TypeId) -> Self {
        self.object_types.insert(obj, ty);
        self
    }

    /// Record a pointer's points-to set from the previous round
    pub fn with_points_to(mut self, pointer: PointerId, objects: &[ObjId]) -> Self {
        self.points_to.insert(pointer, objects.to_vec());
        self
    }

    /// Declare a cast from → to as infallible
    pub fn with_safe_cast(mut self, from: TypeId, to: TypeId) -> Self {
        self.safe_casts.insert((from, to));
        self
    }

    /// Set the precision mode of the points-to assignment
    pub fn with_mode(mut self, mode: PointsToMode) -> Self {
        self.mode = mode;
        self
    }

    /// Session wiring all three ports to this fixture
    pub fn session(&self) -> PrepSession<'_> {
        PrepSession::new(self, self, self)
    }
}

impl ProgramView for TestProgram {
    fn is_reachable(&self, routine: RoutineId) -> bool {
        self.reachable.contains(&routine)
    }

    fn is_library(&self, routine: RoutineId) -> bool {
        self.library.contains(&routine)
    }

    fn is_concrete(&self, routine: RoutineId) -> bool {
        !self.non_concrete.contains(&routine)
    }

    fn reachable_routines(&self) -> Box<dyn Iterator<Item = RoutineId> + '_> {
        let mut routines: Vec<_> = self.reachable.iter().copied().collect();
        routines.sort_unstable();
        Box::new(routines.into_iter())
    }

    fn call_edges(&self, routine: RoutineId) -> Box<dyn Iterator<Item = CallEdge> + '_> {
        Box::new(self.call_edges.get(&routine).into_iter().flatten().copied())
    }

    fn cast_sites(&self, routine: RoutineId) -> Box<dyn Iterator<Item = CastSite> + '_> {
        Box::new(self.cast_sites.get(&routine).into_iter().flatten().copied())
    }

    fn virtual_call_bases(&self) -> Box<dyn Iterator<Item = VarHandle> + '_> {
        Box::new(self.virtual_bases.iter().copied())
    }

    fn object_type(&self, obj: ObjId) -> TypeId {
        self.object_types.get(&obj).copied().unwrap_or(0)
    }
}

impl CastChecker for TestProgram {
    fn cast_never_fails(&self, from: TypeId, to: TypeId) -> bool {
        from == to || self.safe_casts.contains(&(from, to))
    }
}

impl PointsToSource for TestProgram {
    fn points_to(&self, pointer: PointerId) -> Box<dyn Iterator<Item = ObjId> + '_> {
        Box::new(self.points_to.get(&pointer).into_iter().flatten().copied())
    }

    fn mode(&self) -> PointsToMode {
        self.mode
    }
}
