//! Preprocessing Ports - Interface Layer (Hexagonal Architecture)
//!
//! The preprocessor never owns program facts. Everything it needs beyond the
//! constraint set (call graph reachability, cast feasibility, the points-to
//! assignment of the previous round) comes in through these traits, bundled
//! into a [`PrepSession`] that is passed explicitly into every pass.
//!
//! ## Hexagonal Architecture
//! - **Ports**: Define interfaces for adapters (this module)
//! - **Adapters**: Implemented by the embedding solver and by test fixtures
//!
//! ## Dependency Inversion
//! The application layer depends on these traits, not on any concrete call
//! graph or solver representation.

use serde::{Deserialize, Serialize};

use crate::domain::pointer::{ObjId, PointerId, RoutineId, TypeId, VarHandle};

// ═══════════════════════════════════════════════════════════════════════════
// DTOs
// ═══════════════════════════════════════════════════════════════════════════

/// One call-graph edge leaving a routine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallEdge {
    /// Receiver variable of a virtual dispatch, `None` for static calls
    pub receiver: Option<VarHandle>,

    /// Number of concrete targets the dispatch resolved to
    pub resolved_targets: u32,
}

/// One downcast site inside a routine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastSite {
    /// Variable being cast
    pub operand: VarHandle,

    /// Type the operand is cast to
    pub target_type: TypeId,
}

/// Precision of the injected points-to assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointsToMode {
    /// Over-approximate sets from a prior round or a cheap pre-analysis
    Approximate,

    /// Exact sets; local-variable merging is skipped to preserve precision
    Exact,
}

impl PointsToMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PointsToMode::Approximate => "approximate",
            PointsToMode::Exact => "exact",
        }
    }
}

impl Default for PointsToMode {
    fn default() -> Self {
        PointsToMode::Approximate
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Driven Ports (program facts)
// ═══════════════════════════════════════════════════════════════════════════

/// Call-graph and type facts about the program under analysis
pub trait ProgramView: Send + Sync {
    /// Check if a routine is reachable from the entry points
    fn is_reachable(&self, routine: RoutineId) -> bool;

    /// Check if a routine belongs to library code
    fn is_library(&self, routine: RoutineId) -> bool;

    /// Check if a routine has a body (not abstract, not native)
    fn is_concrete(&self, routine: RoutineId) -> bool;

    /// All routines reachable from the entry points
    fn reachable_routines(&self) -> Box<dyn Iterator<Item = RoutineId> + '_>;

    /// Outgoing call edges of a routine
    fn call_edges(&self, routine: RoutineId) -> Box<dyn Iterator<Item = CallEdge> + '_>;

    /// Downcast sites inside a routine
    fn cast_sites(&self, routine: RoutineId) -> Box<dyn Iterator<Item = CastSite> + '_>;

    /// Receiver variables of every virtual call site in reachable code
    ///
    /// These are seeded in every round regardless of policy: dispatch
    /// resolution always consumes their points-to sets.
    fn virtual_call_bases(&self) -> Box<dyn Iterator<Item = VarHandle> + '_>;

    /// Static type of an abstract heap object
    fn object_type(&self, obj: ObjId) -> TypeId;
}

/// Type-hierarchy oracle for downcast feasibility
pub trait CastChecker: Send + Sync {
    /// Check if a value of type `from` always satisfies a cast to `to`
    fn cast_never_fails(&self, from: TypeId, to: TypeId) -> bool;
}

/// Points-to assignment injected from the previous solver round
///
/// Queries take equivalence-class representatives; callers route pointers
/// through `PointerTable::representative` first.
pub trait PointsToSource: Send + Sync {
    /// Objects the pointer may refer to (empty on the first round)
    fn points_to(&self, pointer: PointerId) -> Box<dyn Iterator<Item = ObjId> + '_>;

    /// Precision of the assignment backing this source
    fn mode(&self) -> PointsToMode {
        PointsToMode::Approximate
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Session Context
// ═══════════════════════════════════════════════════════════════════════════

/// Everything a preprocessing round consumes, passed explicitly
///
/// Holding the ports in one context keeps the passes free of process-wide
/// state: two sessions over different programs can run side by side.
#[derive(Clone, Copy)]
pub struct PrepSession<'a> {
    /// Call-graph and type facts
    pub program: &'a dyn ProgramView,

    /// Downcast feasibility oracle
    pub casts: &'a dyn CastChecker,

    /// Points-to assignment of the previous round
    pub points_to: &'a dyn PointsToSource,
}

impl<'a> PrepSession<'a> {
    pub fn new(
        program: &'a dyn ProgramView,
        casts: &'a dyn CastChecker,
        points_to: &'a dyn PointsToSource,
    ) -> Self {
        Self {
            program,
            casts,
            points_to,
        }
    }
}
