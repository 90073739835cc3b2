//! Points-to Constraints
//!
//! Four constraint kinds following the inclusion-based formulation:
//! - ALLOC:  x = new T()   → pts(x) ⊇ {obj}
//! - ASSIGN: x = y         → pts(x) ⊇ pts(y)
//! - LOAD:   x = y.f       → ∀o ∈ pts(y): pts(x) ⊇ pts(o.f)
//! - STORE:  x.f = y       → ∀o ∈ pts(x): pts(o.f) ⊇ pts(y)
//!
//! Every constraint additionally carries a processing status that the
//! offline passes advance monotonically within one round: a constraint
//! starts `Active` and may be demoted to `MarkForRemoval` (touches
//! unreachable code), `IndepQuery` (cannot influence any seed pointer;
//! answerable in isolation), or `EqualPtrs` (subsumed by a local-variable
//! merge). No demotion is ever reverted inside a round.

use super::pointer::{FieldId, ObjId, PointerId};
use serde::{Deserialize, Serialize};

/// Constraint kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintKind {
    /// Allocation: x = new T()
    Alloc,

    /// Copy: x = y
    Assign,

    /// Field load: x = y.f
    Load,

    /// Field store: x.f = y
    Store,
}

impl ConstraintKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConstraintKind::Alloc => "ALLOC",
            ConstraintKind::Assign => "ASSIGN",
            ConstraintKind::Load => "LOAD",
            ConstraintKind::Store => "STORE",
        }
    }
}

/// Processing status of a constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintStatus {
    /// The solver must process this constraint
    Active,

    /// Touches unreachable code; dead for all purposes
    MarkForRemoval,

    /// Distilled out of the main solve; answerable as an isolated query
    IndepQuery,

    /// Subsumed by merging its two operands into one equivalence class
    EqualPtrs,
}

impl ConstraintStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConstraintStatus::Active => "active",
            ConstraintStatus::MarkForRemoval => "mark_for_removal",
            ConstraintStatus::IndepQuery => "indep_query",
            ConstraintStatus::EqualPtrs => "equal_ptrs",
        }
    }
}

impl Default for ConstraintStatus {
    fn default() -> Self {
        ConstraintStatus::Active
    }
}

/// A single constraint between pointer variables
///
/// `lhs` is always the receiver operand: the allocation receiver, the
/// copy/load destination, or the store base. `rhs` is the source pointer
/// (or, for `Alloc`, the allocated object id reinterpreted into the same
/// integer space).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Constraint {
    /// Constraint kind
    pub kind: ConstraintKind,

    /// Receiver operand (destination; store base)
    pub lhs: PointerId,

    /// Source operand (object id for ALLOC; stored value for STORE)
    pub rhs: PointerId,

    /// Field descriptor, present exactly for LOAD/STORE
    pub field: Option<FieldId>,

    /// Processing status, advanced by the offline passes
    pub status: ConstraintStatus,
}

impl Constraint {
    /// Allocation constraint: receiver = new T()
    #[inline]
    pub fn alloc(receiver: PointerId, object: ObjId) -> Self {
        Self {
            kind: ConstraintKind::Alloc,
            lhs: receiver,
            rhs: object,
            field: None,
            status: ConstraintStatus::Active,
        }
    }

    /// Copy constraint: dst = src
    #[inline]
    pub fn assign(dst: PointerId, src: PointerId) -> Self {
        Self {
            kind: ConstraintKind::Assign,
            lhs: dst,
            rhs: src,
            field: None,
            status: ConstraintStatus::Active,
        }
    }

    /// Field load constraint: dst = base.field
    #[inline]
    pub fn load(dst: PointerId, base: PointerId, field: FieldId) -> Self {
        Self {
            kind: ConstraintKind::Load,
            lhs: dst,
            rhs: base,
            field: Some(field),
            status: ConstraintStatus::Active,
        }
    }

    /// Field store constraint: base.field = src
    #[inline]
    pub fn store(base: PointerId, field: FieldId, src: PointerId) -> Self {
        Self {
            kind: ConstraintKind::Store,
            lhs: base,
            rhs: src,
            field: Some(field),
            status: ConstraintStatus::Active,
        }
    }

    /// Check if this is a field-sensitive constraint (LOAD or STORE)
    #[inline]
    pub fn is_complex(&self) -> bool {
        matches!(self.kind, ConstraintKind::Load | ConstraintKind::Store)
    }

    /// Check if the solver still has to process this constraint
    #[inline]
    pub fn is_active(&self) -> bool {
        self.status == ConstraintStatus::Active
    }
}

/// Constraint set with per-kind statistics
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ConstraintSet {
    /// All constraints
    pub constraints: Vec<Constraint>,

    /// Statistics
    pub alloc_count: usize,
    pub assign_count: usize,
    pub load_count: usize,
    pub store_count: usize,
}

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            constraints: Vec::with_capacity(capacity),
            ..Default::default()
        }
    }

    /// Add a constraint and update statistics
    pub fn add(&mut self, constraint: Constraint) {
        match constraint.kind {
            ConstraintKind::Alloc => self.alloc_count += 1,
            ConstraintKind::Assign => self.assign_count += 1,
            ConstraintKind::Load => self.load_count += 1,
            ConstraintKind::Store => self.store_count += 1,
        }
        self.constraints.push(constraint);
    }

    /// Total number of constraints
    #[inline]
    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    /// Check if empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Iterate over constraints
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter()
    }

    /// Iterate with mutable access (for status transitions)
    #[inline]
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Constraint> {
        self.constraints.iter_mut()
    }

    /// Get constraints by kind
    pub fn by_kind(&self, kind: ConstraintKind) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter().filter(move |c| c.kind == kind)
    }

    /// Count constraints currently holding the given status
    pub fn count_with_status(&self, status: ConstraintStatus) -> usize {
        self.constraints.iter().filter(|c| c.status == status).count()
    }
}
