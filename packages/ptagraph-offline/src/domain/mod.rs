//! Domain models for constraint-graph preprocessing
//!
//! Core abstractions independent of the pass pipeline:
//! - PointerTable: dense pointer universe with handle/field lookup and
//!   cross-round equivalence classes
//! - Constraint: the four inclusion constraints (ALLOC, ASSIGN, LOAD, STORE)
//!   plus their per-round processing status

pub mod constraint;
pub mod pointer;

pub use constraint::{Constraint, ConstraintKind, ConstraintSet, ConstraintStatus};
pub use pointer::{
    FieldId, ObjId, PointerId, PointerKind, PointerTable, PointerVar, RoutineId, TypeId, VarHandle,
};
