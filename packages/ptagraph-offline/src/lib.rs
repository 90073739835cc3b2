/*
 * ptagraph-offline - Constraint-Graph Preprocessor for Points-to Analysis
 *
 * Feature-First Hexagonal Architecture:
 * - domain/         : Pointer registry and inclusion constraints
 * - application/    : Round driver and seed election policies
 * - infrastructure/ : Union-find, round graphs, SCC condensation
 * - ports/          : Program facts injected by the embedding solver
 *
 * Pipeline per round:
 * - seed election → backward dependence sweep → constraint distillation
 * - impact graph → SCC condensation → topological worklist priorities
 * - single-definition local-variable merging
 */

// Crate-level lint configuration
#![allow(clippy::needless_range_loop)] // Range loop for indexing
#![allow(clippy::collapsible_if)] // Readability over brevity
#![allow(clippy::new_without_default)] // Default impl not always needed

// ═══════════════════════════════════════════════════════════════════════════
// Module Exports
// ═══════════════════════════════════════════════════════════════════════════

/// Domain models (pointer registry, constraints)
pub mod domain;

/// Use cases (round driver, seed policies)
pub mod application;

/// Algorithmic substrate (union-find, dense graphs, condensation)
pub mod infrastructure;

/// Interfaces to the embedding solver
pub mod ports;

/// Error types
pub mod error;

// ═══════════════════════════════════════════════════════════════════════════
// Re-exports for Public API
// ═══════════════════════════════════════════════════════════════════════════

pub use application::{OfflinePreprocessor, PrepStats, SeedPolicy};
pub use domain::{
    Constraint, ConstraintKind, ConstraintSet, ConstraintStatus, FieldId, ObjId, PointerId,
    PointerKind, PointerTable, PointerVar, RoutineId, TypeId, VarHandle,
};
pub use error::{PrepError, Result};
pub use infrastructure::{CondenseStats, PointerGraph, SccCondenser, UnionFind};
pub use ports::{
    CallEdge, CastChecker, CastSite, PointsToMode, PointsToSource, PrepSession, ProgramView,
};
