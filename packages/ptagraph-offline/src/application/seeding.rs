//! Seed Selection Policies
//!
//! A round starts by electing the seed pointers whose points-to sets the
//! next solver round has to refine; everything else is a candidate for
//! distillation. The receiver variables of virtual call sites are seeded
//! unconditionally (dispatch resolution always consumes them), and one
//! policy widens the set:
//! - **AllUserCode**: every pointer declared in user code
//! - **AmbiguousVirtualBases**: receivers of calls still resolving to
//!   more than one target
//! - **StaticCasts**: operands of downcasts not yet proven safe
//! - **VirtualBase**: nothing beyond the unconditional receivers
//!
//! Policy bodies seed the resolved pointer itself; externally supplied
//! handles are routed to their equivalence-class representative first,
//! because that is where a merged pointer's set lives.

use std::collections::VecDeque;

use tracing::debug;

use crate::domain::pointer::{PointerId, PointerKind, PointerTable, VarHandle};
use crate::ports::PrepSession;

/// Seed election strategy for one preprocessing round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum SeedPolicy {
    /// Every pointer declared in user code
    AllUserCode,

    /// Receivers of virtual calls with more than one resolved target
    AmbiguousVirtualBases,

    /// Operands of downcasts whose safety is still unproven
    StaticCasts,

    /// Only the unconditional virtual-call receivers
    VirtualBase,
}

impl SeedPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeedPolicy::AllUserCode => "all_user_code",
            SeedPolicy::AmbiguousVirtualBases => "ambiguous_virtual_bases",
            SeedPolicy::StaticCasts => "static_casts",
            SeedPolicy::VirtualBase => "virtual_base",
        }
    }
}

impl Default for SeedPolicy {
    fn default() -> Self {
        SeedPolicy::AllUserCode
    }
}

/// Seed one pointer as-is: mark it live and enqueue it
#[inline]
fn seed_raw(table: &mut PointerTable, worklist: &mut VecDeque<PointerId>, p: PointerId) {
    table.mark_live(p);
    worklist.push_back(p);
}

/// Seed externally named pointers, routed through their representative
///
/// Handles that no longer resolve are skipped silently; a client may keep
/// stale handles for variables deleted between rounds.
pub(crate) fn seed_handles<I>(
    table: &mut PointerTable,
    worklist: &mut VecDeque<PointerId>,
    handles: I,
) -> usize
where
    I: IntoIterator<Item = VarHandle>,
{
    let mut added = 0;
    for handle in handles {
        let Some(p) = table.resolve(handle) else {
            continue;
        };
        let rep = table.representative(p);
        seed_raw(table, worklist, rep);
        added += 1;
    }
    added
}

/// Run one policy body; returns the number of seeds it added
pub(crate) fn run_policy(
    policy: SeedPolicy,
    table: &mut PointerTable,
    worklist: &mut VecDeque<PointerId>,
    session: &PrepSession<'_>,
) -> usize {
    let added = match policy {
        SeedPolicy::AllUserCode => seed_all_user_code(table, worklist, session),
        SeedPolicy::AmbiguousVirtualBases => {
            seed_ambiguous_virtual_bases(table, worklist, session)
        }
        SeedPolicy::StaticCasts => seed_static_casts(table, worklist, session),
        SeedPolicy::VirtualBase => 0,
    };
    debug!("Policy {} elected {} seed pointers", policy.as_str(), added);
    added
}

/// Seed every local of a reachable user routine and every user global
fn seed_all_user_code(
    table: &mut PointerTable,
    worklist: &mut VecDeque<PointerId>,
    session: &PrepSession<'_>,
) -> usize {
    let mut added = 0;
    for p in 0..table.len() as PointerId {
        let user_code = match table.kind(p) {
            PointerKind::Local { routine } => {
                session.program.is_reachable(routine) && !session.program.is_library(routine)
            }
            PointerKind::Global { in_library } => !in_library,
            PointerKind::ObjectField { .. } => false,
        };
        if user_code {
            seed_raw(table, worklist, p);
            added += 1;
        }
    }
    added
}

/// Seed receivers of virtual calls that still dispatch to several targets
fn seed_ambiguous_virtual_bases(
    table: &mut PointerTable,
    worklist: &mut VecDeque<PointerId>,
    session: &PrepSession<'_>,
) -> usize {
    let mut added = 0;
    for routine in session.program.reachable_routines() {
        for edge in session.program.call_edges(routine) {
            let Some(handle) = edge.receiver else {
                continue;
            };
            if edge.resolved_targets <= 1 {
                continue;
            }
            if let Some(p) = table.resolve(handle) {
                seed_raw(table, worklist, p);
                added += 1;
            }
        }
    }
    added
}

/// Seed downcast operands the current points-to sets cannot prove safe
///
/// An operand with an empty set is vacuously safe and stays unseeded.
fn seed_static_casts(
    table: &mut PointerTable,
    worklist: &mut VecDeque<PointerId>,
    session: &PrepSession<'_>,
) -> usize {
    let mut added = 0;
    for routine in session.program.reachable_routines() {
        if session.program.is_library(routine) || !session.program.is_concrete(routine) {
            continue;
        }
        for site in session.program.cast_sites(routine) {
            let Some(p) = table.resolve(site.operand) else {
                continue;
            };
            let rep = table.representative(p);

            let mut safe = true;
            for obj in session.points_to.points_to(rep) {
                safe = session
                    .casts
                    .cast_never_fails(session.program.object_type(obj), site.target_type);
                if !safe {
                    break;
                }
            }

            if !safe {
                seed_raw(table, worklist, p);
                added += 1;
            }
        }
    }
    added
}
