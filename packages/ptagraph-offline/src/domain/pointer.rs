//! Pointer Variable Registry
//!
//! Dense-id universe for the preprocessing passes:
//! - Every pointer variable gets a `PointerId` (index into a flat table)
//! - Client-facing `VarHandle`s map to ids through a hash index and can be
//!   retired between rounds without renumbering the table
//! - Object fields (o.f) are pointers too, registered once per (obj, field)
//!   pair and found back through `instance_field`
//! - A union-find forest carries cross-round pointer equivalences created
//!   by local-variable merging; queries route through `representative`
//!
//! Liveness flags and topological priorities live on the entries themselves
//! and are reset wholesale at round boundaries.

use crate::error::{PrepError, Result};
use crate::infrastructure::union_find::UnionFind;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Pointer variable identifier (dense index into the table)
pub type PointerId = u32;

/// Abstract heap object identifier
pub type ObjId = u32;

/// Routine (function/method) identifier
pub type RoutineId = u32;

/// Static type identifier
pub type TypeId = u32;

/// Field descriptor identifier
pub type FieldId = u32;

/// Client-facing variable handle, stable across rounds
pub type VarHandle = u32;

/// What program entity a pointer variable stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointerKind {
    /// Local variable of a routine
    Local { routine: RoutineId },

    /// Global (static) variable
    Global { in_library: bool },

    /// Instance field o.f of an abstract object
    ObjectField { object: ObjId, field: FieldId },
}

impl PointerKind {
    /// Check if this is a local of the given routine
    #[inline]
    pub fn is_local_of(&self, r: RoutineId) -> bool {
        matches!(self, PointerKind::Local { routine } if *routine == r)
    }
}

/// A registered pointer variable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointerVar {
    /// Client handle, `None` once retired or for object fields
    pub handle: Option<VarHandle>,

    /// Entity kind
    pub kind: PointerKind,

    /// Declared static type
    pub ty: TypeId,

    /// Reached by the backward dependence sweep this round
    pub live: bool,

    /// Topological processing priority, assigned by the weighting phase
    pub priority: Option<u32>,
}

/// Registry of all pointer variables known to the preprocessor
///
/// Ids are handed out densely in registration order and never reused.
/// Retiring a handle only severs the handle mapping; the entry stays so
/// previously built constraints keep valid operands.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct PointerTable {
    vars: Vec<PointerVar>,

    /// handle → id
    handle_index: FxHashMap<VarHandle, PointerId>,

    /// (object, field) → id
    field_index: FxHashMap<(ObjId, FieldId), PointerId>,

    /// Cross-round pointer equivalences from local-variable merging
    forest: UnionFind,
}

impl PointerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered pointer variables
    #[inline]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Register a routine-local variable
    pub fn register_local(
        &mut self,
        handle: VarHandle,
        routine: RoutineId,
        ty: TypeId,
    ) -> Result<PointerId> {
        self.register_handle(handle, PointerKind::Local { routine }, ty)
    }

    /// Register a global (static) variable
    pub fn register_global(
        &mut self,
        handle: VarHandle,
        in_library: bool,
        ty: TypeId,
    ) -> Result<PointerId> {
        self.register_handle(handle, PointerKind::Global { in_library }, ty)
    }

    fn register_handle(
        &mut self,
        handle: VarHandle,
        kind: PointerKind,
        ty: TypeId,
    ) -> Result<PointerId> {
        if self.handle_index.contains_key(&handle) {
            return Err(PrepError::registration(format!(
                "handle {} is already registered",
                handle
            )));
        }
        let id = self.push_var(Some(handle), kind, ty);
        self.handle_index.insert(handle, id);
        Ok(id)
    }

    /// Register the field pointer o.f; each (object, field) pair is unique
    pub fn register_object_field(
        &mut self,
        object: ObjId,
        field: FieldId,
        ty: TypeId,
    ) -> Result<PointerId> {
        if self.field_index.contains_key(&(object, field)) {
            return Err(PrepError::registration(format!(
                "field pointer ({}, {}) is already registered",
                object, field
            )));
        }
        let id = self.push_var(None, PointerKind::ObjectField { object, field }, ty);
        self.field_index.insert((object, field), id);
        Ok(id)
    }

    fn push_var(&mut self, handle: Option<VarHandle>, kind: PointerKind, ty: TypeId) -> PointerId {
        let id = self.vars.len() as PointerId;
        self.vars.push(PointerVar {
            handle,
            kind,
            ty,
            live: false,
            priority: None,
        });
        self.forest.push();
        id
    }

    /// Sever a handle mapping; the underlying entry stays valid
    pub fn retire_handle(&mut self, handle: VarHandle) {
        if let Some(id) = self.handle_index.remove(&handle) {
            self.vars[id as usize].handle = None;
        }
    }

    /// Look up the pointer behind a handle; `None` once retired or unknown
    #[inline]
    pub fn resolve(&self, handle: VarHandle) -> Option<PointerId> {
        self.handle_index.get(&handle).copied()
    }

    /// Look up the field pointer o.f, if registered
    #[inline]
    pub fn instance_field(&self, object: ObjId, field: FieldId) -> Option<PointerId> {
        self.field_index.get(&(object, field)).copied()
    }

    /// Equivalence-class representative of a pointer
    #[inline]
    pub fn representative(&mut self, p: PointerId) -> PointerId {
        self.forest.find(p)
    }

    /// Merge two pointers into one equivalence class; returns the survivor
    pub fn merge(&mut self, a: PointerId, b: PointerId) -> PointerId {
        self.forest.union(a, b)
    }

    /// Entity kind of a pointer
    #[inline]
    pub fn kind(&self, p: PointerId) -> PointerKind {
        self.vars[p as usize].kind
    }

    /// Declared static type of a pointer
    #[inline]
    pub fn static_type(&self, p: PointerId) -> TypeId {
        self.vars[p as usize].ty
    }

    #[inline]
    pub fn is_live(&self, p: PointerId) -> bool {
        self.vars[p as usize].live
    }

    #[inline]
    pub fn mark_live(&mut self, p: PointerId) {
        self.vars[p as usize].live = true;
    }

    /// Reset every liveness flag (round boundary)
    pub fn clear_liveness(&mut self) {
        for v in &mut self.vars {
            v.live = false;
        }
    }

    #[inline]
    pub fn priority(&self, p: PointerId) -> Option<u32> {
        self.vars[p as usize].priority
    }

    #[inline]
    pub fn set_priority(&mut self, p: PointerId, priority: u32) {
        self.vars[p as usize].priority = Some(priority);
    }

    /// Reset every priority (round boundary)
    pub fn clear_priorities(&mut self) {
        for v in &mut self.vars {
            v.priority = None;
        }
    }

    /// Direct access to an entry
    #[inline]
    pub fn get(&self, p: PointerId) -> &PointerVar {
        &self.vars[p as usize]
    }

    /// Iterate over (id, entry) pairs in registration order
    pub fn iter(&self) -> impl Iterator<Item = (PointerId, &PointerVar)> {
        self.vars.iter().enumerate().map(|(i, v)| (i as PointerId, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_resolve() {
        let mut table = PointerTable::new();
        let p = table.register_local(100, 0, 7).unwrap();
        let q = table.register_global(101, false, 7).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.resolve(100), Some(p));
        assert_eq!(table.resolve(101), Some(q));
        assert_eq!(table.resolve(999), None);
        assert_eq!(table.kind(p), PointerKind::Local { routine: 0 });
        assert_eq!(table.static_type(q), 7);
    }

    #[test]
    fn test_duplicate_handle_rejected() {
        let mut table = PointerTable::new();
        table.register_local(5, 0, 0).unwrap();
        let err = table.register_global(5, true, 0).unwrap_err();
        assert!(err.to_string().contains("already registered"));
    }

    #[test]
    fn test_object_field_registration() {
        let mut table = PointerTable::new();
        let fa = table.register_object_field(3, 9, 2).unwrap();
        assert_eq!(table.instance_field(3, 9), Some(fa));
        assert_eq!(table.instance_field(3, 8), None);
        assert_eq!(table.kind(fa), PointerKind::ObjectField { object: 3, field: 9 });
        assert!(table.register_object_field(3, 9, 2).is_err());
    }

    #[test]
    fn test_retire_handle() {
        let mut table = PointerTable::new();
        let p = table.register_local(42, 1, 0).unwrap();
        table.retire_handle(42);

        assert_eq!(table.resolve(42), None);
        // Entry survives so existing constraints stay well formed
        assert_eq!(table.kind(p), PointerKind::Local { routine: 1 });
        assert_eq!(table.get(p).handle, None);
    }

    #[test]
    fn test_merge_routes_queries() {
        let mut table = PointerTable::new();
        let a = table.register_local(1, 0, 0).unwrap();
        let b = table.register_local(2, 0, 0).unwrap();
        let c = table.register_local(3, 0, 0).unwrap();

        let root = table.merge(a, b);
        assert!(root == a || root == b);
        assert_eq!(table.representative(a), table.representative(b));
        assert_ne!(table.representative(a), table.representative(c));

        // Handles still resolve to their original ids
        assert_eq!(table.resolve(1), Some(a));
        assert_eq!(table.resolve(2), Some(b));
    }

    #[test]
    fn test_liveness_round_reset() {
        let mut table = PointerTable::new();
        let p = table.register_local(1, 0, 0).unwrap();
        let q = table.register_local(2, 0, 0).unwrap();

        table.mark_live(p);
        assert!(table.is_live(p));
        assert!(!table.is_live(q));

        table.clear_liveness();
        assert!(!table.is_live(p));
    }

    #[test]
    fn test_priorities() {
        let mut table = PointerTable::new();
        let p = table.register_local(1, 0, 0).unwrap();

        assert_eq!(table.priority(p), None);
        table.set_priority(p, 17);
        assert_eq!(table.priority(p), Some(17));
        table.clear_priorities();
        assert_eq!(table.priority(p), None);
    }
}
