//! Addressable value cells and the references that point at them.
//!
//! # Ownership
//!
//! Every value that a name or a container member can refer to lives in a
//! [`Slot`]. A slot has exactly one owner: the frame or composite that holds
//! it. `Slot` is deliberately not `Clone`; the only way to get a second copy
//! of its content is [`Value::deep_copy`].
//!
//! Aliases hold a [`SlotRef`], which owns nothing. When the owner drops the
//! slot every `SlotRef` to it goes dead and resolving it reports
//! `DanglingReference` instead of reading freed memory.
//!
//! [`SlotHandle`] is a short strong lease on a cell. It is produced while
//! resolving an alias so a read or write can finish even if the owner is
//! concurrently replaced, and it is how the global frame is shared between
//! worker environments.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::errors::{alias_cycle, dangling_reference};
use crate::{EvalError, Value, ValueKind};

/// Maximum number of alias hops followed before reporting a cycle.
pub const MAX_ALIAS_HOPS: usize = 256;

type Cell = RwLock<Value>;

/// The single owner of a value cell.
pub struct Slot(Arc<Cell>);

impl Slot {
    /// Allocate a new cell owning `value`.
    #[inline]
    pub fn new(value: Value) -> Self {
        Slot(Arc::new(RwLock::new(value)))
    }

    /// Shared read access. Re-entrant on the same thread.
    #[inline]
    pub fn read(&self) -> RwLockReadGuard<'_, Value> {
        self.0.read_recursive()
    }

    /// Exclusive write access.
    #[inline]
    pub fn write(&self) -> RwLockWriteGuard<'_, Value> {
        self.0.write()
    }

    /// A non-owning reference to this cell.
    #[inline]
    pub fn downgrade(&self) -> SlotRef {
        SlotRef(Arc::downgrade(&self.0))
    }

    /// A temporary strong lease on this cell.
    #[inline]
    pub fn handle(&self) -> SlotHandle {
        SlotHandle(Arc::clone(&self.0))
    }

    /// Give up unique ownership in exchange for a shareable handle.
    ///
    /// Used for the global frame, the one cell that several environments
    /// keep alive together.
    #[inline]
    pub fn into_shared(self) -> SlotHandle {
        SlotHandle(self.0)
    }

    /// Whether `other` points at this cell.
    #[inline]
    pub fn is(&self, other: &SlotRef) -> bool {
        std::ptr::eq(Arc::as_ptr(&self.0), other.0.as_ptr())
    }

    /// Take the content out of the cell.
    ///
    /// If a lease is still outstanding the content is deep-copied instead.
    pub fn into_value(self) -> Value {
        match Arc::try_unwrap(self.0) {
            Ok(cell) => cell.into_inner(),
            Err(shared) => shared.read_recursive().deep_copy(),
        }
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Slot").field(&*self.read()).finish()
    }
}

/// A non-owning reference to a slot.
#[derive(Clone)]
pub struct SlotRef(Weak<Cell>);

impl SlotRef {
    /// Lease the referenced cell, if its owner is still alive.
    #[inline]
    pub fn upgrade(&self) -> Option<SlotHandle> {
        self.0.upgrade().map(SlotHandle)
    }

    /// Whether the owner of the referenced cell is still alive.
    #[inline]
    pub fn is_live(&self) -> bool {
        self.0.strong_count() > 0
    }

    /// Whether both references point at the same cell.
    #[inline]
    pub fn ptr_eq(&self, other: &SlotRef) -> bool {
        Weak::ptr_eq(&self.0, &other.0)
    }

    /// Follow the alias chain starting at this reference to its terminal,
    /// non-alias cell.
    pub fn resolve(&self) -> Result<SlotHandle, EvalError> {
        let mut current = self.upgrade().ok_or_else(dangling_reference)?;
        for _ in 0..MAX_ALIAS_HOPS {
            let next = {
                let guard = current.read();
                match &guard.kind {
                    ValueKind::Alias(target) => Some(target.clone()),
                    _ => None,
                }
            };
            match next {
                Some(target) => current = target.upgrade().ok_or_else(dangling_reference)?,
                None => return Ok(current),
            }
        }
        Err(alias_cycle())
    }
}

impl fmt::Debug for SlotRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_live() {
            write!(f, "SlotRef({:p})", self.0.as_ptr())
        } else {
            f.write_str("SlotRef(<dangling>)")
        }
    }
}

/// A strong lease on a slot's cell.
#[derive(Clone)]
pub struct SlotHandle(Arc<Cell>);

impl SlotHandle {
    /// Shared read access. Re-entrant on the same thread.
    #[inline]
    pub fn read(&self) -> RwLockReadGuard<'_, Value> {
        self.0.read_recursive()
    }

    /// Exclusive write access.
    #[inline]
    pub fn write(&self) -> RwLockWriteGuard<'_, Value> {
        self.0.write()
    }

    /// A non-owning reference to the leased cell.
    #[inline]
    pub fn downgrade(&self) -> SlotRef {
        SlotRef(Arc::downgrade(&self.0))
    }

    /// Whether both handles lease the same cell.
    #[inline]
    pub fn ptr_eq(&self, other: &SlotHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Whether `other` points at the leased cell.
    #[inline]
    pub fn is(&self, other: &SlotRef) -> bool {
        std::ptr::eq(Arc::as_ptr(&self.0), other.0.as_ptr())
    }
}

impl fmt::Debug for SlotHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SlotHandle({:p})", Arc::as_ptr(&self.0))
    }
}
