//! Reference Cells
//!
//! A [`Ref`] gives a single value, scalar or structured, the same tracking
//! shape as an object property. The cell registers under its own identity
//! with the fixed property name [`REF_VALUE_KEY`].
//!
//! Structured contents are upgraded to a [`Tracked`] view on the way in, so
//! nested reads through the cell are tracked as well.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use super::registry::TargetKey;
use super::runtime::RuntimeInner;
use super::tracked::Tracked;
use crate::value::Value;

/// Property name under which a cell's slot is tracked.
pub const REF_VALUE_KEY: &str = "value";

struct RefSlot {
    value: RefCell<Value>,
}

/// A reactive cell holding one value.
///
/// Cloning yields another handle to the same cell.
#[derive(Clone)]
pub struct Ref {
    slot: Rc<RefSlot>,
    runtime: Weak<RuntimeInner>,
}

impl Ref {
    pub(crate) fn new(raw: Value, runtime: Weak<RuntimeInner>) -> Self {
        let value = upgrade(raw, &runtime);
        Self {
            slot: Rc::new(RefSlot {
                value: RefCell::new(value),
            }),
            runtime,
        }
    }

    /// Read the value, recording the read for the active effect.
    pub fn get(&self) -> Value {
        if let Some(runtime) = self.runtime.upgrade() {
            runtime.track(&self.slot, REF_VALUE_KEY);
        }
        self.get_untracked()
    }

    /// Read the value without tracking.
    pub fn get_untracked(&self) -> Value {
        self.slot.value.borrow().clone()
    }

    /// Replace the value and re-run every effect that read it.
    ///
    /// A raw object is upgraded to a tracked view before it is stored.
    pub fn set(&self, value: impl Into<Value>) {
        let value = upgrade(value.into(), &self.runtime);
        let previous = self.slot.value.replace(value);
        drop(previous);

        if let Some(runtime) = self.runtime.upgrade() {
            runtime.trigger(&self.slot, REF_VALUE_KEY);
        }
    }

    /// Compute the next value from the current one, then [`set`](Self::set)
    /// it. The read is untracked.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&Value) -> Value,
    {
        let next = f(&self.slot.value.borrow());
        self.set(next);
    }

    /// Number of effects that read this cell.
    pub fn subscriber_count(&self) -> usize {
        self.runtime.upgrade().map_or(0, |runtime| {
            runtime.subscriber_count(TargetKey::of(&self.slot), REF_VALUE_KEY)
        })
    }

    /// Whether both handles refer to the same cell.
    pub fn ptr_eq(&self, other: &Ref) -> bool {
        Rc::ptr_eq(&self.slot, &other.slot)
    }
}

fn upgrade(value: Value, runtime: &Weak<RuntimeInner>) -> Value {
    match value {
        Value::Object(raw) => Value::Tracked(Tracked::new(raw, runtime.clone(), false)),
        other => other,
    }
}

impl fmt::Debug for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ref")
            .field("value", &*self.slot.value.borrow())
            .finish()
    }
}
