//! Subscriber types for the reactive system.
//!
//! A subscriber is an effect: a zero-argument callback that re-runs whenever
//! a property it previously read is written.

use std::cell::Cell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a subscriber.
///
/// Each effect gets a unique ID when created. Dependency sets compare
/// handles by this ID, so the same effect is never registered twice for
/// the same property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    ///
    /// IDs come from a process-wide counter, so effects on different
    /// runtimes never share one.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

struct EffectInner {
    id: SubscriberId,
    callback: Box<dyn Fn()>,
    run_count: Cell<usize>,
}

/// Handle to a registered effect.
///
/// Cloning the handle is cheap and yields the same effect: equality and
/// hashing go through the [`SubscriberId`]. Effects are created by
/// [`Runtime::run_effect`](super::Runtime::run_effect) and are never removed
/// from the dependency sets they joined.
#[derive(Clone)]
pub struct Effect {
    inner: Rc<EffectInner>,
}

impl Effect {
    /// Wrap a callback in a new effect handle without running it.
    pub(crate) fn new<F>(callback: F) -> Self
    where
        F: Fn() + 'static,
    {
        Self {
            inner: Rc::new(EffectInner {
                id: SubscriberId::new(),
                callback: Box::new(callback),
                run_count: Cell::new(0),
            }),
        }
    }

    /// Get the effect's unique ID.
    pub fn id(&self) -> SubscriberId {
        self.inner.id
    }

    /// Number of times the callback has been invoked.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.get()
    }

    /// Invoke the callback. Tracking is the caller's job.
    pub(crate) fn invoke(&self) {
        self.inner.run_count.set(self.inner.run_count.get() + 1);
        (self.inner.callback)();
    }
}

impl PartialEq for Effect {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Effect {}

impl Hash for Effect {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.inner.id)
            .field("run_count", &self.run_count())
            .finish()
    }
}
