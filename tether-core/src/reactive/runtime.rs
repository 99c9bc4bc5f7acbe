//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects tracked objects,
//! reference cells, and effects. It owns the dependency registry and the
//! active-subscriber context.
//!
//! # How It Works
//!
//! 1. `run_effect` installs an effect as the active subscriber and runs it.
//!
//! 2. While it runs, every tracked read records the effect against the
//!    (target, property) pair that was read.
//!
//! 3. When a tracked property is written, the runtime snapshots the
//!    effects recorded for that pair and re-runs each of them, in the order
//!    they first registered, before the write returns. Re-runs are
//!    untracked: dependencies come only from `run_effect` and `run`.
//!
//! # Ownership
//!
//! Runtimes are explicit values so tests and independent subsystems can
//! have isolated registries. A thread-local default runtime backs the
//! crate-level free functions. Tracked values and cells hold their runtime
//! weakly: effects stored in the registry capture those values, and a
//! strong back-reference would form a cycle that keeps the runtime alive
//! forever. Once a runtime is dropped, values created from it keep working
//! as plain storage with no tracking.
//!
//! # Thread Safety
//!
//! None of these types are `Send`; each thread gets its own default runtime.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use super::cell::Ref;
use super::context::ActiveContext;
use super::registry::{Registry, TargetKey};
use super::subscriber::Effect;
use super::tracked::{TrackOptions, Tracked};
use crate::value::{Object, Value};

/// Runtime configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Sweep dead targets out of the registry after this many new target
    /// entries. Zero disables automatic sweeping.
    pub sweep_interval: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { sweep_interval: 64 }
    }
}

pub(crate) struct RuntimeInner {
    registry: RefCell<Registry>,
    context: ActiveContext,
}

impl RuntimeInner {
    /// Record a read of `property` on `target` by the active effect, if any.
    pub(crate) fn track<T: Any>(&self, target: &Rc<T>, property: &str) {
        let Some(effect) = self.context.current() else {
            return;
        };
        self.registry
            .borrow_mut()
            .record(target, property, Some(&effect));
    }

    /// Re-run every effect that read `property` on `target`.
    ///
    /// Re-runs execute with the context suspended, so they record no new
    /// dependencies. The dependency set is snapshotted before the first
    /// effect runs; effects started by `run_effect` during the notification
    /// join the next one, not this one. If an effect panics the remaining
    /// effects of this batch are skipped.
    pub(crate) fn trigger<T>(&self, target: &Rc<T>, property: &str) {
        let subscribers = self
            .registry
            .borrow()
            .subscribers(TargetKey::of(target), property);
        if subscribers.is_empty() {
            return;
        }

        tracing::trace!(property, subscribers = subscribers.len(), "notifying subscribers");
        let _suspended = self.context.suspend();
        for effect in &subscribers {
            effect.invoke();
        }
    }

    pub(crate) fn subscriber_count(&self, key: TargetKey, property: &str) -> usize {
        self.registry.borrow().subscriber_count(key, property)
    }

    fn execute(&self, effect: &Effect) {
        let _guard = self.context.enter(effect.clone());
        effect.invoke();
    }
}

/// Handle to a reactive runtime.
///
/// Clones share the same registry and context.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

thread_local! {
    static DEFAULT_RUNTIME: Runtime = Runtime::new();
}

impl Runtime {
    /// Create a runtime with the default configuration.
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            inner: Rc::new(RuntimeInner {
                registry: RefCell::new(Registry::new(config.sweep_interval)),
                context: ActiveContext::new(),
            }),
        }
    }

    /// The calling thread's default runtime.
    pub fn current() -> Self {
        DEFAULT_RUNTIME.with(Runtime::clone)
    }

    /// Register `callback` as an effect and run it once, synchronously.
    ///
    /// Every tracked property read during the run subscribes the effect to
    /// that property. Returns the effect's handle.
    pub fn run_effect<F>(&self, callback: F) -> Effect
    where
        F: Fn() + 'static,
    {
        let effect = Effect::new(callback);
        tracing::debug!(effect = effect.id().raw(), "running new effect");
        self.run(&effect);
        effect
    }

    /// Run an existing effect under tracking.
    ///
    /// The handle keeps its identity, so properties it already depends on
    /// are not registered twice.
    pub fn run(&self, effect: &Effect) {
        self.inner.execute(effect);
    }

    /// Wrap `object` for deep tracking.
    pub fn reactive(&self, object: Object) -> Tracked {
        self.reactive_with(object, TrackOptions::default())
    }

    /// Wrap `object` with explicit options.
    pub fn reactive_with(&self, object: Object, options: TrackOptions) -> Tracked {
        Tracked::new(object, self.downgrade(), options.shallow)
    }

    /// Create a reference cell holding `raw`.
    pub fn make_ref(&self, raw: impl Into<Value>) -> Ref {
        Ref::new(raw.into(), self.downgrade())
    }

    /// Check if an effect is currently running.
    pub fn is_tracking(&self) -> bool {
        self.inner.context.is_active()
    }

    /// The effect currently running, if any.
    pub fn current_effect(&self) -> Option<Effect> {
        self.inner.context.current()
    }

    /// Number of targets with registry entries, including dead ones that
    /// have not been swept yet.
    pub fn target_count(&self) -> usize {
        self.inner.registry.borrow().target_count()
    }

    /// Number of effects subscribed to `property` of `tracked`.
    pub fn subscriber_count_for(&self, tracked: &Tracked, property: &str) -> usize {
        self.inner
            .subscriber_count(TargetKey::of(tracked.target().data()), property)
    }

    /// Evict registry entries whose targets have been dropped.
    pub fn collect_garbage(&self) -> usize {
        self.inner.registry.borrow_mut().sweep()
    }

    pub(crate) fn downgrade(&self) -> Weak<RuntimeInner> {
        Rc::downgrade(&self.inner)
    }

    #[cfg(test)]
    pub(crate) fn inner(&self) -> &RuntimeInner {
        &self.inner
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("targets", &self.target_count())
            .field("tracking", &self.is_tracking())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    #[test]
    fn run_effect_runs_immediately_and_clears_context() {
        let rt = Runtime::new();
        let seen_active = Rc::new(Cell::new(false));

        let effect = rt.run_effect({
            let rt = rt.clone();
            let seen_active = seen_active.clone();
            move || seen_active.set(rt.is_tracking())
        });

        assert!(seen_active.get());
        assert_eq!(effect.run_count(), 1);
        assert!(!rt.is_tracking());
    }

    #[test]
    fn trigger_runs_subscribers_in_registration_order() {
        let rt = Runtime::new();
        let target = Rc::new(());
        let order = Rc::new(RefCell::new(Vec::new()));

        for name in ["first", "second", "third"] {
            let order = order.clone();
            let rt2 = rt.clone();
            let target = target.clone();
            rt.run_effect(move || {
                rt2.inner().track(&target, "p");
                order.borrow_mut().push(name);
            });
        }
        order.borrow_mut().clear();

        rt.inner().trigger(&target, "p");
        assert_eq!(*order.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn trigger_snapshot_skips_effects_added_mid_notification() {
        let rt = Runtime::new();
        let target = Rc::new(());
        let late_runs = Rc::new(Cell::new(0));
        let spawned = Rc::new(Cell::new(false));
        let outer_runs = Rc::new(Cell::new(0));

        rt.run_effect({
            let rt = rt.clone();
            let target = target.clone();
            let late_runs = late_runs.clone();
            let spawned = spawned.clone();
            move || {
                rt.inner().track(&target, "p");
                outer_runs.set(outer_runs.get() + 1);
                if outer_runs.get() > 1 && !spawned.get() {
                    spawned.set(true);
                    let inner_rt = rt.clone();
                    let target = target.clone();
                    let late_runs = late_runs.clone();
                    rt.run_effect(move || {
                        inner_rt.inner().track(&target, "p");
                        late_runs.set(late_runs.get() + 1);
                    });
                }
            }
        });

        rt.inner().trigger(&target, "p");
        // Ran once on creation inside the notification, not again from the
        // snapshot.
        assert_eq!(late_runs.get(), 1);

        rt.inner().trigger(&target, "p");
        assert_eq!(late_runs.get(), 2);
    }

    #[test]
    fn trigger_reruns_without_tracking() {
        let rt = Runtime::new();
        let target = Rc::new(());
        let armed = Rc::new(Cell::new(false));
        let active_on_rerun = Rc::new(Cell::new(true));

        rt.run_effect({
            let rt = rt.clone();
            let target = target.clone();
            let armed = armed.clone();
            let active_on_rerun = active_on_rerun.clone();
            move || {
                rt.inner().track(&target, "p");
                if armed.get() {
                    active_on_rerun.set(rt.is_tracking());
                    rt.inner().track(&target, "q");
                }
            }
        });

        armed.set(true);
        rt.inner().trigger(&target, "p");

        assert!(!active_on_rerun.get());
        let key = TargetKey::of(&target);
        assert_eq!(rt.inner().subscriber_count(key, "p"), 1);
        assert_eq!(rt.inner().subscriber_count(key, "q"), 0);
    }

    #[test]
    fn panicking_effect_aborts_batch_and_resets_context() {
        let rt = Runtime::new();
        let target = Rc::new(());
        let armed = Rc::new(Cell::new(false));
        let after = Rc::new(Cell::new(0));

        rt.run_effect({
            let rt = rt.clone();
            let target = target.clone();
            let armed = armed.clone();
            move || {
                rt.inner().track(&target, "p");
                if armed.get() {
                    panic!("subscriber failed");
                }
            }
        });
        rt.run_effect({
            let rt = rt.clone();
            let target = target.clone();
            let after = after.clone();
            move || {
                rt.inner().track(&target, "p");
                after.set(after.get() + 1);
            }
        });

        armed.set(true);
        let result = catch_unwind(AssertUnwindSafe(|| rt.inner().trigger(&target, "p")));

        assert!(result.is_err());
        assert!(!rt.is_tracking());
        assert_eq!(after.get(), 1);
    }

    #[test]
    fn runtimes_are_isolated() {
        let a = Runtime::new();
        let b = Runtime::new();
        let target = Rc::new(());

        a.run_effect({
            let a = a.clone();
            let target = target.clone();
            move || a.inner().track(&target, "p")
        });

        assert_eq!(a.target_count(), 1);
        assert_eq!(b.target_count(), 0);
    }

    #[test]
    fn current_runtime_is_shared_per_thread() {
        let first = Runtime::current();
        let second = Runtime::current();
        assert!(Rc::ptr_eq(&first.inner, &second.inner));
    }
}
