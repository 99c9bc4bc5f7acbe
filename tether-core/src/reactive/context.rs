//! Active-Subscriber Context
//!
//! The context names the effect that is currently running, if any. Tracked
//! reads consult it to decide whom to register as a dependent.
//!
//! # Implementation
//!
//! Each runtime owns a single slot. Entering the context swaps the new
//! effect in and returns a guard; dropping the guard swaps the previous
//! occupant back. At top level that previous occupant is `None`, so the
//! slot is cleared after every effect run, including runs that panic.
//!
//! Because the guard restores rather than clears, a nested run (an effect
//! that starts another effect, or writes a property that re-runs other
//! effects) hands tracking back to the outer effect when it finishes.
//!
//! Effects re-run by a write execute with the slot suspended: only
//! `run_effect` makes a subscriber active.

use std::cell::RefCell;

use super::subscriber::Effect;

/// The slot holding the currently running effect.
#[derive(Default)]
pub(crate) struct ActiveContext {
    slot: RefCell<Option<Effect>>,
}

impl ActiveContext {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Make `effect` the active subscriber until the guard is dropped.
    pub(crate) fn enter(&self, effect: Effect) -> ContextGuard<'_> {
        self.install(Some(effect))
    }

    /// Clear the slot until the guard is dropped. Reads made meanwhile
    /// record nothing.
    pub(crate) fn suspend(&self) -> ContextGuard<'_> {
        self.install(None)
    }

    fn install(&self, effect: Option<Effect>) -> ContextGuard<'_> {
        let previous = self.slot.replace(effect);
        ContextGuard {
            context: self,
            previous,
        }
    }

    /// Check if an effect is currently running.
    pub(crate) fn is_active(&self) -> bool {
        self.slot.borrow().is_some()
    }

    /// The currently running effect, if any.
    pub(crate) fn current(&self) -> Option<Effect> {
        self.slot.borrow().clone()
    }
}

/// Guard that restores the previous subscriber when dropped.
///
/// This keeps the slot consistent even if the effect panics.
pub(crate) struct ContextGuard<'a> {
    context: &'a ActiveContext,
    previous: Option<Effect>,
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        self.context.slot.replace(self.previous.take());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    #[test]
    fn context_tracks_subscriber() {
        let context = ActiveContext::new();
        let effect = Effect::new(|| {});

        assert!(!context.is_active());
        assert!(context.current().is_none());

        {
            let _guard = context.enter(effect.clone());

            assert!(context.is_active());
            assert_eq!(context.current(), Some(effect));
        }

        // Context should be cleaned up after drop
        assert!(!context.is_active());
        assert!(context.current().is_none());
    }

    #[test]
    fn nested_contexts_restore_outer() {
        let context = ActiveContext::new();
        let outer = Effect::new(|| {});
        let inner = Effect::new(|| {});

        {
            let _outer = context.enter(outer.clone());
            assert_eq!(context.current(), Some(outer.clone()));

            {
                let _inner = context.enter(inner.clone());
                assert_eq!(context.current(), Some(inner));
            }

            assert_eq!(context.current(), Some(outer));
        }

        assert!(context.current().is_none());
    }

    #[test]
    fn suspend_clears_then_restores() {
        let context = ActiveContext::new();
        let effect = Effect::new(|| {});

        let _outer = context.enter(effect.clone());
        {
            let _suspended = context.suspend();
            assert!(!context.is_active());
        }
        assert_eq!(context.current(), Some(effect));
    }

    #[test]
    fn context_resets_on_panic() {
        let context = ActiveContext::new();
        let effect = Effect::new(|| {});

        let result = catch_unwind(AssertUnwindSafe(|| {
            let _guard = context.enter(effect);
            panic!("effect failed");
        }));

        assert!(result.is_err());
        assert!(!context.is_active());
    }
}
