//! Dependency Registry
//!
//! Maps a tracked target's identity to its properties, and each property to
//! the ordered set of effects that read it.
//!
//! # Lifetime
//!
//! Targets are keyed by the address of their shared allocation, and each
//! entry keeps only a `Weak` to the target. The registry therefore never
//! keeps a target alive. Holding the `Weak` also pins the allocation, so an
//! address cannot be handed to a new target while an entry still names it.
//!
//! Entries whose target has died are evicted by [`Registry::sweep`], which
//! runs automatically every `sweep_interval` new entries and can be forced
//! through [`Runtime::collect_garbage`](super::Runtime::collect_garbage).

use std::any::Any;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use indexmap::{IndexMap, IndexSet};
use smallvec::SmallVec;

use super::subscriber::Effect;

/// Identity of a tracked target: the address of its allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct TargetKey(usize);

impl TargetKey {
    pub(crate) fn of<T>(target: &Rc<T>) -> Self {
        Self(Rc::as_ptr(target) as *const () as usize)
    }
}

/// Snapshot of a dependency set taken before notifying it.
pub(crate) type Subscribers = SmallVec<[Effect; 4]>;

struct TargetEntry {
    target: Weak<dyn Any>,
    properties: IndexMap<String, IndexSet<Effect>>,
}

impl TargetEntry {
    fn is_alive(&self) -> bool {
        self.target.strong_count() > 0
    }
}

pub(crate) struct Registry {
    targets: HashMap<TargetKey, TargetEntry>,
    inserted_since_sweep: usize,
    sweep_interval: usize,
}

impl Registry {
    /// Create an empty registry. A `sweep_interval` of zero disables
    /// automatic sweeping.
    pub(crate) fn new(sweep_interval: usize) -> Self {
        Self {
            targets: HashMap::new(),
            inserted_since_sweep: 0,
            sweep_interval,
        }
    }

    /// Record that `effect` read `property` of `target`.
    ///
    /// No-op without an effect or if the effect is already recorded.
    pub(crate) fn record<T: Any>(&mut self, target: &Rc<T>, property: &str, effect: Option<&Effect>) {
        let Some(effect) = effect else {
            return;
        };

        let key = TargetKey::of(target);
        if !self.targets.contains_key(&key) {
            self.maybe_sweep();
            let weak: Weak<T> = Rc::downgrade(target);
            let weak: Weak<dyn Any> = weak;
            self.targets.insert(
                key,
                TargetEntry {
                    target: weak,
                    properties: IndexMap::new(),
                },
            );
            self.inserted_since_sweep += 1;
            tracing::trace!(target_key = key.0, "tracking new target");
        }

        if let Some(entry) = self.targets.get_mut(&key) {
            let inserted = entry
                .properties
                .entry(property.to_owned())
                .or_default()
                .insert(effect.clone());
            if inserted {
                tracing::trace!(property, effect = effect.id().raw(), "recorded dependency");
            }
        }
    }

    /// Copy out the effects recorded for `(target, property)`, in
    /// first-insertion order.
    pub(crate) fn subscribers(&self, key: TargetKey, property: &str) -> Subscribers {
        self.targets
            .get(&key)
            .filter(|entry| entry.is_alive())
            .and_then(|entry| entry.properties.get(property))
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of effects recorded for `(target, property)`.
    pub(crate) fn subscriber_count(&self, key: TargetKey, property: &str) -> usize {
        self.targets
            .get(&key)
            .and_then(|entry| entry.properties.get(property))
            .map_or(0, IndexSet::len)
    }

    /// Number of target entries, dead or alive.
    pub(crate) fn target_count(&self) -> usize {
        self.targets.len()
    }

    /// Evict entries whose target has been dropped. Returns how many were
    /// removed.
    pub(crate) fn sweep(&mut self) -> usize {
        let before = self.targets.len();
        self.targets.retain(|_, entry| entry.is_alive());
        self.inserted_since_sweep = 0;

        let evicted = before - self.targets.len();
        if evicted > 0 {
            tracing::debug!(evicted, remaining = self.targets.len(), "swept dead targets");
        }
        evicted
    }

    fn maybe_sweep(&mut self) {
        if self.sweep_interval > 0 && self.inserted_since_sweep >= self.sweep_interval {
            self.sweep();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_without_effect_is_noop() {
        let mut registry = Registry::new(0);
        let target = Rc::new(());

        registry.record(&target, "a", None);

        assert_eq!(registry.target_count(), 0);
        assert!(registry.subscribers(TargetKey::of(&target), "a").is_empty());
    }

    #[test]
    fn record_deduplicates_and_keeps_order() {
        let mut registry = Registry::new(0);
        let target = Rc::new(());
        let first = Effect::new(|| {});
        let second = Effect::new(|| {});

        registry.record(&target, "a", Some(&first));
        registry.record(&target, "a", Some(&second));
        registry.record(&target, "a", Some(&first));

        let subs = registry.subscribers(TargetKey::of(&target), "a");
        assert_eq!(subs.as_slice(), &[first, second]);
    }

    #[test]
    fn properties_are_independent() {
        let mut registry = Registry::new(0);
        let target = Rc::new(());
        let effect = Effect::new(|| {});

        registry.record(&target, "a", Some(&effect));

        let key = TargetKey::of(&target);
        assert_eq!(registry.subscriber_count(key, "a"), 1);
        assert_eq!(registry.subscriber_count(key, "b"), 0);
    }

    #[test]
    fn sweep_evicts_dead_targets() {
        let mut registry = Registry::new(0);
        let kept = Rc::new(1);
        let dropped = Rc::new(2);
        let effect = Effect::new(|| {});

        registry.record(&kept, "a", Some(&effect));
        registry.record(&dropped, "a", Some(&effect));
        assert_eq!(registry.target_count(), 2);

        drop(dropped);
        assert_eq!(registry.sweep(), 1);
        assert_eq!(registry.target_count(), 1);
        assert_eq!(registry.subscriber_count(TargetKey::of(&kept), "a"), 1);
    }

    #[test]
    fn automatic_sweep_runs_on_interval() {
        let mut registry = Registry::new(2);
        let effect = Effect::new(|| {});

        for _ in 0..2 {
            let temp = Rc::new(0u8);
            registry.record(&temp, "a", Some(&effect));
        }
        assert_eq!(registry.target_count(), 2);

        // Third insertion crosses the interval and sweeps first.
        let live = Rc::new(0u8);
        registry.record(&live, "a", Some(&effect));
        assert_eq!(registry.target_count(), 1);
    }

    #[test]
    fn entry_does_not_keep_target_alive() {
        let mut registry = Registry::new(0);
        let target = Rc::new(String::from("record"));
        let effect = Effect::new(|| {});

        registry.record(&target, "a", Some(&effect));
        assert_eq!(Rc::strong_count(&target), 1);
        assert_eq!(Rc::weak_count(&target), 1);
    }
}
