//! Tracked Objects
//!
//! A [`Tracked`] is a stand-in for an [`Object`] whose property reads and
//! writes are intercepted:
//!
//! - A read records the running effect as a dependent of that property.
//! - A successful write re-runs every dependent of that property before
//!   returning, even when the new value equals the old one.
//!
//! # Lazy Deep Tracking
//!
//! Nested objects are not wrapped up front. The first read of a property
//! holding a raw object replaces it, in place, with a tracked view of the
//! same record. Later reads find the tracked view already stored and return
//! it as is. The upgrade happens whether or not an effect is running, so a
//! nested value handed out before any effect exists is already tracked.
//!
//! In shallow mode nested objects are returned raw, and accesses through
//! them are invisible to the registry.

use std::fmt;
use std::rc::Weak;

use super::runtime::RuntimeInner;
use crate::error::Result;
use crate::value::{Object, Value};

/// Options for [`Runtime::reactive_with`](super::Runtime::reactive_with).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackOptions {
    /// Do not wrap nested objects.
    pub shallow: bool,
}

impl TrackOptions {
    pub fn shallow() -> Self {
        Self { shallow: true }
    }
}

/// A tracked view of an [`Object`].
///
/// Cloning yields another handle to the same view. Two tracked values are
/// equal when they wrap the same record.
#[derive(Clone)]
pub struct Tracked {
    target: Object,
    runtime: Weak<RuntimeInner>,
    shallow: bool,
}

impl Tracked {
    pub(crate) fn new(target: Object, runtime: Weak<RuntimeInner>, shallow: bool) -> Self {
        Self {
            target,
            runtime,
            shallow,
        }
    }

    /// Read a property, upgrading a nested object to a tracked view and
    /// recording the read for the active effect.
    ///
    /// Missing properties read as [`Value::Null`] and are still tracked, so
    /// an effect re-runs once the property is assigned.
    pub fn get(&self, property: &str) -> Value {
        let mut value = self.target.get(property);

        let nested = match &value {
            Value::Object(raw) if !self.shallow => Some(raw.clone()),
            _ => None,
        };
        if let Some(raw) = nested {
            value = Value::Tracked(Tracked::new(raw, self.runtime.clone(), false));
            if !self.target.upgrade_in_place(property, value.clone()) {
                tracing::trace!(property, "frozen target, nested view not stored");
            } else {
                tracing::trace!(property, "upgraded nested object");
            }
        }

        if let Some(runtime) = self.runtime.upgrade() {
            runtime.track(self.target.data(), property);
        }
        value
    }

    /// Assign a property and re-run its dependents.
    ///
    /// Fails with [`TrackError::ReadOnly`](crate::TrackError::ReadOnly) on a
    /// frozen target, in which case nothing is notified.
    pub fn set(&self, property: &str, value: impl Into<Value>) -> Result<()> {
        if let Err(err) = self.target.insert(property, value) {
            tracing::warn!(property, "rejected write to frozen object");
            return Err(err);
        }

        if let Some(runtime) = self.runtime.upgrade() {
            runtime.trigger(self.target.data(), property);
        }
        Ok(())
    }

    /// Read a property without tracking or upgrading it.
    pub fn get_untracked(&self, property: &str) -> Value {
        self.target.get(property)
    }

    /// Property names in insertion order. Untracked.
    pub fn keys(&self) -> Vec<String> {
        self.target.keys()
    }

    pub fn is_shallow(&self) -> bool {
        self.shallow
    }

    /// The raw record behind this view. Accesses through it are untracked.
    pub fn to_raw(&self) -> Object {
        self.target.clone()
    }

    pub(crate) fn target(&self) -> &Object {
        &self.target
    }
}

impl PartialEq for Tracked {
    fn eq(&self, other: &Self) -> bool {
        self.target.ptr_eq(&other.target)
    }
}

impl fmt::Debug for Tracked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracked")
            .field("shallow", &self.shallow)
            .field("target", &self.target)
            .finish()
    }
}
