//! Tether Core
//!
//! Fine-grained reactive state tracking. Arbitrary mutable data notifies the
//! computations that read it, and only those, whenever a property they read
//! is written.
//!
//! - [`Tracked`] objects intercept property reads and writes.
//! - [`Ref`] cells give single values the same shape.
//! - Effects registered with [`run_effect`] re-run synchronously when a
//!   property they read changes.
//!
//! Dependencies are discovered while an effect runs; nothing needs to be
//! declared up front, including nested structure.
//!
//! # Example
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! use serde_json::json;
//! use tether_core::{Object, Runtime};
//!
//! let rt = Runtime::new();
//! let state = rt.reactive(Object::try_from(json!({"count": 1})).unwrap());
//! let doubled = Rc::new(Cell::new(0));
//!
//! rt.run_effect({
//!     let state = state.clone();
//!     let doubled = doubled.clone();
//!     move || doubled.set(state.get("count").as_i64().unwrap_or(0) * 2)
//! });
//! assert_eq!(doubled.get(), 2);
//!
//! state.set("count", 5).unwrap();
//! assert_eq!(doubled.get(), 10);
//! ```
//!
//! # Architecture
//!
//! - `value`: the dynamic [`Value`] model and raw [`Object`] records
//! - `reactive`: registry, context, runtime, tracked objects and cells
//! - `error`: [`TrackError`]

pub mod error;
pub mod reactive;
pub mod value;

pub use error::{Result, TrackError};
pub use reactive::{
    Effect, Ref, Runtime, RuntimeConfig, SubscriberId, TrackOptions, Tracked, REF_VALUE_KEY,
};
pub use value::{Object, Value};

/// Register an effect on the calling thread's default runtime.
///
/// See [`Runtime::run_effect`].
pub fn run_effect<F>(callback: F) -> Effect
where
    F: Fn() + 'static,
{
    Runtime::current().run_effect(callback)
}

/// Deeply track `object` on the default runtime.
pub fn reactive(object: Object) -> Tracked {
    Runtime::current().reactive(object)
}

/// Track `object` on the default runtime without wrapping nested objects.
pub fn shallow_reactive(object: Object) -> Tracked {
    Runtime::current().reactive_with(object, TrackOptions::shallow())
}

/// Create a reference cell on the default runtime.
pub fn make_ref(raw: impl Into<Value>) -> Ref {
    Runtime::current().make_ref(raw)
}
