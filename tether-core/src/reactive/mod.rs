//! Reactive Primitives
//!
//! This module implements transparent dependency tracking over dynamically
//! shaped state: tracked objects, reference cells, and effects.
//!
//! # Concepts
//!
//! ## Effects
//!
//! An Effect is a callback that runs once when registered and again,
//! synchronously, every time a property it read is written. There is no
//! scheduler and no batching: a write that affects N effects runs N
//! callbacks before it returns.
//!
//! ## Tracked Objects
//!
//! A Tracked object wraps an [`Object`](crate::Object). Reads inside an
//! effect subscribe that effect to the property read; writes notify the
//! property's subscribers. Nested objects are upgraded lazily on first read
//! unless the view is shallow.
//!
//! ## Reference Cells
//!
//! A Ref holds a single value behind `get`/`set`, tracked like one
//! property named `"value"`.
//!
//! # Implementation Notes
//!
//! Every runtime owns a dependency registry (target → property → ordered
//! effect set) and a context slot naming the running effect. The registry
//! holds targets weakly, so tracking never extends a target's lifetime.

mod cell;
mod context;
mod registry;
mod runtime;
mod subscriber;
mod tracked;

pub use cell::{Ref, REF_VALUE_KEY};
pub use runtime::{Runtime, RuntimeConfig};
pub use subscriber::{Effect, SubscriberId};
pub use tracked::{TrackOptions, Tracked};
