//! Error types.
//!
//! Tracking itself never fails: reads, dependency recording and lazy wrapping
//! are total. The only failures come from the storage underneath a write.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = TrackError> = std::result::Result<T, E>;

/// Errors reported by writes and value conversions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackError {
    /// The target object is frozen; the write was rejected and no
    /// subscriber was notified.
    #[error("cannot assign to property `{property}` of a frozen object")]
    ReadOnly { property: String },

    /// A property write was attempted on a value that has no properties.
    #[error("cannot set property `{property}` on a value of type {found}")]
    NotAnObject {
        property: String,
        found: &'static str,
    },

    /// A structured value was required.
    #[error("expected a structured value, found {found}")]
    NotStructured { found: &'static str },
}
