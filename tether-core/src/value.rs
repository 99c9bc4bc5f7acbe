//! Dynamic Values
//!
//! Tracked state is dynamically shaped: any property may hold a scalar, a
//! string, or another structured value that is itself discovered and tracked
//! lazily. This module provides that value model.
//!
//! # Identity
//!
//! [`Object`] is a shared handle. Cloning it clones the handle, not the
//! record, and the dependency registry keys on the shared allocation. Two
//! objects with equal contents are still different targets.
//!
//! # Property Order
//!
//! Properties keep their insertion order, so snapshots and `keys()` are
//! deterministic.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::{Result, TrackError};
use crate::reactive::Tracked;

/// A dynamically typed value that can be stored in a tracked property.
#[derive(Clone, Default)]
pub enum Value {
    /// Absent or explicitly empty value. Reading a missing property yields
    /// `Null`.
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// A raw structured value. Reads and writes through it are untracked.
    Object(Object),
    /// A structured value whose property access is tracked.
    Tracked(Tracked),
}

impl Value {
    /// Short name of the value's type, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Object(_) => "object",
            Value::Tracked(_) => "tracked object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric view of the value. Integers are widened.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_tracked(&self) -> Option<&Tracked> {
        match self {
            Value::Tracked(t) => Some(t),
            _ => None,
        }
    }

    /// Read a property.
    ///
    /// On a tracked value this goes through [`Tracked::get`] and records a
    /// dependency for the active effect. On a raw object the read is
    /// untracked. Anything else has no properties and yields `Null`.
    pub fn get(&self, property: &str) -> Value {
        match self {
            Value::Tracked(t) => t.get(property),
            Value::Object(o) => o.get(property),
            _ => Value::Null,
        }
    }

    /// Write a property.
    ///
    /// On a tracked value this goes through [`Tracked::set`] and notifies
    /// dependents. On a raw object the write is silent.
    pub fn set(&self, property: &str, value: impl Into<Value>) -> Result<()> {
        match self {
            Value::Tracked(t) => t.set(property, value),
            Value::Object(o) => o.insert(property, value),
            other => Err(TrackError::NotAnObject {
                property: property.to_owned(),
                found: other.type_name(),
            }),
        }
    }

    /// Untracked JSON snapshot of this value.
    ///
    /// Tracked values are serialized through their raw target, so taking a
    /// snapshot never registers dependencies.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

impl PartialEq for Value {
    /// Scalars compare by value; structured values compare by identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                *a as f64 == *b
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Tracked(a), Value::Tracked(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Object(o) => fmt::Debug::fmt(o, f),
            Value::Tracked(t) => fmt::Debug::fmt(t, f),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::Float(n) => serializer.serialize_f64(*n),
            Value::String(s) => serializer.serialize_str(s),
            Value::Object(o) => o.serialize(serializer),
            Value::Tracked(t) => t.to_raw().serialize(serializer),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n.into())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Int(n.into())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Object> for Value {
    fn from(o: Object) -> Self {
        Value::Object(o)
    }
}

impl From<Tracked> for Value {
    fn from(t: Tracked) -> Self {
        Value::Tracked(t)
    }
}

impl From<serde_json::Value> for Value {
    /// Arrays become objects keyed by element index (`"0"`, `"1"`, ...).
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Value::String(s),
            Json::Array(items) => Value::Object(
                items
                    .into_iter()
                    .enumerate()
                    .fold(Object::new(), |obj, (i, item)| obj.with(i.to_string(), item)),
            ),
            Json::Object(map) => Value::Object(map.into()),
        }
    }
}

// ----------------------------------------------------------------------------
// Object
// ----------------------------------------------------------------------------

/// Backing storage of an [`Object`]. The registry keys on this allocation.
pub(crate) struct ObjectData {
    fields: RefCell<IndexMap<String, Value>>,
    frozen: Cell<bool>,
}

/// A raw structured value: an insertion-ordered record with shared identity.
///
/// Reads and writes on an `Object` are never tracked. Pass it to
/// [`Runtime::reactive`](crate::reactive::Runtime::reactive) to obtain a
/// tracked view of the same record.
#[derive(Clone)]
pub struct Object(Rc<ObjectData>);

impl Object {
    /// Create an empty object.
    pub fn new() -> Self {
        Self(Rc::new(ObjectData {
            fields: RefCell::new(IndexMap::new()),
            frozen: Cell::new(false),
        }))
    }

    /// Builder-style insert, used to assemble fixtures.
    ///
    /// Ignores the frozen flag; freeze after building.
    pub fn with(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.fields.borrow_mut().insert(key.into(), value.into());
        self
    }

    /// Untracked read of a property. Missing properties read as `Null`.
    pub fn get(&self, key: &str) -> Value {
        self.0.fields.borrow().get(key).cloned().unwrap_or_default()
    }

    /// Untracked write of a property.
    pub fn insert(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        if self.is_frozen() {
            return Err(TrackError::ReadOnly {
                property: key.to_owned(),
            });
        }
        self.0.fields.borrow_mut().insert(key.to_owned(), value.into());
        Ok(())
    }

    /// Property names in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.0.fields.borrow().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.0.fields.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.fields.borrow().is_empty()
    }

    /// Reject all further writes, tracked or not.
    pub fn freeze(&self) {
        self.0.frozen.set(true);
    }

    pub fn is_frozen(&self) -> bool {
        self.0.frozen.get()
    }

    /// Whether both handles refer to the same record.
    pub fn ptr_eq(&self, other: &Object) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn data(&self) -> &Rc<ObjectData> {
        &self.0
    }

    /// Swap the value at `key` for a tracked view of it, bypassing
    /// notification. Returns `false` if the object is frozen.
    pub(crate) fn upgrade_in_place(&self, key: &str, value: Value) -> bool {
        if self.is_frozen() {
            return false;
        }
        if let Some(slot) = self.0.fields.borrow_mut().get_mut(key) {
            *slot = value;
        }
        true
    }
}

impl Default for Object {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.fields.borrow().iter()).finish()
    }
}

impl Serialize for Object {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let fields = self.0.fields.borrow();
        let mut map = serializer.serialize_map(Some(fields.len()))?;
        for (key, value) in fields.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for Object {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        map.into_iter()
            .fold(Object::new(), |obj, (key, value)| obj.with(key, value))
    }
}

impl TryFrom<serde_json::Value> for Object {
    type Error = TrackError;

    fn try_from(json: serde_json::Value) -> Result<Self> {
        match Value::from(json) {
            Value::Object(o) => Ok(o),
            other => Err(TrackError::NotStructured {
                found: other.type_name(),
            }),
        }
    }
}
