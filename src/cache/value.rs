//! Cache Value Module
//!
//! Defines the payload type callers hand to the cache.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, RwLock};

use serde::ser::{Error as _, Serialize, SerializeMap, SerializeSeq, Serializer};

/// Reference-counted, interior-mutable value node.
///
/// Shared nodes let callers express diamond-shaped structures and genuine
/// cycles (a node reachable from itself).
pub type SharedValue = Arc<RwLock<Value>>;

// == Value ==
/// A JSON-like value stored in the cache.
///
/// Plain variants form an owned tree. `Shared` wraps a node behind
/// `Arc<RwLock<..>>`; cloning a `Value` clones `Shared` nodes by reference,
/// so a cache hit returns the same shared interior rather than a defensive
/// copy.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Shared(SharedValue),
}

impl Value {
    // == Shared Constructor ==
    /// Wraps a value in a new shared node.
    pub fn shared(value: Value) -> Self {
        Value::Shared(Arc::new(RwLock::new(value)))
    }

    // == Accessors ==
    /// Returns the inner bool, if this is a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the inner integer, if this is an `Int`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the inner string slice, if this is a `Text`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Looks up a field, if this is a `Map`.
    pub fn get(&self, field: &str) -> Option<&Value> {
        match self {
            Value::Map(fields) => fields.get(field),
            _ => None,
        }
    }
}

// == Equality ==
/// Structural equality for owned variants; `Shared` nodes compare by
/// identity so comparison terminates on cyclic graphs.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Shared(a), Value::Shared(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

// == Conversions ==
impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(0.0)),
            },
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(fields) => Value::Map(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

// == Serialization ==
thread_local! {
    /// Shared nodes on the current serialization path, keyed by pointer.
    static SERIALIZE_PATH: RefCell<HashSet<usize>> = RefCell::new(HashSet::new());
}

/// Serializes like `serde_json::Value`; `Shared` nodes serialize their
/// interior. A shared node already on the current path is a cycle and fails
/// with a descriptive error instead of recursing forever.
impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::Text(s) => serializer.serialize_str(s),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (key, value) in fields {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Value::Shared(node) => {
                let addr = Arc::as_ptr(node) as usize;
                let entered = SERIALIZE_PATH.with(|path| path.borrow_mut().insert(addr));
                if !entered {
                    return Err(S::Error::custom("circular reference in shared value"));
                }
                let guard = node.read().unwrap_or_else(|poisoned| poisoned.into_inner());
                let result = guard.serialize(serializer);
                SERIALIZE_PATH.with(|path| {
                    path.borrow_mut().remove(&addr);
                });
                result
            }
        }
    }
}
