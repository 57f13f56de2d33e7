//! The snapshot tree.
//!
//! A `Value` is one immutable tree of nested records (mappings with unique
//! string keys) and collections (ordered sequences). Branch nodes are
//! `Arc`-wrapped, so cloning a snapshot is O(1) and successive snapshots
//! share every subtree that a transition did not touch. Pointer identity of
//! shared branches is observable through [`Value::ptr_eq`].

use crate::{Seg, Selector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A record node: unique string keys to child values.
pub type Record = BTreeMap<String, Value>;

/// A collection node: an ordered sequence of child values.
pub type Collection = Vec<Value>;

/// One node of the snapshot tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Absent / explicit null.
    Null,
    /// Boolean scalar.
    Bool(bool),
    /// Numeric scalar.
    Number(serde_json::Number),
    /// String scalar.
    String(String),
    /// Ordered sequence branch.
    Collection(Arc<Collection>),
    /// Mapping branch.
    Record(Arc<Record>),
}

/// The shape tag of a node, resolved once per call site.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    Null,
    Bool,
    Number,
    String,
    Collection,
    Record,
}

impl Value {
    /// Create an empty record node.
    #[inline]
    pub fn record() -> Self {
        Value::Record(Arc::new(Record::new()))
    }

    /// Create an empty collection node.
    #[inline]
    pub fn collection() -> Self {
        Value::Collection(Arc::new(Collection::new()))
    }

    /// The shape tag of this node.
    #[inline]
    pub fn kind(&self) -> Kind {
        match self {
            Value::Null => Kind::Null,
            Value::Bool(_) => Kind::Bool,
            Value::Number(_) => Kind::Number,
            Value::String(_) => Kind::String,
            Value::Collection(_) => Kind::Collection,
            Value::Record(_) => Kind::Record,
        }
    }

    /// Human-readable shape name, for error messages.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Collection(_) => "collection",
            Value::Record(_) => "record",
        }
    }

    /// Returns true if this node is null.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true if this node is a record.
    #[inline]
    pub fn is_record(&self) -> bool {
        matches!(self, Value::Record(_))
    }

    /// Returns true if this node is a collection.
    #[inline]
    pub fn is_collection(&self) -> bool {
        matches!(self, Value::Collection(_))
    }

    /// Get the boolean scalar, if any.
    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the integer scalar, if any.
    #[inline]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    /// Get the float scalar, if any.
    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    /// Get the string scalar, if any.
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the record map, if this node is a record.
    #[inline]
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(map) => Some(map),
            _ => None,
        }
    }

    /// Get the collection slice, if this node is a collection.
    #[inline]
    pub fn as_collection(&self) -> Option<&[Value]> {
        match self {
            Value::Collection(items) => Some(items),
            _ => None,
        }
    }

    /// Get the child under `key`, if this node is a record holding it.
    #[inline]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_record().and_then(|map| map.get(key))
    }

    /// Resolve a selector against this node.
    pub fn at(&self, selector: &Selector) -> Option<&Value> {
        let mut current = self;
        for seg in selector.iter() {
            current = match seg {
                Seg::Key(key) => current.get(key)?,
                Seg::Index(index) => current.as_collection()?.get(*index)?,
            };
        }
        Some(current)
    }

    /// Mutable access to the record map, detaching this node from any
    /// sharing peers. Draft-side only.
    #[inline]
    pub fn record_mut(&mut self) -> Option<&mut Record> {
        match self {
            Value::Record(map) => Some(Arc::make_mut(map)),
            _ => None,
        }
    }

    /// Mutable access to the collection vec, detaching this node from any
    /// sharing peers. Draft-side only.
    #[inline]
    pub fn collection_mut(&mut self) -> Option<&mut Collection> {
        match self {
            Value::Collection(items) => Some(Arc::make_mut(items)),
            _ => None,
        }
    }

    /// Resolve a selector against this node for writing.
    ///
    /// Every branch on the navigated path is detached (copy-on-write);
    /// siblings and the subtree below the resolved node stay shared until
    /// they are themselves written.
    pub fn at_mut(&mut self, selector: &Selector) -> Option<&mut Value> {
        let mut current = self;
        for seg in selector.iter() {
            current = match seg {
                Seg::Key(key) => match current {
                    Value::Record(map) => Arc::make_mut(map).get_mut(key)?,
                    _ => return None,
                },
                Seg::Index(index) => match current {
                    Value::Collection(items) => Arc::make_mut(items).get_mut(*index)?,
                    _ => return None,
                },
            };
        }
        Some(current)
    }

    /// Branch-node pointer identity.
    ///
    /// True when both nodes are the *same* shared record or collection
    /// allocation. Scalars have no identity and always compare false; use
    /// `==` for content equality.
    #[inline]
    pub fn ptr_eq(a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Record(x), Value::Record(y)) => Arc::ptr_eq(x, y),
            (Value::Collection(x), Value::Collection(y)) => Arc::ptr_eq(x, y),
            _ => false,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Number(v.into())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Number(v.into())
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Number(v.into())
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Number(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        serde_json::Number::from_f64(v).map_or(Value::Null, Value::Number)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Collection> for Value {
    fn from(items: Collection) -> Self {
        Value::Collection(Arc::new(items))
    }
}

impl From<Record> for Value {
    fn from(map: Record) -> Self {
        Value::Record(Arc::new(map))
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Collection(Arc::new(items.into_iter().map(Value::from).collect()))
            }
            serde_json::Value::Object(map) => Value::Record(Arc::new(
                map.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
            )),
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(v: &Value) -> Self {
        match v {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Value::Number(n.clone()),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Collection(items) => {
                serde_json::Value::Array(items.iter().map(serde_json::Value::from).collect())
            }
            Value::Record(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(v: Value) -> Self {
        serde_json::Value::from(&v)
    }
}
