use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A value stored under a dynamic attribute key.
///
/// This is the closed set of shapes the blob codec can represent. Equality is
/// deep value equality. An absent attribute is modelled as `Option::None` at
/// the call sites and is distinct from [`AttrValue::Null`].
///
/// Variant declaration order is part of the bincode blob format: the encoded
/// tag is the variant's index. Reordering or inserting variants changes the
/// meaning of every stored blob and needs a new blob version.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    /// Explicit null. Present, unlike an absent attribute.
    Null,
    Bool(bool),
    Int(i64),
    /// Must be finite to be encodable.
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    List(Vec<AttrValue>),
    Map(BTreeMap<String, AttrValue>),
}

impl AttrValue {
    /// Wrap raw bytes. `Vec<u8>` converts to a list via `From`, so bytes
    /// need an explicit constructor.
    pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(data.into())
    }

    /// Short, stable name of the value's shape.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, AttrValue>> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Consume the value, returning the inner map if this is a `Map`.
    pub fn into_map(self) -> Option<BTreeMap<String, AttrValue>> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Returns `true` if every float in the value tree is finite.
    pub fn is_finite(&self) -> bool {
        match self {
            Self::Float(f) => f.is_finite(),
            Self::List(items) => items.iter().all(Self::is_finite),
            Self::Map(entries) => entries.values().all(Self::is_finite),
            _ => true,
        }
    }

    /// Number of nested lists and maps, counting this value. Scalars are 0.
    pub fn nesting_depth(&self) -> usize {
        match self {
            Self::List(items) => 1 + items.iter().map(Self::nesting_depth).max().unwrap_or(0),
            Self::Map(entries) => 1 + entries.values().map(Self::nesting_depth).max().unwrap_or(0),
            _ => 0,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Self::List(items) => write!(f, "[{} items]", items.len()),
            Self::Map(entries) => write!(f, "{{{} entries}}", entries.len()),
        }
    }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for AttrValue {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl<T: Into<AttrValue>> From<Vec<T>> for AttrValue {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, AttrValue>> for AttrValue {
    fn from(entries: BTreeMap<String, AttrValue>) -> Self {
        Self::Map(entries)
    }
}

impl TryFrom<&AttrValue> for i64 {
    type Error = TypeError;

    fn try_from(value: &AttrValue) -> Result<Self, Self::Error> {
        value.as_i64().ok_or(TypeError::TypeMismatch {
            expected: "int",
            actual: value.type_name(),
        })
    }
}

impl TryFrom<&AttrValue> for bool {
    type Error = TypeError;

    fn try_from(value: &AttrValue) -> Result<Self, Self::Error> {
        value.as_bool().ok_or(TypeError::TypeMismatch {
            expected: "bool",
            actual: value.type_name(),
        })
    }
}

impl TryFrom<&AttrValue> for String {
    type Error = TypeError;

    fn try_from(value: &AttrValue) -> Result<Self, Self::Error> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or(TypeError::TypeMismatch {
                expected: "text",
                actual: value.type_name(),
            })
    }
}
