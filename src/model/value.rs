//! Runtime values carried by properties.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque reference to an object living outside the property graph
/// (a camera, a light, a mesh...). The graph never dereferences it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub object_type: String,
    pub target: String,
}

impl ObjectRef {
    pub fn new(object_type: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            target: target.into(),
        }
    }
}

/// Property value.
///
/// The shape of a value is dictated by the property's schema:
/// - Scalars: Number, Boolean, String (enum and event properties hold numbers)
/// - Fixed arrays: `Array` with the schema's element count (vectors, matrices, colors)
/// - Channel lists: `Multi`, one same-shaped value per channel
/// - References: `Object`, possibly empty
///
/// JSON encoding is untagged. Decoding is ambiguous between `Array` and `Multi`,
/// so decoded values go through `Schema::conform` before use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Boolean(bool),
    String(String),
    Array(Vec<Value>),
    Multi(Vec<Value>),
    Object(Option<ObjectRef>),
}

// ============================================================================
// Type checking / accessors
// ============================================================================

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "NUMBER",
            Value::Boolean(_) => "BOOLEAN",
            Value::String(_) => "STRING",
            Value::Array(_) => "ARRAY",
            Value::Multi(_) => "MULTI",
            Value::Object(_) => "OBJECT",
        }
    }

    pub fn is_number(&self) -> bool { matches!(self, Value::Number(_)) }
    pub fn is_array(&self) -> bool { matches!(self, Value::Array(_)) }
    pub fn is_multi(&self) -> bool { matches!(self, Value::Multi(_)) }

    /// Truthiness used by boolean conversion: zero, NaN, empty strings
    /// and empty references are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Boolean(b) => *b,
            Value::String(s) => !s.is_empty(),
            Value::Array(items) | Value::Multi(items) => !items.is_empty(),
            Value::Object(r) => r.is_some(),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(r) => r.as_ref(),
            _ => None,
        }
    }

    /// Elements of an array value, or channels of a multi value.
    pub fn items(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) | Value::Multi(items) => Some(items),
            _ => None,
        }
    }

    /// Array elements as plain numbers, if every element is a number.
    pub fn as_numbers(&self) -> Option<Vec<f64>> {
        match self {
            Value::Array(items) => items.iter().map(Value::as_number).collect(),
            _ => None,
        }
    }

    /// Element count: array length, 1 for everything else.
    pub fn len(&self) -> usize {
        match self {
            Value::Array(items) => items.len(),
            _ => 1,
        }
    }

    /// Single array element. Scalars have no addressable elements.
    pub fn element(&self, index: usize) -> Option<&Value> {
        match self {
            Value::Array(items) => items.get(index),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, index: usize) -> Option<&mut Value> {
        match self {
            Value::Array(items) => items.get_mut(index),
            _ => None,
        }
    }
}

// ============================================================================
// Conversions (From impls)
// ============================================================================

impl From<f64> for Value { fn from(v: f64) -> Self { Value::Number(v) } }
impl From<f32> for Value { fn from(v: f32) -> Self { Value::Number(v as f64) } }
impl From<i32> for Value { fn from(v: i32) -> Self { Value::Number(v as f64) } }
impl From<usize> for Value { fn from(v: usize) -> Self { Value::Number(v as f64) } }
impl From<bool> for Value { fn from(v: bool) -> Self { Value::Boolean(v) } }
impl From<String> for Value { fn from(v: String) -> Self { Value::String(v) } }
impl From<&str> for Value { fn from(v: &str) -> Self { Value::String(v.to_owned()) } }
impl From<ObjectRef> for Value { fn from(v: ObjectRef) -> Self { Value::Object(Some(v)) } }

impl<const N: usize> From<[f64; N]> for Value {
    fn from(v: [f64; N]) -> Self {
        Value::Array(v.into_iter().map(Value::Number).collect())
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Value::Array(v.into_iter().map(Value::Number).collect())
    }
}

// ============================================================================
// Display
// ============================================================================

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::String(s) => write!(f, "\"{}\"", s.replace('"', "\\\"")),
            Value::Array(items) | Value::Multi(items) => {
                let (open, close) = if self.is_multi() { ("<", ">") } else { ("[", "]") };
                write!(f, "{open}")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{v}")?;
                }
                write!(f, "{close}")
            }
            Value::Object(Some(r)) => write!(f, "{}({})", r.object_type, r.target),
            Value::Object(None) => write!(f, "null"),
        }
    }
}
