//! Property schemas: value kinds, presets, bounds, enumerations and object types.

use serde::{Deserialize, Serialize};

use super::Value;
use crate::{Error, Result};

// ============================================================================
// Value kinds
// ============================================================================

/// Closed set of value kinds a property can hold.
///
/// Enum values are option indices and event values are fire counters;
/// both are stored as numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Number,
    Boolean,
    String,
    Enum,
    Event,
    Object,
}

impl ValueKind {
    pub const COUNT: usize = 6;

    pub const ALL: [ValueKind; Self::COUNT] = [
        ValueKind::Number,
        ValueKind::Boolean,
        ValueKind::String,
        ValueKind::Enum,
        ValueKind::Event,
        ValueKind::Object,
    ];

    /// Dense index, used by the conversion table.
    pub const fn index(self) -> usize {
        match self {
            ValueKind::Number => 0,
            ValueKind::Boolean => 1,
            ValueKind::String => 2,
            ValueKind::Enum => 3,
            ValueKind::Event => 4,
            ValueKind::Object => 5,
        }
    }

    /// Whether a scalar value has the representation this kind stores.
    pub fn admits(self, value: &Value) -> bool {
        match self {
            ValueKind::Number | ValueKind::Enum | ValueKind::Event => value.is_number(),
            ValueKind::Boolean => matches!(value, Value::Boolean(_)),
            ValueKind::String => matches!(value, Value::String(_)),
            ValueKind::Object => matches!(value, Value::Object(_)),
        }
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ValueKind::Number => "number",
            ValueKind::Boolean => "boolean",
            ValueKind::String => "string",
            ValueKind::Enum => "enum",
            ValueKind::Event => "event",
            ValueKind::Object => "object",
        };
        write!(f, "{s}")
    }
}

// ============================================================================
// Object and enum types
// ============================================================================

/// Capability tag for object-reference properties.
///
/// A type carries the names of all the types it derives from, so
/// assignability is a lookup rather than a walk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectType {
    name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    ancestors: Vec<String>,
}

impl ObjectType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ancestors: Vec::new(),
        }
    }

    /// Create a subtype of `self`.
    pub fn derive(&self, name: impl Into<String>) -> Self {
        let mut ancestors = Vec::with_capacity(self.ancestors.len() + 1);
        ancestors.push(self.name.clone());
        ancestors.extend(self.ancestors.iter().cloned());
        Self {
            name: name.into(),
            ancestors,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True if a value of type `other` may be stored where `self` is expected.
    pub fn accepts(&self, other: &ObjectType) -> bool {
        other.name == self.name || other.ancestors.iter().any(|a| *a == self.name)
    }
}

/// Symbolic enumeration; property values are indices into `variants`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnumType {
    pub name: String,
    pub variants: Vec<String>,
}

impl EnumType {
    pub fn new(name: impl Into<String>, variants: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            name: name.into(),
            variants: variants.into_iter().map(Into::into).collect(),
        }
    }
}

// ============================================================================
// Schema
// ============================================================================

/// Immutable descriptor of a property: preset value (which also fixes the
/// kind's element count), bounds, options and linking capabilities.
///
/// Only `options` may change after the property is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    pub kind: ValueKind,
    pub preset: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_type: Option<EnumType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_type: Option<ObjectType>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub multi: bool,
    #[serde(default, rename = "static", skip_serializing_if = "is_false")]
    pub is_static: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl Schema {
    fn with_preset(kind: ValueKind, preset: Value) -> Self {
        Self {
            kind,
            preset,
            min: None,
            max: None,
            step: None,
            options: None,
            enum_type: None,
            object_type: None,
            multi: false,
            is_static: false,
            label: None,
        }
    }

    pub fn number(preset: f64) -> Self {
        Self::with_preset(ValueKind::Number, Value::Number(preset))
    }

    pub fn boolean(preset: bool) -> Self {
        Self::with_preset(ValueKind::Boolean, Value::Boolean(preset))
    }

    pub fn string(preset: impl Into<String>) -> Self {
        Self::with_preset(ValueKind::String, Value::String(preset.into()))
    }

    pub fn vector2(preset: [f64; 2]) -> Self {
        Self::with_preset(ValueKind::Number, preset.into())
    }

    pub fn vector3(preset: [f64; 3]) -> Self {
        Self::with_preset(ValueKind::Number, preset.into())
    }

    pub fn vector4(preset: [f64; 4]) -> Self {
        Self::with_preset(ValueKind::Number, preset.into())
    }

    /// 4x4 matrix, column-major, identity preset.
    pub fn matrix4() -> Self {
        let mut m = [0.0; 16];
        for i in 0..4 {
            m[i * 5] = 1.0;
        }
        Self::with_preset(ValueKind::Number, m.into())
    }

    pub fn color_rgb(preset: [f64; 3]) -> Self {
        Self::vector3(preset).with_range(0.0, 1.0)
    }

    pub fn color_rgba(preset: [f64; 4]) -> Self {
        Self::vector4(preset).with_range(0.0, 1.0)
    }

    /// Numeric array of arbitrary length.
    pub fn numbers(preset: Vec<f64>) -> Self {
        Self::with_preset(ValueKind::Number, preset.into())
    }

    pub fn enumeration(enum_type: EnumType, preset: usize) -> Self {
        let mut schema = Self::with_preset(ValueKind::Enum, Value::from(preset));
        schema.enum_type = Some(enum_type);
        schema
    }

    pub fn option(options: impl IntoIterator<Item = impl Into<String>>, preset: usize) -> Self {
        let mut schema = Self::with_preset(ValueKind::Enum, Value::from(preset));
        schema.options = Some(options.into_iter().map(Into::into).collect());
        schema
    }

    pub fn event() -> Self {
        Self::with_preset(ValueKind::Event, Value::Number(0.0))
    }

    pub fn object(object_type: ObjectType) -> Self {
        let mut schema = Self::with_preset(ValueKind::Object, Value::Object(None));
        schema.object_type = Some(object_type);
        schema
    }

    /// Object reference without a type constraint.
    pub fn any_object() -> Self {
        Self::with_preset(ValueKind::Object, Value::Object(None))
    }

    // ------------------------------------------------------------------------
    // Builders
    // ------------------------------------------------------------------------

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn with_min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn with_max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn with_step(mut self, step: f64) -> Self {
        self.step = Some(step);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Turn the property into a channel list of preset-shaped values.
    pub fn multi(mut self) -> Self {
        self.multi = true;
        self
    }

    /// Mark the property as static: it can never be linked.
    pub fn non_linkable(mut self) -> Self {
        self.is_static = true;
        self
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn element_count(&self) -> usize {
        self.preset.len()
    }

    pub fn is_array(&self) -> bool {
        self.element_count() > 1
    }

    pub fn is_multi(&self) -> bool {
        self.multi
    }

    pub fn is_event(&self) -> bool {
        self.kind == ValueKind::Event
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Number of valid indices for enum/option kinds.
    pub fn option_count(&self) -> Option<usize> {
        if let Some(e) = &self.enum_type {
            return Some(e.variants.len());
        }
        self.options.as_ref().map(Vec::len)
    }

    /// Label of an option/enum index, if valid.
    pub fn option_text(&self, index: usize) -> Option<&str> {
        if let Some(e) = &self.enum_type {
            return e.variants.get(index).map(String::as_str);
        }
        self.options.as_ref().and_then(|o| o.get(index)).map(String::as_str)
    }

    /// Fresh value for a property with this schema.
    pub fn default_value(&self) -> Value {
        if self.multi {
            Value::Multi(vec![self.preset.clone()])
        } else {
            self.preset.clone()
        }
    }

    /// Whether `value` has the shape of a single channel of this schema.
    fn accepts_channel(&self, value: &Value) -> bool {
        match (&self.preset, value) {
            (Value::Array(preset), Value::Array(items)) => {
                preset.len() == items.len() && items.iter().all(|v| self.kind.admits(v))
            }
            (Value::Array(_), _) | (_, Value::Array(_)) => false,
            _ => self.kind.admits(value),
        }
    }

    /// Whether `value` may be stored in a property with this schema.
    pub fn accepts(&self, value: &Value) -> bool {
        match value {
            Value::Multi(channels) => self.multi && channels.iter().all(|c| self.accepts_channel(c)),
            _ => !self.multi && self.accepts_channel(value),
        }
    }

    /// Reshape a decoded value to this schema.
    pub fn conform(&self, value: Value) -> Result<Value> {
        let value = match value {
            Value::Array(channels) if self.multi => Value::Multi(channels),
            other => other,
        };
        if self.accepts(&value) {
            Ok(value)
        } else {
            Err(Error::TypeError {
                expected: self.shape_name(),
                got: value.type_name().into(),
            })
        }
    }

    /// Human readable shape, used in error messages.
    pub fn shape_name(&self) -> String {
        let mut s = self.kind.to_string();
        if self.is_array() {
            s = format!("{s}[{}]", self.element_count());
        }
        if self.multi {
            s = format!("multi {s}");
        }
        s
    }

    fn validate_scalar(&self, value: &Value) -> Value {
        let Value::Number(n) = value else {
            return value.clone();
        };
        match self.kind {
            ValueKind::Number => {
                let mut n = *n;
                if let Some(min) = self.min {
                    n = n.max(min);
                }
                if let Some(max) = self.max {
                    n = n.min(max);
                }
                Value::Number(n)
            }
            ValueKind::Enum => {
                let count = self.option_count().unwrap_or(0);
                let i = n.trunc();
                let in_range = i >= 0.0 && (i as usize) < count;
                if self.enum_type.is_some() {
                    Value::Number(if in_range { i } else { 0.0 })
                } else if count == 0 || !i.is_finite() {
                    Value::Number(0.0)
                } else {
                    Value::Number(i.clamp(0.0, (count - 1) as f64))
                }
            }
            _ => value.clone(),
        }
    }

    fn validate_channel(&self, value: &Value) -> Value {
        match value {
            Value::Array(items) => Value::Array(items.iter().map(|v| self.validate_scalar(v)).collect()),
            other => self.validate_scalar(other),
        }
    }

    /// Clamp numbers into `[min, max]` and map enum/option indices into range.
    pub fn validate(&self, value: &Value) -> Value {
        match value {
            Value::Multi(channels) => Value::Multi(channels.iter().map(|c| self.validate_channel(c)).collect()),
            other => self.validate_channel(other),
        }
    }
}
