//! # Value conversion
//!
//! Pure functions that cast one value kind into another, and the copy
//! plans links use to move (parts of) values between properties.
//!
//! The kind-to-kind table is built once by an exhaustive match and then
//! only read:
//!
//! ```text
//!            number  boolean  string  enum   event  object
//! number       =      truthy   fmt    trunc  fire     -
//! boolean     1/0       =      fmt     1/0   fire     -
//! string     parse    "true"    =     parse  fire     -
//! enum         =      truthy   fmt      =    fire     -
//! event        =      truthy   fmt      -    fire     -
//! object       -        -       -       -     -       =
//! ```

pub mod copy;

use std::sync::OnceLock;

use crate::model::{Value, ValueKind};

pub use copy::{ChannelCopy, CopyPlan, ElementCopy};

/// Scalar conversion: (input element, current output element) → new output element.
///
/// The current output is only consulted by conversions that accumulate,
/// i.e. firing an event counter.
pub type ConvertFn = fn(&Value, &Value) -> Value;

// ============================================================================
// Conversion functions
// ============================================================================

fn identity(input: &Value, _output: &Value) -> Value {
    input.clone()
}

fn to_boolean(input: &Value, _output: &Value) -> Value {
    Value::Boolean(input.is_truthy())
}

fn to_string(input: &Value, _output: &Value) -> Value {
    match input {
        Value::String(s) => Value::String(s.clone()),
        other => Value::String(other.to_string()),
    }
}

fn number_to_index(input: &Value, _output: &Value) -> Value {
    let n = input.as_number().unwrap_or(0.0);
    Value::Number(if n.is_finite() { n.trunc() } else { 0.0 })
}

fn boolean_to_number(input: &Value, _output: &Value) -> Value {
    Value::Number(if input.is_truthy() { 1.0 } else { 0.0 })
}

fn string_to_number(input: &Value, _output: &Value) -> Value {
    let n = input.as_str().and_then(|s| s.trim().parse::<f64>().ok());
    Value::Number(n.unwrap_or(0.0))
}

fn string_to_index(input: &Value, _output: &Value) -> Value {
    let n = input.as_str().and_then(|s| s.trim().parse::<i64>().ok());
    Value::Number(n.unwrap_or(0) as f64)
}

fn string_to_boolean(input: &Value, _output: &Value) -> Value {
    let s = input.as_str().unwrap_or("").trim();
    Value::Boolean(s.eq_ignore_ascii_case("true") || s == "1")
}

/// Every push into an event property fires it once.
fn fire(_input: &Value, output: &Value) -> Value {
    Value::Number(output.as_number().unwrap_or(0.0) + 1.0)
}

// ============================================================================
// Conversion table
// ============================================================================

fn select(source: ValueKind, destination: ValueKind) -> Option<ConvertFn> {
    use ValueKind::*;

    let f: ConvertFn = match (source, destination) {
        (Object, Object) => identity,
        (Object, _) | (_, Object) => return None,

        (_, Event) => fire,

        (Number, Number) | (Enum, Number) | (Event, Number) => identity,
        (Boolean, Number) => boolean_to_number,
        (String, Number) => string_to_number,

        (Number, Boolean) | (Enum, Boolean) | (Event, Boolean) => to_boolean,
        (Boolean, Boolean) => identity,
        (String, Boolean) => string_to_boolean,

        (Number, String) | (Boolean, String) | (Enum, String) | (Event, String) => to_string,
        (String, String) => identity,

        (Number, Enum) => number_to_index,
        (Enum, Enum) => identity,
        (Boolean, Enum) => boolean_to_number,
        (String, Enum) => string_to_index,
        (Event, Enum) => return None,
    };
    Some(f)
}

/// Kind-to-kind conversion functions, indexed by `ValueKind::index`.
pub struct ConversionTable {
    entries: [[Option<ConvertFn>; ValueKind::COUNT]; ValueKind::COUNT],
}

impl ConversionTable {
    fn build() -> Self {
        let mut entries = [[None; ValueKind::COUNT]; ValueKind::COUNT];
        for source in ValueKind::ALL {
            for destination in ValueKind::ALL {
                entries[source.index()][destination.index()] = select(source, destination);
            }
        }
        Self { entries }
    }

    /// The process-wide table.
    pub fn global() -> &'static ConversionTable {
        static TABLE: OnceLock<ConversionTable> = OnceLock::new();
        TABLE.get_or_init(ConversionTable::build)
    }

    pub fn get(&self, source: ValueKind, destination: ValueKind) -> Option<ConvertFn> {
        self.entries[source.index()][destination.index()]
    }
}

/// Conversion function from `source` to `destination`, if the kinds are compatible.
pub fn conversion(source: ValueKind, destination: ValueKind) -> Option<ConvertFn> {
    ConversionTable::global().get(source, destination)
}

pub fn can_convert(source: ValueKind, destination: ValueKind) -> bool {
    conversion(source, destination).is_some()
}
