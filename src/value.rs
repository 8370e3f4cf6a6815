use std::cmp::Ordering;
use std::collections::HashMap;

use rust_decimal::{Decimal, prelude::FromPrimitive};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::path::Path;

/// A runtime value flowing through query execution.
///
/// Documents arrive as plain JSON and are converted into this type on
/// fetch. Integers and floats are kept apart so that identifiers and counts
/// survive a round trip unchanged, and a dedicated [`Path`] variant carries
/// the structured value produced by `path()` and `joinPaths()`.
///
/// # Comparison
///
/// Comparisons are *loose*: numbers compare numerically across integer and
/// float, strings and booleans are coerced to numbers when compared against
/// a number, and structured values (null, arrays, objects) never compare
/// equal to anything. Paths compare through their dotted string form.
///
/// ```
/// use vellum::Value;
///
/// assert!(Value::Integer(1).loose_eq(&Value::Float(1.0)));
/// assert!(Value::String("2".into()).loose_eq(&Value::Integer(2)));
/// assert!(!Value::Null.loose_eq(&Value::Null));
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// JSON null, also the result of any unresolved attribute
    #[default]
    Null,

    Boolean(bool),

    Float(f64),

    Integer(i64),

    String(String),

    Array(Vec<Value>),

    Object(HashMap<String, Value>),

    /// Structured dotted path, rendered as a string on output
    Path(Path),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Null, arrays, objects and paths. These never take part in scalar
    /// comparison.
    pub fn is_structured(&self) -> bool {
        matches!(
            self,
            Value::Null | Value::Array(_) | Value::Object(_) | Value::Path(_)
        )
    }

    /// Truthiness used when collecting identifiers: `false`, `0`, `NaN`,
    /// the empty string and null are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Float(n) => *n != 0.0 && !n.is_nan(),
            Value::Integer(n) => *n != 0,
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) | Value::Path(_) => true,
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

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&HashMap<String, Value>> {
        match self {
            Value::Object(fields) => Some(fields),
            _ => None,
        }
    }

    /// Look up an attribute. Anything but an object yields `None`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.as_object().and_then(|fields| fields.get(name))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Float(_) | Value::Integer(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Path(_) => "path",
        }
    }

    /// Loose equality.
    pub fn loose_eq(&self, other: &Value) -> bool {
        if self.is_structured() || other.is_structured() {
            return match (self, other) {
                (Value::Path(a), Value::Path(b)) => a.to_string() == b.to_string(),
                _ => false,
            };
        }
        match (self, other) {
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            _ => compare_coerced(self, other) == Some(Ordering::Equal),
        }
    }

    /// Equality as the `==` operator sees it: unknown when either side is
    /// null.
    pub fn equals(&self, other: &Value) -> Option<bool> {
        if self.is_null() || other.is_null() {
            return None;
        }
        Some(self.loose_eq(other))
    }

    /// Loose ordering. `None` when either side is null or the two cannot be
    /// ordered.
    pub fn loose_cmp(&self, other: &Value) -> Option<Ordering> {
        if self.is_structured() || other.is_structured() {
            return match (self, other) {
                (Value::Path(a), Value::Path(b)) => Some(a.to_string().cmp(&b.to_string())),
                _ => None,
            };
        }
        match (self, other) {
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            _ => compare_coerced(self, other),
        }
    }

    /// Numeric view used by loose comparison.
    fn coerce_number(&self) -> Option<Value> {
        match self {
            Value::Integer(_) | Value::Float(_) => Some(self.clone()),
            Value::Boolean(b) => Some(Value::Integer(i64::from(*b))),
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Some(Value::Integer(0));
                }
                if !trimmed
                    .chars()
                    .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
                {
                    return None;
                }
                if let Ok(n) = trimmed.parse::<i64>() {
                    return Some(Value::Integer(n));
                }
                trimmed.parse::<f64>().ok().map(Value::Float)
            }
            _ => None,
        }
    }
}

/// Compare two numeric values. Mixed integer/float pairs go through
/// `Decimal` so large integers are not rounded before the comparison.
pub fn compare_numbers(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => Some(x.cmp(y)),
        (Value::Float(x), Value::Float(y)) => x.partial_cmp(y),
        (Value::Integer(x), Value::Float(y)) => compare_mixed(*x, *y),
        (Value::Float(x), Value::Integer(y)) => compare_mixed(*y, *x).map(Ordering::reverse),
        _ => None,
    }
}

fn compare_mixed(integer: i64, float: f64) -> Option<Ordering> {
    if let Some(a) = Decimal::from_i64(integer)
        && let Some(b) = Decimal::from_f64(float)
    {
        return Some(a.cmp(&b));
    }
    (integer as f64).partial_cmp(&float)
}

fn compare_coerced(a: &Value, b: &Value) -> Option<Ordering> {
    let a = a.coerce_number()?;
    let b = b.coerce_number()?;
    compare_numbers(&a, &b)
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(fields) => Value::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(b),
            Value::Integer(i) => serde_json::Value::Number(i.into()),
            Value::Float(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s),
            Value::Array(items) => {
                serde_json::Value::Array(items.into_iter().map(serde_json::Value::from).collect())
            }
            Value::Object(fields) => serde_json::Value::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, serde_json::Value::from(v)))
                    .collect(),
            ),
            Value::Path(path) => serde_json::Value::String(path.to_string()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Boolean(b) => serializer.serialize_bool(*b),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Object(fields) => {
                let mut keys: Vec<_> = fields.keys().collect();
                keys.sort();
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for key in keys {
                    map.serialize_entry(key, &fields[key])?;
                }
                map.end()
            }
            Value::Path(path) => serializer.collect_str(path),
        }
    }
}
