//! The normalized runtime form of property values.
//!
//! Every validator and comparison runs on [`StandardValue`], never on the
//! wire JSON, so `4`, `4.0` and `"4"` declared as a number all compare
//! equal once normalized. "Absent" is modelled as `Option::None` by the
//! callers; there is no null variant.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use svcschema_types::ServiceId;
use thiserror::Error;

/// Normalized property set, keyed by property name.
pub type PropertyMap = BTreeMap<String, StandardValue>;

/// A schema-typed property value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StandardValue {
    String(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
    Object(BTreeMap<String, StandardValue>),
    Array(Vec<StandardValue>),
    /// Identifier of an existing service.
    Reference(ServiceId),
}

/// A JSON value with no standard-value representation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("null array elements are not allowed (index {0})")]
    NullArrayElement(usize),
}

impl StandardValue {
    /// Structural conversion without a declared type.
    ///
    /// Integers that fit `i64` become [`StandardValue::Integer`], every
    /// other number a [`StandardValue::Number`]. Null object entries are
    /// dropped (absent); null array elements are rejected.
    pub fn from_json(value: &Value) -> Result<Option<Self>, ValueError> {
        let converted = match value {
            Value::Null => return Ok(None),
            Value::Bool(b) => Self::Boolean(*b),
            Value::String(s) => Self::String(s.clone()),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    match Self::from_json(item)? {
                        Some(v) => out.push(v),
                        None => return Err(ValueError::NullArrayElement(i)),
                    }
                }
                Self::Array(out)
            }
            Value::Object(map) => {
                let mut out = BTreeMap::new();
                for (key, item) in map {
                    if let Some(v) = Self::from_json(item)? {
                        out.insert(key.clone(), v);
                    }
                }
                Self::Object(out)
            }
        };
        Ok(Some(converted))
    }

    /// Back to JSON for callers and persistence.
    pub fn to_json(&self) -> Value {
        match self {
            Self::String(s) => Value::String(s.clone()),
            Self::Integer(i) => Value::from(*i),
            Self::Number(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Self::Boolean(b) => Value::Bool(*b),
            Self::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Self::Array(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Reference(id) => Value::String(id.to_string()),
        }
    }

    /// Name of the variant, as used in type-guard messages.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Integer(_) => "integer",
            Self::Number(_) => "number",
            Self::Boolean(_) => "boolean",
            Self::Object(_) => "object",
            Self::Array(_) => "array",
            Self::Reference(_) => "reference",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view across the integer/number tower.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Number(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[StandardValue]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, StandardValue>> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Semantic equality: integers equal numbers of the same value, map
    /// comparison ignores key order, references equal their string form.
    pub fn deep_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Integer(_) | Self::Number(_), Self::Integer(_) | Self::Number(_)) => {
                self.as_f64() == other.as_f64()
            }
            (Self::Reference(id), Self::String(s)) | (Self::String(s), Self::Reference(id)) => {
                id.to_string().eq_ignore_ascii_case(s)
            }
            (Self::Object(a), Self::Object(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| b.get(k).is_some_and(|other| v.deep_eq(other)))
            }
            (Self::Array(a), Self::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.deep_eq(y))
            }
            _ => self == other,
        }
    }

    /// String rendering used as a dedup key.
    ///
    /// Distinct values can share a rendering (`1`, `1.0` and `"1"` all
    /// render as `1`); callers relying on it inherit that collision.
    pub fn render_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for StandardValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Reference(id) => write!(f, "{id}"),
            Self::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Object(map) => {
                f.write_str("map[")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{k}:{v}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<&str> for StandardValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for StandardValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for StandardValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<f64> for StandardValue {
    fn from(f: f64) -> Self {
        Self::Number(f)
    }
}

impl From<bool> for StandardValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<ServiceId> for StandardValue {
    fn from(id: ServiceId) -> Self {
        Self::Reference(id)
    }
}
