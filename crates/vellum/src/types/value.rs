//! Values and their comparison and conversion semantics.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Array, Document};
use crate::error::{Error, Result};

/// The type tag of a value. The discriminant doubles as the encoding prefix
/// byte, and its order defines the cross-type total order: null < bool <
/// numeric < text < blob < array < document. This differs from SQL
/// standards, where cross-type comparison is an error; here it makes the
/// order total so any mix of values can be sorted and indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ValueKind {
    Null = 0x00,
    Bool = 0x01,
    Int64 = 0x02,
    Float64 = 0x03,
    Text = 0x04,
    Blob = 0x05,
    Array = 0x06,
    Document = 0x07,
}

impl ValueKind {
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<ValueKind> {
        match tag {
            0x00 => Some(ValueKind::Null),
            0x01 => Some(ValueKind::Bool),
            0x02 => Some(ValueKind::Int64),
            0x03 => Some(ValueKind::Float64),
            0x04 => Some(ValueKind::Text),
            0x05 => Some(ValueKind::Blob),
            0x06 => Some(ValueKind::Array),
            0x07 => Some(ValueKind::Document),
            _ => None,
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, ValueKind::Int64 | ValueKind::Float64)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Int64 => "int64",
            ValueKind::Float64 => "float64",
            ValueKind::Text => "text",
            ValueKind::Blob => "blob",
            ValueKind::Array => "array",
            ValueKind::Document => "document",
        };
        write!(f, "{}", name)
    }
}

/// A single database value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int64(i64),
    Float64(f64),
    Text(String),
    Blob(Vec<u8>),
    Array(Array),
    Document(Document),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int64(_) => ValueKind::Int64,
            Value::Float64(_) => ValueKind::Float64,
            Value::Text(_) => ValueKind::Text,
            Value::Blob(_) => ValueKind::Blob,
            Value::Array(_) => ValueKind::Array,
            Value::Document(_) => ValueKind::Document,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_numeric(&self) -> bool {
        self.kind().is_numeric()
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int64(i) => Some(*i as f64),
            Value::Float64(f) => Some(*f),
            _ => None,
        }
    }

    /// Total order across all values. Null sorts first, then by type tag;
    /// same-kind values compare naturally, mixed numerics by magnitude,
    /// composites recursively with the shorter-is-smaller prefix rule.
    pub fn cmp_total(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int64(a), Value::Int64(b)) => a.cmp(b),
            (a, b) if a.is_numeric() && b.is_numeric() => {
                let (a, b) = (a.as_f64().unwrap(), b.as_f64().unwrap());
                a.partial_cmp(&b).unwrap_or(Ordering::Equal)
            }
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Blob(a), Value::Blob(b)) => a.cmp(b),
            (Value::Array(a), Value::Array(b)) => cmp_arrays(a, b),
            (Value::Document(a), Value::Document(b)) => cmp_documents(a, b),
            (a, b) => a.kind().cmp(&b.kind()),
        }
    }

    /// `=` with null semantics: true when both sides are null, false when
    /// only one is.
    pub fn is_equal(&self, other: &Value) -> bool {
        if self.is_null() || other.is_null() {
            return self.is_null() && other.is_null();
        }
        self.cmp_total(other) == Ordering::Equal
    }

    /// `>`: always false when either side is null.
    pub fn is_greater_than(&self, other: &Value) -> bool {
        if self.is_null() || other.is_null() {
            return false;
        }
        self.cmp_total(other) == Ordering::Greater
    }

    /// `>=`: true when both sides are null, false when only one is.
    pub fn is_greater_or_equal(&self, other: &Value) -> bool {
        if self.is_null() || other.is_null() {
            return self.is_null() && other.is_null();
        }
        self.cmp_total(other) != Ordering::Less
    }

    /// `<`: always false when either side is null.
    pub fn is_less_than(&self, other: &Value) -> bool {
        if self.is_null() || other.is_null() {
            return false;
        }
        self.cmp_total(other) == Ordering::Less
    }

    /// `<=`: true when both sides are null, false when only one is.
    pub fn is_less_or_equal(&self, other: &Value) -> bool {
        if self.is_null() || other.is_null() {
            return self.is_null() && other.is_null();
        }
        self.cmp_total(other) != Ordering::Greater
    }

    /// Whether the value counts as true in a WHERE predicate: the non-zero,
    /// non-empty value of its type.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int64(i) => *i != 0,
            Value::Float64(f) => *f != 0.0,
            Value::Text(s) => !s.is_empty(),
            Value::Blob(b) => !b.is_empty(),
            Value::Array(a) => !a.is_empty(),
            Value::Document(d) => !d.is_empty(),
        }
    }

    /// Converts the value to the target kind. Defined for every pair that
    /// is lossless or documented-lossy; anything else is a `TypeMismatch`.
    pub fn convert_to(&self, target: ValueKind) -> Result<Value> {
        if self.kind() == target {
            return Ok(self.clone());
        }
        match (self, target) {
            (Value::Bool(b), ValueKind::Int64) => Ok(Value::Int64(*b as i64)),
            (Value::Int64(i), ValueKind::Float64) => Ok(Value::Float64(*i as f64)),
            (Value::Float64(f), ValueKind::Int64) if f.fract() == 0.0 && f.is_finite() => {
                Ok(Value::Int64(*f as i64))
            }
            (Value::Text(s), ValueKind::Blob) => Ok(Value::Blob(s.clone().into_bytes())),
            (Value::Blob(b), ValueKind::Text) => match String::from_utf8(b.clone()) {
                Ok(s) => Ok(Value::Text(s)),
                Err(_) => Err(Error::type_mismatch("valid utf-8 blob", "arbitrary blob")),
            },
            (v, ValueKind::Text) => Ok(Value::Text(v.stringify())),
            (v, target) => Err(Error::type_mismatch(
                target.to_string(),
                v.kind().to_string(),
            )),
        }
    }

    /// The bare textual form used by conversion to text; unlike `Display`,
    /// text is not quoted.
    fn stringify(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            v => v.to_string(),
        }
    }
}

fn cmp_arrays(a: &Array, b: &Array) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        match x.cmp_total(y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    a.len().cmp(&b.len())
}

/// Documents compare as their name-sorted `(name, value)` sequences: field
/// name first, then value, with the array prefix rule.
fn cmp_documents(a: &Document, b: &Document) -> Ordering {
    let mut a_fields: Vec<_> = a.iter().collect();
    let mut b_fields: Vec<_> = b.iter().collect();
    a_fields.sort_by_key(|(name, _)| *name);
    b_fields.sort_by_key(|(name, _)| *name);

    for ((a_name, a_value), (b_name, b_value)) in a_fields.iter().zip(b_fields.iter()) {
        match a_name.cmp(b_name) {
            Ordering::Equal => {}
            other => return other,
        }
        match a_value.cmp_total(b_value) {
            Ordering::Equal => {}
            other => return other,
        }
    }
    a_fields.len().cmp(&b_fields.len())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int64(i) => write!(f, "{}", i),
            Value::Float64(v) => {
                if v.fract() == 0.0 && v.is_finite() {
                    write!(f, "{:.1}", v)
                } else {
                    write!(f, "{}", v)
                }
            }
            Value::Text(s) => write!(f, "{:?}", s),
            Value::Blob(b) => {
                write!(f, "0x")?;
                for byte in b {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
            Value::Array(a) => {
                write!(f, "[")?;
                for (i, v) in a.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            Value::Document(d) => {
                write!(f, "{{")?;
                for (i, (name, value)) in d.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int64(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float64(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}
