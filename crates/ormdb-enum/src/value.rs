//! Raw values accepted by enumerated attributes.

use std::fmt;
use std::sync::Arc;

use crate::enumeration::Row;

/// A value assigned to (or read from) an enumerated attribute.
///
/// Callers may hand an attribute an id, a name as a string or symbol, or a row
/// they already hold. Reads return `Row`, `Null`, or, while a validation error
/// is pending, the raw value that failed to resolve.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// No value.
    Null,
    /// Row id.
    Int(i64),
    /// Row name given as a string.
    String(String),
    /// Row name given as a symbol.
    Symbol(String),
    /// A row of some enumeration.
    Row(Arc<Row>),
}

impl Value {
    /// Create a symbol value.
    pub fn sym(name: impl Into<String>) -> Self {
        Value::Symbol(name.into())
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this value is an empty or whitespace-only string or symbol.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::String(s) | Value::Symbol(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Try to get as an id.
    pub fn as_id(&self) -> Option<i64> {
        match self {
            Value::Int(id) => Some(*id),
            _ => None,
        }
    }

    /// Try to get the name carried by a string or symbol.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Symbol(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as a row.
    pub fn as_row(&self) -> Option<&Arc<Row>> {
        match self {
            Value::Row(row) => Some(row),
            _ => None,
        }
    }

    /// Convert into a row, if this is one.
    pub fn into_row(self) -> Option<Arc<Row>> {
        match self {
            Value::Row(row) => Some(row),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "nil"),
            Value::Int(id) => write!(f, "{id}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Symbol(s) => write!(f, ":{s}"),
            Value::Row(row) => write!(f, "{row}"),
        }
    }
}

impl From<i64> for Value {
    fn from(id: i64) -> Self {
        Value::Int(id)
    }
}

impl From<i32> for Value {
    fn from(id: i32) -> Self {
        Value::Int(id as i64)
    }
}

impl From<u32> for Value {
    fn from(id: u32) -> Self {
        Value::Int(id as i64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Arc<Row>> for Value {
    fn from(row: Arc<Row>) -> Self {
        Value::Row(row)
    }
}

impl From<&Arc<Row>> for Value {
    fn from(row: &Arc<Row>) -> Self {
        Value::Row(Arc::clone(row))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}
