//! Input resolution.
//!
//! Maps whatever a caller assigned to an enumerated attribute onto a row of
//! the enumeration. Rules apply in order:
//!
//! 1. `nil` is absent.
//! 2. A blank string or symbol is absent, unless empty names are permitted, in
//!    which case it is looked up as a name like any other string.
//! 3. A row published by this enumeration resolves to the row with its id in
//!    the current snapshot. A row deleted since it was handed out is invalid.
//! 4. An integer is looked up by id.
//! 5. Anything else is looked up by name.
//!
//! Integers are never tried as names, even if some row is named `"1"`.

use std::sync::Arc;

use tracing::debug;

use crate::enumeration::{EnumerationCache, Row};
use crate::error::Error;
use crate::value::Value;

/// Outcome of resolving a raw value.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    /// The value names this row.
    Found(Arc<Row>),
    /// Nil or blank input. Not a failure.
    Absent,
    /// Non-empty input matching no row.
    Invalid(Value),
}

impl Resolved {
    /// Get the row, if found.
    pub fn row(&self) -> Option<&Arc<Row>> {
        match self {
            Resolved::Found(row) => Some(row),
            _ => None,
        }
    }

    /// Check if resolution failed.
    pub fn is_invalid(&self) -> bool {
        matches!(self, Resolved::Invalid(_))
    }
}

/// Resolve `raw` against `cache`.
///
/// Nil and blank input never touch the cache, so clearing an attribute works
/// even while the row source is down. Otherwise errors only come from building
/// the cache.
pub fn resolve(
    raw: &Value,
    cache: &EnumerationCache,
    permit_empty_name: bool,
) -> Result<Resolved, Error> {
    let found = match raw {
        Value::Null => return Ok(Resolved::Absent),
        v if v.is_blank() && !permit_empty_name => return Ok(Resolved::Absent),
        Value::Row(row) if cache.owns(row) => cache.find_by_id(row.id())?,
        Value::Row(_) => None,
        Value::Int(id) => cache.find_by_id(*id)?,
        Value::String(name) | Value::Symbol(name) => cache.find_by_name(name)?,
    };

    match found {
        Some(row) => Ok(Resolved::Found(row)),
        None => {
            debug!(enumeration = cache.name(), value = %raw, "Value matches no row");
            Ok(Resolved::Invalid(raw.clone()))
        }
    }
}
