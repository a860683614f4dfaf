//! Lookup table rows.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// One record of a lookup table.
///
/// Rows are immutable once a cache has published them. Two rows are equal when
/// they carry the same id and belong to the same enumeration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Row {
    id: i64,
    name: String,
    /// Additional columns (descriptions, counters, ...).
    #[serde(flatten)]
    extra: BTreeMap<String, serde_json::Value>,
    /// Enumeration that published this row.
    #[serde(skip)]
    enumeration: Option<Arc<str>>,
}

impl Row {
    /// Create a row with no extra columns.
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            extra: BTreeMap::new(),
            enumeration: None,
        }
    }

    /// Add an extra column.
    pub fn with_extra(mut self, column: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extra.insert(column.into(), value.into());
        self
    }

    /// Row id (primary key of the lookup table).
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Row name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All extra columns.
    pub fn extra(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.extra
    }

    /// Get an extra column.
    pub fn get(&self, column: &str) -> Option<&serde_json::Value> {
        self.extra.get(column)
    }

    /// Name of the enumeration this row was published by, if any.
    pub fn enumeration(&self) -> Option<&str> {
        self.enumeration.as_deref()
    }

    /// Stamp the owning enumeration. Only called before publication.
    pub(crate) fn adopt(mut self, enumeration: &Arc<str>) -> Self {
        self.enumeration = Some(Arc::clone(enumeration));
        self
    }

    /// Add `delta` to an integer extra column, treating a missing column as 0.
    pub(crate) fn add_to_counter(&mut self, column: &str, delta: i64) {
        let current = self.extra.get(column).and_then(|v| v.as_i64()).unwrap_or(0);
        self.extra
            .insert(column.to_string(), serde_json::Value::from(current + delta));
    }
}

impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.enumeration == other.enumeration
    }
}

impl Eq for Row {}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.enumeration {
            Some(enumeration) => write!(f, "{}[{}: {}]", enumeration, self.id, self.name),
            None => write!(f, "[{}: {}]", self.id, self.name),
        }
    }
}
