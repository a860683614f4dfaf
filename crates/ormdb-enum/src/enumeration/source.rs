//! Row sources: where an enumeration cache loads its rows from.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::Row;
use crate::error::Error;

/// Supplies the rows of one lookup table.
///
/// `load_all` must be side-effect free and return rows in the table's natural
/// order. It may block on I/O; caches call it without holding any lock readers
/// need.
pub trait RowSource: Send + Sync {
    /// Load every row of the table.
    fn load_all(&self) -> Result<Vec<Row>, Error>;

    /// Add `delta` to a counter column of one row.
    ///
    /// Sources that cannot store counters ignore the call.
    fn persist_counter_delta(&self, row_id: i64, column: &str, delta: i64) -> Result<(), Error> {
        let _ = (row_id, column, delta);
        Ok(())
    }
}

/// In-memory lookup table.
///
/// Useful for embedding fixed enumerations and for tests: rows can be added,
/// renamed or removed at runtime, and the source can be switched offline to
/// simulate an unavailable backend.
#[derive(Debug)]
pub struct StaticRowSource {
    rows: RwLock<Vec<Row>>,
    available: AtomicBool,
    loads: AtomicU64,
    attempts: AtomicU64,
}

impl StaticRowSource {
    /// Create a source holding `rows` in the given order.
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows: RwLock::new(rows),
            available: AtomicBool::new(true),
            loads: AtomicU64::new(0),
            attempts: AtomicU64::new(0),
        }
    }

    /// Insert a row, replacing any row with the same id.
    pub fn insert(&self, row: Row) {
        let mut rows = self.rows.write();
        match rows.iter_mut().find(|r| r.id() == row.id()) {
            Some(existing) => *existing = row,
            None => rows.push(row),
        }
    }

    /// Remove a row by id. Returns true if it existed.
    pub fn remove(&self, id: i64) -> bool {
        let mut rows = self.rows.write();
        let before = rows.len();
        rows.retain(|r| r.id() != id);
        rows.len() != before
    }

    /// Get a copy of a row as currently stored.
    pub fn get(&self, id: i64) -> Option<Row> {
        self.rows.read().iter().find(|r| r.id() == id).cloned()
    }

    /// Switch the source on or off.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of `load_all` calls served so far.
    pub fn load_count(&self) -> u64 {
        self.loads.load(Ordering::SeqCst)
    }

    /// Number of `load_all` calls, including ones refused while offline.
    pub fn attempt_count(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl RowSource for StaticRowSource {
    fn load_all(&self) -> Result<Vec<Row>, Error> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if !self.available.load(Ordering::SeqCst) {
            return Err(Error::SourceUnavailable {
                table: "static".to_string(),
                reason: "source is offline".to_string(),
            });
        }
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.rows.read().clone())
    }

    fn persist_counter_delta(&self, row_id: i64, column: &str, delta: i64) -> Result<(), Error> {
        let mut rows = self.rows.write();
        let row = rows
            .iter_mut()
            .find(|r| r.id() == row_id)
            .ok_or_else(|| Error::InvalidData(format!("no row with id {row_id}")))?;
        row.add_to_counter(column, delta);
        Ok(())
    }
}

/// One table in a fixture file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixtureTable {
    /// Backing table name; derived from the type name when absent.
    #[serde(default)]
    pub table_name: Option<String>,
    /// Rows in order.
    pub rows: Vec<Row>,
}

/// A JSON document describing lookup tables, keyed by enumeration type name.
///
/// ```json
/// { "tables": { "BookingStatus": { "rows": [{ "id": 1, "name": "confirmed" }] } } }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixture {
    /// Tables by enumeration type name.
    pub tables: BTreeMap<String, FixtureTable>,
}

impl Fixture {
    /// Read and parse a fixture file.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::SourceUnavailable {
            table: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Read-only source that re-reads one table of a fixture file on every load.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
    enumeration: String,
}

impl JsonFileSource {
    /// Create a source for `enumeration` inside the fixture at `path`.
    pub fn new(path: impl Into<PathBuf>, enumeration: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            enumeration: enumeration.into(),
        }
    }
}

impl RowSource for JsonFileSource {
    fn load_all(&self) -> Result<Vec<Row>, Error> {
        let mut fixture = Fixture::load(&self.path)?;
        fixture
            .tables
            .remove(&self.enumeration)
            .map(|table| table.rows)
            .ok_or_else(|| Error::SourceUnavailable {
                table: self.enumeration.clone(),
                reason: format!("not present in {}", self.path.display()),
            })
    }
}
