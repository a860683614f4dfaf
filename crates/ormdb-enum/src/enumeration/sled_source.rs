//! Lookup tables stored in a sled tree.

use sled::{Db, Tree};
use tracing::debug;

use super::{Row, RowSource};
use crate::error::Error;

/// Tree name prefix for lookup tables.
const TABLE_TREE_PREFIX: &str = "enum:";

/// Row source backed by a sled tree, one JSON document per row.
///
/// Keys are order-preserving encodings of the row id, so `load_all` returns
/// rows in ascending id order.
pub struct SledRowSource {
    tree: Tree,
    table_name: String,
}

impl SledRowSource {
    /// Open (or create) the tree for `table_name`.
    pub fn open(db: &Db, table_name: impl Into<String>) -> Result<Self, Error> {
        let table_name = table_name.into();
        let tree = db.open_tree(format!("{TABLE_TREE_PREFIX}{table_name}"))?;
        Ok(Self { tree, table_name })
    }

    /// Table name.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Insert or replace a row.
    pub fn insert(&self, row: &Row) -> Result<(), Error> {
        let value = serde_json::to_vec(row)?;
        self.tree.insert(encode_id(row.id()), value)?;
        Ok(())
    }

    /// Remove a row. Returns true if it existed.
    pub fn remove(&self, id: i64) -> Result<bool, Error> {
        Ok(self.tree.remove(encode_id(id))?.is_some())
    }

    /// Get a row by id straight from storage.
    pub fn get(&self, id: i64) -> Result<Option<Row>, Error> {
        match self.tree.get(encode_id(id))? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Flush pending writes to disk.
    pub fn flush(&self) -> Result<(), Error> {
        self.tree.flush()?;
        Ok(())
    }
}

impl RowSource for SledRowSource {
    fn load_all(&self) -> Result<Vec<Row>, Error> {
        let mut rows = Vec::with_capacity(self.tree.len());
        for result in self.tree.iter() {
            let (_, value) = result?;
            rows.push(serde_json::from_slice(&value)?);
        }
        Ok(rows)
    }

    /// Applied with `update_and_fetch`, so concurrent deltas on one row never
    /// lose updates. Not transactional with the host's foreign-key write.
    fn persist_counter_delta(&self, row_id: i64, column: &str, delta: i64) -> Result<(), Error> {
        let updated = self.tree.update_and_fetch(encode_id(row_id), |old| {
            let bytes = old?;
            match serde_json::from_slice::<Row>(bytes) {
                Ok(mut row) => {
                    row.add_to_counter(column, delta);
                    serde_json::to_vec(&row).ok().or_else(|| Some(bytes.to_vec()))
                }
                // Leave undecodable rows untouched
                Err(_) => Some(bytes.to_vec()),
            }
        })?;

        match updated {
            Some(_) => {
                debug!(table = %self.table_name, row_id, column, delta, "Counter updated");
                Ok(())
            }
            None => Err(Error::InvalidData(format!(
                "no row with id {} in {}",
                row_id, self.table_name
            ))),
        }
    }
}

/// Order-preserving big-endian key for a signed id.
fn encode_id(id: i64) -> [u8; 8] {
    ((id as u64) ^ (1 << 63)).to_be_bytes()
}
