//! Immutable enumeration snapshots.

use std::collections::HashMap;
use std::sync::Arc;

use super::Row;
use crate::config::NameMatching;
use crate::error::Error;

/// One published generation of a lookup table.
///
/// The row sequence and both indexes are built together and never change
/// afterwards; a cache replaces the whole snapshot on rebuild.
#[derive(Debug)]
pub struct Snapshot {
    rows: Vec<Arc<Row>>,
    by_id: HashMap<i64, usize>,
    by_name: HashMap<String, usize>,
    matching: NameMatching,
    generation: u64,
}

impl Snapshot {
    /// Build a snapshot from rows in source order.
    ///
    /// Fails if two rows share an id or a normalized name.
    pub(crate) fn build(
        enumeration: &Arc<str>,
        rows: Vec<Row>,
        matching: NameMatching,
        generation: u64,
    ) -> Result<Self, Error> {
        let mut by_id = HashMap::with_capacity(rows.len());
        let mut by_name = HashMap::with_capacity(rows.len());
        let mut published = Vec::with_capacity(rows.len());

        for (position, row) in rows.into_iter().enumerate() {
            if by_id.insert(row.id(), position).is_some() {
                return Err(Error::InvalidData(format!(
                    "duplicate id {} in {}",
                    row.id(),
                    enumeration
                )));
            }
            let key = matching.normalize(row.name()).into_owned();
            if by_name.insert(key, position).is_some() {
                return Err(Error::InvalidData(format!(
                    "duplicate name {:?} in {}",
                    row.name(),
                    enumeration
                )));
            }
            published.push(Arc::new(row.adopt(enumeration)));
        }

        Ok(Self {
            rows: published,
            by_id,
            by_name,
            matching,
            generation,
        })
    }

    /// Rows in source order.
    pub fn rows(&self) -> &[Arc<Row>] {
        &self.rows
    }

    /// Find a row by id.
    pub fn find_by_id(&self, id: i64) -> Option<&Arc<Row>> {
        self.by_id.get(&id).map(|&i| &self.rows[i])
    }

    /// Find a row by name.
    pub fn find_by_name(&self, name: &str) -> Option<&Arc<Row>> {
        let key = self.matching.normalize(name);
        self.by_name.get(key.as_ref()).map(|&i| &self.rows[i])
    }

    /// Row ids in ascending order.
    pub fn sorted_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.by_id.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Generation number (starts at 1 for the first build).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statuses() -> Vec<Row> {
        vec![
            Row::new(1, "confirmed"),
            Row::new(2, "received"),
            Row::new(3, "rejected"),
        ]
    }

    #[test]
    fn test_indexes_agree_with_rows() {
        let name: Arc<str> = Arc::from("BookingStatus");
        let snapshot = Snapshot::build(&name, statuses(), NameMatching::default(), 1).unwrap();

        assert_eq!(snapshot.len(), 3);
        for row in snapshot.rows() {
            assert_eq!(snapshot.find_by_id(row.id()), Some(row));
            assert_eq!(snapshot.find_by_name(row.name()), Some(row));
            assert_eq!(row.enumeration(), Some("BookingStatus"));
        }
    }

    #[test]
    fn test_preserves_source_order() {
        let name: Arc<str> = Arc::from("BookingStatus");
        let rows = vec![Row::new(3, "rejected"), Row::new(1, "confirmed")];
        let snapshot = Snapshot::build(&name, rows, NameMatching::default(), 1).unwrap();

        let names: Vec<&str> = snapshot.rows().iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["rejected", "confirmed"]);
        assert_eq!(snapshot.sorted_ids(), vec![1, 3]);
    }

    #[test]
    fn test_case_insensitive_names() {
        let name: Arc<str> = Arc::from("State");
        let rows = vec![Row::new(1, "FL"), Row::new(2, "IL")];
        let snapshot = Snapshot::build(&name, rows, NameMatching::CaseInsensitive, 1).unwrap();

        assert_eq!(snapshot.find_by_name("fl").map(|r| r.id()), Some(1));
        assert_eq!(snapshot.find_by_name("Il").map(|r| r.id()), Some(2));

        let rows = vec![Row::new(1, "FL")];
        let exact = Snapshot::build(&name, rows, NameMatching::Exact, 1).unwrap();
        assert!(exact.find_by_name("fl").is_none());
    }

    #[test]
    fn test_duplicates_rejected() {
        let name: Arc<str> = Arc::from("State");

        let dup_id = vec![Row::new(1, "FL"), Row::new(1, "IL")];
        assert!(matches!(
            Snapshot::build(&name, dup_id, NameMatching::default(), 1),
            Err(Error::InvalidData(_))
        ));

        let dup_name = vec![Row::new(1, "FL"), Row::new(2, "fl")];
        assert!(matches!(
            Snapshot::build(&name, dup_name, NameMatching::CaseInsensitive, 1),
            Err(Error::InvalidData(_))
        ));
    }
}
