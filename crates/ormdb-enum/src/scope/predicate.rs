//! Predicate IR handed to the query layer.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Inclusion (or exclusion) of a foreign key column in a set of ids.
///
/// Ids are kept sorted and deduplicated, so two predicates over the same
/// logical set render identical SQL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Predicate {
    table: String,
    column: String,
    ids: Vec<i64>,
    null: bool,
    negated: bool,
}

impl Predicate {
    /// Create a predicate. `null` puts a NULL foreign key in the set.
    pub fn new(
        table: impl Into<String>,
        column: impl Into<String>,
        mut ids: Vec<i64>,
        null: bool,
        negated: bool,
    ) -> Self {
        ids.sort_unstable();
        ids.dedup();
        Self {
            table: table.into(),
            column: column.into(),
            ids,
            null,
            negated,
        }
    }

    /// Host table the column belongs to.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Foreign key column.
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Ids in the set, ascending.
    pub fn ids(&self) -> &[i64] {
        &self.ids
    }

    /// Whether NULL is part of the set.
    pub fn includes_null(&self) -> bool {
        self.null
    }

    /// Whether the predicate selects the complement of the set.
    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// Evaluate against a foreign key value.
    pub fn matches(&self, foreign_key: Option<i64>) -> bool {
        let in_set = match foreign_key {
            Some(id) => self.ids.binary_search(&id).is_ok(),
            None => self.null,
        };
        in_set != self.negated
    }

    /// Render as a SQL boolean expression.
    pub fn to_sql(&self) -> String {
        let column = format!("{}.{}", quote_ident(&self.table), quote_ident(&self.column));
        let list = self
            .ids
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(", ");

        match (self.negated, self.ids.is_empty(), self.null) {
            (false, true, false) => "1=0".to_string(),
            (false, true, true) => format!("{column} IS NULL"),
            (false, false, false) => format!("{column} IN ({list})"),
            (false, false, true) => format!("({column} IN ({list}) OR {column} IS NULL)"),
            (true, true, false) => "1=1".to_string(),
            (true, true, true) => format!("{column} IS NOT NULL"),
            // NULL NOT IN (..) is never true, so a NULL key is already excluded.
            (true, false, true) => format!("{column} NOT IN ({list})"),
            (true, false, false) => format!("({column} NOT IN ({list}) OR {column} IS NULL)"),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}
