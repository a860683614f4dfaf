//! Output formatters for command results.

use std::collections::BTreeSet;
use std::sync::Arc;

use clap::ValueEnum;
use comfy_table::{Cell, Table};
use ormdb_enum::{EnumerationReflection, Predicate, Resolved, Row, Value};

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format
    Table,
    /// JSON format
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Trait for formatting output.
pub trait Formatter: Send + Sync {
    /// Format the rows of an enumeration.
    fn format_rows(&self, enumeration: &str, rows: &[Arc<Row>]) -> String;

    /// Format the outcome of resolving `input`.
    fn format_resolution(&self, input: &Value, resolved: &Resolved) -> String;

    /// Format a scope predicate and the cached ids it selects.
    fn format_predicate(&self, predicate: &Predicate, selected: &[i64]) -> String;

    /// Format attribute reflections.
    fn format_reflections(&self, reflections: &[EnumerationReflection]) -> String;

    /// Format an error message.
    fn format_error(&self, error: &str) -> String;
}

/// Create a formatter for the given output format.
pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Table => Box::new(TableFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
    }
}

/// Table formatter using comfy-table.
pub struct TableFormatter;

impl Formatter for TableFormatter {
    fn format_rows(&self, enumeration: &str, rows: &[Arc<Row>]) -> String {
        let extra: BTreeSet<&str> = rows
            .iter()
            .flat_map(|r| r.extra().keys().map(String::as_str))
            .collect();

        let mut table = Table::new();
        let mut headers = vec![Cell::new("id"), Cell::new("name")];
        headers.extend(extra.iter().map(Cell::new));
        table.set_header(headers);

        for row in rows {
            let mut cells = vec![Cell::new(row.id()), Cell::new(row.name())];
            for column in &extra {
                cells.push(Cell::new(row.get(column).map(format_json).unwrap_or_default()));
            }
            table.add_row(cells);
        }

        format!("{}\n{}: {} row(s)", table, enumeration, rows.len())
    }

    fn format_resolution(&self, input: &Value, resolved: &Resolved) -> String {
        match resolved {
            Resolved::Found(row) => format!("{input} -> {row}"),
            Resolved::Absent => format!("{input} -> nil (absent)"),
            Resolved::Invalid(_) => format!("{input} -> invalid"),
        }
    }

    fn format_predicate(&self, predicate: &Predicate, selected: &[i64]) -> String {
        let ids: Vec<String> = selected.iter().map(i64::to_string).collect();
        let null = if predicate.matches(None) { " + NULL" } else { "" };
        format!("{}\nselects ids: [{}]{}", predicate, ids.join(", "), null)
    }

    fn format_reflections(&self, reflections: &[EnumerationReflection]) -> String {
        let mut table = Table::new();
        table.set_header(vec![
            "attribute",
            "class_name",
            "table_name",
            "foreign_key",
            "on_lookup_failure",
            "scopes",
        ]);

        for r in reflections {
            table.add_row(vec![
                r.name.clone(),
                r.class_name.clone(),
                r.table_name.clone(),
                r.foreign_key.clone(),
                r.on_lookup_failure.clone(),
                if r.create_scope { "yes" } else { "no" }.to_string(),
            ]);
        }

        table.to_string()
    }

    fn format_error(&self, error: &str) -> String {
        format!("Error: {}", error)
    }
}

/// JSON formatter.
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format_rows(&self, _enumeration: &str, rows: &[Arc<Row>]) -> String {
        let rows: Vec<serde_json::Value> = rows.iter().map(|r| row_to_json(r)).collect();
        serde_json::to_string_pretty(&rows).unwrap_or_else(|_| "[]".to_string())
    }

    fn format_resolution(&self, input: &Value, resolved: &Resolved) -> String {
        let (result, row) = match resolved {
            Resolved::Found(row) => ("found", row_to_json(row)),
            Resolved::Absent => ("absent", serde_json::Value::Null),
            Resolved::Invalid(_) => ("invalid", serde_json::Value::Null),
        };
        serde_json::json!({
            "input": input.to_string(),
            "result": result,
            "row": row,
        })
        .to_string()
    }

    fn format_predicate(&self, predicate: &Predicate, selected: &[i64]) -> String {
        serde_json::json!({
            "sql": predicate.to_sql(),
            "predicate": predicate,
            "selected_ids": selected,
            "selects_null": predicate.matches(None),
        })
        .to_string()
    }

    fn format_reflections(&self, reflections: &[EnumerationReflection]) -> String {
        serde_json::to_string_pretty(reflections).unwrap_or_else(|_| "[]".to_string())
    }

    fn format_error(&self, error: &str) -> String {
        serde_json::json!({
            "error": error
        })
        .to_string()
    }
}

fn row_to_json(row: &Row) -> serde_json::Value {
    serde_json::to_value(row).unwrap_or(serde_json::Value::Null)
}

/// Format an extra column value for a table cell.
fn format_json(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
