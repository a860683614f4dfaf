//! Subcommands and their execution.

use clap::Subcommand;
use ormdb_enum::{resolve, Value};
use thiserror::Error;

use crate::formatter::Formatter;
use crate::workspace::Workspace;

/// Command errors.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Error from the enumeration subsystem.
    #[error(transparent)]
    Enum(#[from] ormdb_enum::Error),

    /// Fixture could not be read.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Fixture is not valid JSON.
    #[error("invalid fixture: {0}")]
    Json(#[from] serde_json::Error),

    /// No table for this enumeration type.
    #[error("unknown enumeration {name} (known: {known})")]
    UnknownEnumeration { name: String, known: String },

    /// An attribute default that cannot name a row.
    #[error("{host}.{attribute} default must be an id or a name, got {kind}")]
    InvalidDefault {
        host: String,
        attribute: String,
        kind: &'static str,
    },

    /// Host type not declared in the fixture.
    #[error("unknown host type {0}")]
    UnknownHost(String),

    /// Host type has no such attribute.
    #[error("{host} has no enumerated attribute {attribute}")]
    UnknownAttribute { host: String, attribute: String },

    /// Host type has no such scope.
    #[error("{host} has no scope {scope}")]
    UnknownScope { host: String, scope: String },
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List every row of an enumeration
    List {
        /// Enumeration type (e.g. BookingStatus)
        enumeration: String,
    },

    /// Resolve a value against an enumeration
    Resolve {
        /// Enumeration type
        enumeration: String,
        /// Id, :symbol, name or nil
        value: String,
        /// Look blank values up as names
        #[arg(long)]
        permit_empty_name: bool,
    },

    /// Build the predicate of a named scope
    Scope {
        /// Host type (e.g. Booking)
        host: String,
        /// Scope name (e.g. with_statuses)
        scope: String,
        /// Values to filter on
        values: Vec<String>,
    },

    /// Describe the enumerated attributes of a host type
    Describe {
        /// Host type
        host: String,
        /// Only this attribute
        attribute: Option<String>,
    },
}

/// Parse a command-line literal: integers become ids, `:name` a symbol,
/// `nil` nothing, anything else a string.
pub fn parse_value(input: &str) -> Value {
    if input == "nil" {
        return Value::Null;
    }
    if let Ok(id) = input.parse::<i64>() {
        return Value::Int(id);
    }
    match input.strip_prefix(':') {
        Some(name) if !name.is_empty() => Value::sym(name),
        _ => Value::from(input),
    }
}

/// Execute a command and return formatted output.
pub fn execute(
    workspace: &Workspace,
    command: &Command,
    formatter: &dyn Formatter,
) -> Result<String, CommandError> {
    match command {
        Command::List { enumeration } => {
            let rows = workspace.cache(enumeration)?.all()?;
            Ok(formatter.format_rows(enumeration, &rows))
        }

        Command::Resolve {
            enumeration,
            value,
            permit_empty_name,
        } => {
            let cache = workspace.cache(enumeration)?;
            let raw = parse_value(value);
            let resolved = resolve(&raw, cache, *permit_empty_name)?;
            Ok(formatter.format_resolution(&raw, &resolved))
        }

        Command::Scope {
            host,
            scope,
            values,
        } => {
            let catalog = workspace.catalog();
            if catalog.registry(host).is_none() {
                return Err(CommandError::UnknownHost(host.clone()));
            }
            let named = catalog
                .scope(host, scope)
                .ok_or_else(|| CommandError::UnknownScope {
                    host: host.clone(),
                    scope: scope.clone(),
                })?;
            let values: Vec<Value> = values.iter().map(|v| parse_value(v)).collect();
            let predicate = named.call(&values)?;
            let selected = named.generator().selected_ids(&predicate)?;
            Ok(formatter.format_predicate(&predicate, &selected))
        }

        Command::Describe { host, attribute } => {
            let catalog = workspace.catalog();
            if catalog.registry(host).is_none() {
                return Err(CommandError::UnknownHost(host.clone()));
            }
            let reflections = match attribute {
                Some(name) => vec![catalog.reflect_on_enumerated(host, name).ok_or_else(|| {
                    CommandError::UnknownAttribute {
                        host: host.clone(),
                        attribute: name.clone(),
                    }
                })?],
                None => catalog.reflect_on_all_enumerated(host),
            };
            Ok(formatter.format_reflections(&reflections))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::{create_formatter, OutputFormat};
    use crate::workspace::TEST_FIXTURE;
    use ormdb_enum::CacheConfig;

    fn workspace() -> (tempfile::TempDir, Workspace) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixture.json");
        std::fs::write(&path, TEST_FIXTURE).unwrap();
        let ws = Workspace::load(&path, CacheConfig::default()).unwrap();
        (dir, ws)
    }

    fn run(ws: &Workspace, command: Command) -> Result<String, CommandError> {
        execute(ws, &command, &*create_formatter(OutputFormat::Json))
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("3"), Value::Int(3));
        assert_eq!(parse_value("-1"), Value::Int(-1));
        assert_eq!(parse_value(":confirmed"), Value::sym("confirmed"));
        assert_eq!(parse_value("confirmed"), Value::from("confirmed"));
        assert_eq!(parse_value(":"), Value::from(":"));
        assert_eq!(parse_value("nil"), Value::Null);
        assert_eq!(parse_value(""), Value::from(""));
    }

    #[test]
    fn test_resolve_command() {
        let (_dir, ws) = workspace();
        let out = run(
            &ws,
            Command::Resolve {
                enumeration: "BookingStatus".into(),
                value: ":Received".into(),
                permit_empty_name: false,
            },
        )
        .unwrap();
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json["result"], "found");
        assert_eq!(json["row"]["id"], 2);
        assert_eq!(json["row"]["color"], "blue");

        let out = run(
            &ws,
            Command::Resolve {
                enumeration: "BookingStatus".into(),
                value: "bogus".into(),
                permit_empty_name: false,
            },
        )
        .unwrap();
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json["result"], "invalid");
    }

    #[test]
    fn test_scope_command() {
        let (_dir, ws) = workspace();
        let out = run(
            &ws,
            Command::Scope {
                host: "Booking".into(),
                scope: "exclude_statuses".into(),
                values: vec![":confirmed".into(), "3".into()],
            },
        )
        .unwrap();
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(
            json["sql"],
            r#"("bookings"."status_id" NOT IN (1, 3) OR "bookings"."status_id" IS NULL)"#
        );
        assert_eq!(json["selected_ids"], serde_json::json!([2]));

        assert!(matches!(
            run(
                &ws,
                Command::Scope {
                    host: "Booking".into(),
                    scope: "with_state".into(),
                    values: vec![],
                },
            ),
            Err(CommandError::UnknownScope { .. })
        ));
    }

    #[test]
    fn test_describe_command() {
        let (_dir, ws) = workspace();
        let out = run(
            &ws,
            Command::Describe {
                host: "Booking".into(),
                attribute: None,
            },
        )
        .unwrap();
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 2);
        assert_eq!(json[0]["table_name"], "booking_statuses");
        assert_eq!(json[1]["table_name"], "us_states");

        assert!(matches!(
            run(
                &ws,
                Command::Describe {
                    host: "Nope".into(),
                    attribute: None,
                },
            ),
            Err(CommandError::UnknownHost(_))
        ));
    }

    #[test]
    fn test_list_unknown_enumeration() {
        let (_dir, ws) = workspace();
        assert!(matches!(
            run(&ws, Command::List { enumeration: "Nope".into() }),
            Err(CommandError::UnknownEnumeration { .. })
        ));
    }
}
