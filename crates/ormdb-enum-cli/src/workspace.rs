//! Loading lookup tables and host declarations from a fixture file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ormdb_enum::catalog::tableize;
use ormdb_enum::{
    AttributeOptions, CacheConfig, EnumCatalog, EnumerationCache, Fixture, JsonFileSource,
    LookupFailurePolicy, Value,
};
use serde::Deserialize;
use tracing::info;

use crate::commands::{parse_value, CommandError};

/// Host declarations section of a fixture file.
#[derive(Debug, Default, Deserialize)]
struct HostFile {
    #[serde(default)]
    hosts: BTreeMap<String, HostDecl>,
}

#[derive(Debug, Deserialize)]
struct HostDecl {
    #[serde(default)]
    table_name: Option<String>,
    #[serde(default)]
    attributes: Vec<AttributeDecl>,
}

#[derive(Debug, Deserialize)]
struct AttributeDecl {
    name: String,
    class_name: String,
    #[serde(default)]
    foreign_key: Option<String>,
    /// `raise`, `validation_error`, or the name of a host handler.
    #[serde(default)]
    on_lookup_failure: Option<String>,
    #[serde(default = "default_true")]
    create_scope: bool,
    #[serde(default)]
    permit_empty_name: bool,
    #[serde(default)]
    default: Option<serde_json::Value>,
}

fn default_true() -> bool {
    true
}

/// Caches and catalog built from one fixture file.
pub struct Workspace {
    path: PathBuf,
    caches: BTreeMap<String, Arc<EnumerationCache>>,
    catalog: EnumCatalog,
}

impl Workspace {
    /// Load `path`. Every table gets a cache reading straight from the file.
    pub fn load(path: &Path, config: CacheConfig) -> Result<Self, CommandError> {
        let fixture = Fixture::load(path)?;

        let mut caches = BTreeMap::new();
        for (name, table) in &fixture.tables {
            let source = Arc::new(JsonFileSource::new(path, name));
            let mut cache = EnumerationCache::new(name, source).with_config(config.clone());
            if let Some(table_name) = &table.table_name {
                cache = cache.with_table_name(table_name);
            }
            caches.insert(name.clone(), Arc::new(cache));
        }

        let hosts: HostFile = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        let catalog = EnumCatalog::new();
        for (host_type, decl) in hosts.hosts {
            let table_name = decl.table_name.unwrap_or_else(|| tableize(&host_type));
            catalog.define_host(&host_type, &table_name)?;
            for attribute in decl.attributes {
                let options = attribute_options(&caches, &host_type, attribute)?;
                catalog.register(&host_type, options)?;
            }
        }

        info!(
            fixture = %path.display(),
            tables = caches.len(),
            hosts = catalog.host_types().len(),
            "Loaded fixture"
        );

        Ok(Self {
            path: path.to_path_buf(),
            caches,
            catalog,
        })
    }

    /// Fixture path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cache for an enumeration type.
    pub fn cache(&self, enumeration: &str) -> Result<&Arc<EnumerationCache>, CommandError> {
        self.caches
            .get(enumeration)
            .ok_or_else(|| unknown_enumeration(enumeration, self.enumerations()))
    }

    /// Enumeration type names.
    pub fn enumerations(&self) -> impl Iterator<Item = &str> {
        self.caches.keys().map(String::as_str)
    }

    /// Catalog of declared hosts.
    pub fn catalog(&self) -> &EnumCatalog {
        &self.catalog
    }
}

fn unknown_enumeration<'a>(name: &str, known: impl Iterator<Item = &'a str>) -> CommandError {
    CommandError::UnknownEnumeration {
        name: name.to_string(),
        known: known.collect::<Vec<_>>().join(", "),
    }
}

fn attribute_options(
    caches: &BTreeMap<String, Arc<EnumerationCache>>,
    host_type: &str,
    decl: AttributeDecl,
) -> Result<AttributeOptions, CommandError> {
    let cache = caches
        .get(&decl.class_name)
        .cloned()
        .ok_or_else(|| unknown_enumeration(&decl.class_name, caches.keys().map(String::as_str)))?;

    let policy = match decl.on_lookup_failure.as_deref() {
        None | Some("raise") => LookupFailurePolicy::Raise,
        Some("validation_error") => LookupFailurePolicy::ValidationError,
        Some(handler) => LookupFailurePolicy::delegate(handler),
    };

    let default = match &decl.default {
        Some(raw) => Some(json_to_value(raw).map_err(|kind| CommandError::InvalidDefault {
            host: host_type.to_string(),
            attribute: decl.name.clone(),
            kind,
        })?),
        None => None,
    };

    let mut options = AttributeOptions::new(decl.name, cache)
        .class_name(decl.class_name)
        .on_lookup_failure(policy)
        .create_scope(decl.create_scope)
        .permit_empty_name(decl.permit_empty_name);
    if let Some(fk) = decl.foreign_key {
        options = options.foreign_key(fk);
    }
    if let Some(default) = default {
        options = options.default_value(default);
    }
    Ok(options)
}

/// Convert a JSON default into a value, or name the JSON type it cannot be.
fn json_to_value(value: &serde_json::Value) -> Result<Value, &'static str> {
    match value {
        serde_json::Value::Number(n) => n.as_i64().map(Value::Int).ok_or("a non-integer number"),
        serde_json::Value::String(s) => Ok(parse_value(s)),
        serde_json::Value::Null => Err("null"),
        serde_json::Value::Bool(_) => Err("a boolean"),
        serde_json::Value::Array(_) => Err("an array"),
        serde_json::Value::Object(_) => Err("an object"),
    }
}

/// Fixture shared by this crate's tests.
#[cfg(test)]
pub(crate) const TEST_FIXTURE: &str = r#"{
    "tables": {
        "BookingStatus": {
            "rows": [
                {"id": 1, "name": "confirmed"},
                {"id": 2, "name": "received", "color": "blue"},
                {"id": 3, "name": "rejected"}
            ]
        },
        "State": {"table_name": "us_states", "rows": [{"id": 1, "name": "FL"}]}
    },
    "hosts": {
        "Booking": {
            "attributes": [
                {"name": "status", "class_name": "BookingStatus", "on_lookup_failure": "not_found_status_handler"},
                {"name": "state", "class_name": "State", "create_scope": false, "default": ":FL"}
            ]
        }
    }
}"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_fixture() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixture.json");
        std::fs::write(&path, TEST_FIXTURE).unwrap();

        let ws = Workspace::load(&path, CacheConfig::default()).unwrap();
        assert_eq!(ws.enumerations().collect::<Vec<_>>(), ["BookingStatus", "State"]);
        assert_eq!(ws.cache("State").unwrap().table_name(), "us_states");
        assert_eq!(ws.cache("BookingStatus").unwrap().all().unwrap().len(), 3);
        assert!(ws.cache("Nope").is_err());

        let catalog = ws.catalog();
        assert!(catalog.has_scope("Booking", "with_statuses"));
        assert!(!catalog.has_scope("Booking", "with_state"));
        let state = catalog.lookup("Booking", "state").unwrap();
        assert_eq!(state.default_value, Some(Value::sym("FL")));
    }

    #[test]
    fn test_unknown_class_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixture.json");
        std::fs::write(
            &path,
            r#"{"tables": {}, "hosts": {"Booking": {"attributes": [{"name": "status", "class_name": "Missing"}]}}}"#,
        )
        .unwrap();

        assert!(matches!(
            Workspace::load(&path, CacheConfig::default()),
            Err(CommandError::UnknownEnumeration { name, .. }) if name == "Missing"
        ));
    }

    #[test]
    fn test_unknown_enumeration_lists_known_tables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixture.json");
        std::fs::write(&path, TEST_FIXTURE).unwrap();
        let ws = Workspace::load(&path, CacheConfig::default()).unwrap();

        let err = ws.cache("Nope").unwrap_err();
        assert_eq!(
            err.to_string(),
            "unknown enumeration Nope (known: BookingStatus, State)"
        );
    }

    #[test]
    fn test_default_of_wrong_json_type_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixture.json");
        for (default, kind) in [("1.5", "a non-integer number"), ("true", "a boolean"), ("[1]", "an array")] {
            std::fs::write(
                &path,
                format!(
                    r#"{{"tables": {{"State": {{"rows": [{{"id": 1, "name": "FL"}}]}}}},
                        "hosts": {{"Booking": {{"attributes": [{{"name": "state", "class_name": "State", "default": {default}}}]}}}}}}"#
                ),
            )
            .unwrap();

            match Workspace::load(&path, CacheConfig::default()) {
                Err(CommandError::InvalidDefault { host, attribute, kind: got }) => {
                    assert_eq!(host, "Booking");
                    assert_eq!(attribute, "state");
                    assert_eq!(got, kind);
                }
                other => panic!("expected InvalidDefault, got {:?}", other.err()),
            }
        }
    }

    #[test]
    fn test_json_to_value() {
        assert_eq!(json_to_value(&serde_json::json!(2)), Ok(Value::Int(2)));
        assert_eq!(json_to_value(&serde_json::json!(":FL")), Ok(Value::sym("FL")));
        assert_eq!(json_to_value(&serde_json::json!(null)), Err("null"));
    }
}
