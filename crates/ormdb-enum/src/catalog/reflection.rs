//! Association-style reflections of enumerated attributes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::binding::AttributeConfig;
use crate::error::Error;

/// Declaration macro a reflection stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MacroKind {
    /// Declared as an enumerated attribute.
    HasEnumerated,
    /// Plain belongs-to association, the shape enumerated attributes share.
    BelongsTo,
}

impl fmt::Display for MacroKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MacroKind::HasEnumerated => write!(f, "has_enumerated"),
            MacroKind::BelongsTo => write!(f, "belongs_to"),
        }
    }
}

/// Read-only description of one enumerated attribute, shaped like an
/// association reflection so join builders can treat it as one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumerationReflection {
    pub name: String,
    pub macro_kind: MacroKind,
    pub source_macro: MacroKind,
    pub host_type: String,
    pub class_name: String,
    pub table_name: String,
    pub foreign_key: String,
    pub on_lookup_failure: String,
    pub counter_cache_column: Option<String>,
    pub permit_empty_name: bool,
    pub create_scope: bool,
}

impl EnumerationReflection {
    /// Reflect an attribute configuration.
    pub fn from_config(config: &AttributeConfig) -> Self {
        Self {
            name: config.name.clone(),
            macro_kind: MacroKind::HasEnumerated,
            source_macro: MacroKind::BelongsTo,
            host_type: config.host_type.clone(),
            class_name: config.target.clone(),
            table_name: config.cache.table_name().to_string(),
            foreign_key: config.foreign_key.clone(),
            on_lookup_failure: config.on_lookup_failure.describe(),
            counter_cache_column: config.counter_cache_column.clone(),
            permit_empty_name: config.permit_empty_name,
            create_scope: config.create_scope,
        }
    }

    /// Reflection chain for join building. An enumerated attribute is never
    /// a through-association, so the chain is the reflection itself.
    pub fn chain(&self) -> Vec<&EnumerationReflection> {
        vec![self]
    }

    /// Check that the reflection can be joined on.
    pub fn check_validity(&self) -> Result<(), Error> {
        if self.foreign_key.is_empty() {
            return Err(Error::Configuration(format!(
                "{}.{} has no foreign key",
                self.host_type, self.name
            )));
        }
        if self.class_name.is_empty() {
            return Err(Error::Configuration(format!(
                "{}.{} has no target type",
                self.host_type, self.name
            )));
        }
        Ok(())
    }

    /// `INNER JOIN` of the lookup table onto `host_table`.
    pub fn join_clause(&self, host_table: &str) -> String {
        format!(
            "INNER JOIN {table} ON {table}.id = {host_table}.{fk}",
            table = self.table_name,
            fk = self.foreign_key
        )
    }
}
