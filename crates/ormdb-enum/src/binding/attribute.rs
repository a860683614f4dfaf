//! Enumerated attribute declarations.

use std::sync::Arc;

use super::LookupFailurePolicy;
use crate::catalog::foreign_key_for;
use crate::enumeration::EnumerationCache;
use crate::error::Error;
use crate::value::Value;

/// Immutable configuration of one enumerated attribute on one host type.
///
/// Created once at declaration and shared by every record of the host type.
#[derive(Debug, Clone)]
pub struct AttributeConfig {
    /// Host type declaring the attribute.
    pub host_type: String,
    /// Attribute name (e.g. `status`).
    pub name: String,
    /// Foreign key column on the host (e.g. `status_id`).
    pub foreign_key: String,
    /// Target enumeration type name (e.g. `BookingStatus`).
    pub target: String,
    /// Cache of the target lookup table.
    pub cache: Arc<EnumerationCache>,
    /// Policy for values that match no row.
    pub on_lookup_failure: LookupFailurePolicy,
    /// Register `with_*` / `exclude_*` scopes.
    pub create_scope: bool,
    /// Look blank strings up as names instead of treating them as nil.
    pub permit_empty_name: bool,
    /// Counter column on the lookup row maintained on reassignment.
    pub counter_cache_column: Option<String>,
    /// Value assigned to new records.
    pub default_value: Option<Value>,
}

/// Builder for an enumerated attribute declaration.
#[derive(Debug, Clone)]
pub struct AttributeOptions {
    name: String,
    cache: Arc<EnumerationCache>,
    foreign_key: Option<String>,
    class_name: Option<String>,
    on_lookup_failure: LookupFailurePolicy,
    create_scope: bool,
    permit_empty_name: bool,
    counter_cache_column: Option<String>,
    default_value: Option<Value>,
}

impl AttributeOptions {
    /// Declare attribute `name` backed by `cache`.
    pub fn new(name: impl Into<String>, cache: Arc<EnumerationCache>) -> Self {
        Self {
            name: name.into(),
            cache,
            foreign_key: None,
            class_name: None,
            on_lookup_failure: LookupFailurePolicy::Raise,
            create_scope: true,
            permit_empty_name: false,
            counter_cache_column: None,
            default_value: None,
        }
    }

    /// Override the foreign key column (default `<name>_id`).
    pub fn foreign_key(mut self, column: impl Into<String>) -> Self {
        self.foreign_key = Some(column.into());
        self
    }

    /// Override the target type name (default: the cache's name).
    pub fn class_name(mut self, name: impl Into<String>) -> Self {
        self.class_name = Some(name.into());
        self
    }

    /// Set the lookup-failure policy.
    pub fn on_lookup_failure(mut self, policy: LookupFailurePolicy) -> Self {
        self.on_lookup_failure = policy;
        self
    }

    /// Set whether scopes are registered.
    pub fn create_scope(mut self, create: bool) -> Self {
        self.create_scope = create;
        self
    }

    /// Set whether blank strings are looked up as names.
    pub fn permit_empty_name(mut self, permit: bool) -> Self {
        self.permit_empty_name = permit;
        self
    }

    /// Maintain a counter column on the lookup row.
    pub fn counter_cache(mut self, column: impl Into<String>) -> Self {
        self.counter_cache_column = Some(column.into());
        self
    }

    /// Assign this value to new records.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Attribute name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Validate and freeze the declaration for `host_type`.
    pub fn build(self, host_type: &str) -> Result<AttributeConfig, Error> {
        if self.name.trim().is_empty() {
            return Err(Error::Configuration(format!(
                "enumerated attribute on {host_type} needs a name"
            )));
        }
        let foreign_key = self
            .foreign_key
            .unwrap_or_else(|| foreign_key_for(&self.name));
        if foreign_key.trim().is_empty() {
            return Err(Error::Configuration(format!(
                "{host_type}.{} has an empty foreign key",
                self.name
            )));
        }
        if foreign_key == self.name {
            return Err(Error::Configuration(format!(
                "{host_type}.{} cannot use its own name as foreign key",
                self.name
            )));
        }
        let target = self
            .class_name
            .unwrap_or_else(|| self.cache.name().to_string());
        if let Some(Value::Null) = self.default_value {
            return Err(Error::Configuration(format!(
                "{host_type}.{} default must name a row",
                self.name
            )));
        }

        Ok(AttributeConfig {
            host_type: host_type.to_string(),
            name: self.name,
            foreign_key,
            target,
            cache: self.cache,
            on_lookup_failure: self.on_lookup_failure,
            create_scope: self.create_scope,
            permit_empty_name: self.permit_empty_name,
            counter_cache_column: self.counter_cache_column,
            default_value: self.default_value,
        })
    }
}
