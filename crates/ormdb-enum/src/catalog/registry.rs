//! Per-host-type registry of enumerated attributes.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use tracing::{debug, info};

use super::{pluralize, tableize, EnumerationReflection};
use crate::binding::{AttributeBinder, AttributeConfig, AttributeOptions, EnumeratedHost};
use crate::error::Error;
use crate::scope::{NamedScope, ScopeGenerator, ScopeKind};
use crate::value::Value;

static GLOBAL: Lazy<EnumCatalog> = Lazy::new(EnumCatalog::new);

/// Enumerated attributes and scopes declared on one host type.
///
/// Every host type owns its registry outright; cloning one copies the maps,
/// so later declarations on the clone never show up in the original.
#[derive(Debug, Clone)]
pub struct HostRegistry {
    host_type: String,
    table_name: String,
    attributes: Vec<Arc<AttributeBinder>>,
    by_name: HashMap<String, usize>,
    scopes: BTreeMap<String, NamedScope>,
}

impl HostRegistry {
    /// Create an empty registry.
    pub fn new(host_type: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            host_type: host_type.into(),
            table_name: table_name.into(),
            attributes: Vec::new(),
            by_name: HashMap::new(),
            scopes: BTreeMap::new(),
        }
    }

    /// Host type name.
    pub fn host_type(&self) -> &str {
        &self.host_type
    }

    /// Host table name.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Binders in declaration order.
    pub fn attributes(&self) -> &[Arc<AttributeBinder>] {
        &self.attributes
    }

    /// Binder for an attribute.
    pub fn binder(&self, name: &str) -> Option<&Arc<AttributeBinder>> {
        self.by_name.get(name).map(|&i| &self.attributes[i])
    }

    /// Scope by name.
    pub fn scope(&self, name: &str) -> Option<&NamedScope> {
        self.scopes.get(name)
    }

    /// Registered scope names, sorted.
    pub fn scope_names(&self) -> impl Iterator<Item = &str> {
        self.scopes.keys().map(String::as_str)
    }

    /// Add an attribute. Nothing is registered if any check fails.
    pub fn insert(&mut self, config: AttributeConfig) -> Result<Arc<AttributeBinder>, Error> {
        if self.by_name.contains_key(&config.name) {
            return Err(Error::Configuration(format!(
                "{}.{} is already declared",
                self.host_type, config.name
            )));
        }
        if let Some(other) = self
            .attributes
            .iter()
            .find(|b| b.foreign_key() == config.foreign_key)
        {
            return Err(Error::Configuration(format!(
                "{}.{} and {}.{} share foreign key {}",
                self.host_type,
                other.name(),
                self.host_type,
                config.name,
                config.foreign_key
            )));
        }

        let scope_names = if config.create_scope {
            scope_names_for(&config.name)
        } else {
            Vec::new()
        };
        if let Some((name, _)) = scope_names.iter().find(|(n, _)| self.scopes.contains_key(n)) {
            return Err(Error::Configuration(format!(
                "scope {name} on {} is already defined",
                self.host_type
            )));
        }

        let generator = Arc::new(ScopeGenerator::new(&self.table_name, &config));
        for (name, kind) in scope_names {
            let scope = NamedScope::new(name.clone(), kind, Arc::clone(&generator));
            self.scopes.insert(name, scope);
        }

        let binder = Arc::new(AttributeBinder::new(config));
        self.by_name
            .insert(binder.name().to_string(), self.attributes.len());
        self.attributes.push(Arc::clone(&binder));
        Ok(binder)
    }

    /// Assign declared defaults to a new host.
    pub fn initialize(&self, host: &mut dyn EnumeratedHost) -> Result<(), Error> {
        for binder in &self.attributes {
            binder.apply_default(host)?;
        }
        Ok(())
    }

    /// Re-check every attribute. Returns whether the host is valid.
    pub fn validate(&self, host: &mut dyn EnumeratedHost) -> bool {
        for binder in &self.attributes {
            binder.validate(host);
        }
        host.is_valid()
    }

    /// Copy of this registry for a subtype. Binders are rebuilt so the
    /// subtype reports its own host type.
    fn derive(&self, host_type: &str) -> Result<Self, Error> {
        let mut child = HostRegistry::new(host_type, &self.table_name);
        for binder in &self.attributes {
            let mut config = binder.config().clone();
            config.host_type = host_type.to_string();
            child.insert(config)?;
        }
        Ok(child)
    }
}

/// `with_<attr>`, `exclude_<attr>` and their plural aliases.
fn scope_names_for(attribute: &str) -> Vec<(String, ScopeKind)> {
    let plural = pluralize(attribute);
    [ScopeKind::With, ScopeKind::Exclude]
        .into_iter()
        .flat_map(|kind| {
            [
                (format!("{}_{attribute}", kind.prefix()), kind),
                (format!("{}_{plural}", kind.prefix()), kind),
            ]
        })
        .collect()
}

/// Catalog of every host type's enumerated attributes.
#[derive(Debug, Default)]
pub struct EnumCatalog {
    hosts: DashMap<String, HostRegistry>,
}

impl EnumCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide catalog.
    pub fn global() -> &'static EnumCatalog {
        &GLOBAL
    }

    /// Declare a host type stored in `table_name`.
    ///
    /// Host types declared implicitly by [`register`](Self::register) use the
    /// tableized type name.
    pub fn define_host(&self, host_type: &str, table_name: &str) -> Result<(), Error> {
        let mut entry = self
            .hosts
            .entry(host_type.to_string())
            .or_insert_with(|| HostRegistry::new(host_type, table_name));
        if entry.table_name != table_name {
            if !entry.attributes.is_empty() {
                return Err(Error::Configuration(format!(
                    "{host_type} already has attributes on table {}",
                    entry.table_name
                )));
            }
            entry.table_name = table_name.to_string();
        }
        Ok(())
    }

    /// Declare an enumerated attribute on `host_type`.
    pub fn register(
        &self,
        host_type: &str,
        options: AttributeOptions,
    ) -> Result<Arc<AttributeBinder>, Error> {
        let config = options.build(host_type)?;
        let mut entry = self
            .hosts
            .entry(host_type.to_string())
            .or_insert_with(|| HostRegistry::new(host_type, tableize(host_type)));
        let binder = entry.insert(config)?;

        info!(
            host_type = %host_type,
            attribute = %binder.name(),
            target = %binder.config().target,
            foreign_key = %binder.foreign_key(),
            "Registered enumerated attribute"
        );
        Ok(binder)
    }

    /// Seed `child` with a copy of `parent`'s attributes.
    pub fn declare_subtype(&self, child: &str, parent: &str) -> Result<(), Error> {
        let derived = match self.hosts.get(parent) {
            Some(registry) => registry.derive(child)?,
            None => HostRegistry::new(child, tableize(parent)),
        };

        match self.hosts.entry(child.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(Error::Configuration(format!(
                "{child} is already declared"
            ))),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                debug!(child = %child, parent = %parent, "Declared subtype");
                slot.insert(derived);
                Ok(())
            }
        }
    }

    /// Snapshot of a host type's registry.
    pub fn registry(&self, host_type: &str) -> Option<HostRegistry> {
        self.hosts.get(host_type).map(|r| r.clone())
    }

    /// Registered host types, sorted.
    pub fn host_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.hosts.iter().map(|e| e.key().clone()).collect();
        types.sort();
        types
    }

    /// Binder for an attribute.
    pub fn binder(&self, host_type: &str, name: &str) -> Option<Arc<AttributeBinder>> {
        self.hosts
            .get(host_type)
            .and_then(|r| r.binder(name).cloned())
    }

    /// Configuration of an attribute.
    pub fn lookup(&self, host_type: &str, name: &str) -> Option<AttributeConfig> {
        self.binder(host_type, name).map(|b| b.config().clone())
    }

    /// Same as [`lookup`](Self::lookup).
    pub fn describe(&self, host_type: &str, name: &str) -> Option<AttributeConfig> {
        self.lookup(host_type, name)
    }

    /// Every attribute configuration of a host type, in declaration order.
    pub fn all_for(&self, host_type: &str) -> Vec<AttributeConfig> {
        self.hosts
            .get(host_type)
            .map(|r| r.attributes.iter().map(|b| b.config().clone()).collect())
            .unwrap_or_default()
    }

    /// Check if `host_type` declares attribute `name`. False for a missing
    /// name or an unknown host type.
    pub fn has_enumerated<'a>(&self, host_type: &str, name: impl Into<Option<&'a str>>) -> bool {
        let Some(name) = name.into() else {
            return false;
        };
        self.hosts
            .get(host_type)
            .is_some_and(|r| r.by_name.contains_key(name))
    }

    /// Names of a host type's enumerated attributes.
    pub fn enumerated_attribute_names(&self, host_type: &str) -> BTreeSet<String> {
        self.hosts
            .get(host_type)
            .map(|r| r.by_name.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Reflection of one attribute.
    pub fn reflect_on_enumerated(&self, host_type: &str, name: &str) -> Option<EnumerationReflection> {
        self.binder(host_type, name)
            .map(|b| EnumerationReflection::from_config(b.config()))
    }

    /// Reflections of every attribute, in declaration order.
    pub fn reflect_on_all_enumerated(&self, host_type: &str) -> Vec<EnumerationReflection> {
        self.all_for(host_type)
            .iter()
            .map(EnumerationReflection::from_config)
            .collect()
    }

    /// Association-style alias of [`reflect_on_enumerated`](Self::reflect_on_enumerated).
    pub fn reflect_on_association(&self, host_type: &str, name: &str) -> Option<EnumerationReflection> {
        self.reflect_on_enumerated(host_type, name)
    }

    /// Association-style alias of
    /// [`reflect_on_all_enumerated`](Self::reflect_on_all_enumerated).
    pub fn reflect_on_all_associations(&self, host_type: &str) -> Vec<EnumerationReflection> {
        self.reflect_on_all_enumerated(host_type)
    }

    /// Assign several enumerated attributes of one host in order.
    ///
    /// Every name is checked before anything is written. Assignment stops at
    /// the first error; attributes before it keep their new values.
    pub fn assign(
        &self,
        host_type: &str,
        host: &mut dyn EnumeratedHost,
        values: &[(&str, Value)],
    ) -> Result<(), Error> {
        let registry = self
            .registry(host_type)
            .ok_or_else(|| Error::Configuration(format!("{host_type} declares no enumerated attributes")))?;
        let binders = values
            .iter()
            .map(|(name, _)| {
                registry.binder(name).cloned().ok_or_else(|| {
                    Error::Configuration(format!("{host_type} has no enumerated attribute {name}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        for (binder, (_, value)) in binders.iter().zip(values) {
            binder.set(host, value.clone())?;
        }
        Ok(())
    }

    /// Named scope such as `with_status` or `exclude_statuses`.
    pub fn scope(&self, host_type: &str, name: &str) -> Option<NamedScope> {
        self.hosts
            .get(host_type)
            .and_then(|r| r.scope(name).cloned())
    }

    /// Check if a named scope exists.
    pub fn has_scope(&self, host_type: &str, name: &str) -> bool {
        self.hosts
            .get(host_type)
            .is_some_and(|r| r.scopes.contains_key(name))
    }

    /// Assign declared defaults to a new host of `host_type`.
    pub fn initialize(&self, host_type: &str, host: &mut dyn EnumeratedHost) -> Result<(), Error> {
        match self.registry(host_type) {
            Some(registry) => registry.initialize(host),
            None => Ok(()),
        }
    }

    /// Re-check a host's enumerated attributes.
    pub fn validate(&self, host_type: &str, host: &mut dyn EnumeratedHost) -> bool {
        match self.registry(host_type) {
            Some(registry) => registry.validate(host),
            None => host.is_valid(),
        }
    }
}
