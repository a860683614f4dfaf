//! Scope generation for enumerated attributes.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::Predicate;
use crate::binding::AttributeConfig;
use crate::enumeration::EnumerationCache;
use crate::error::Error;
use crate::resolve::{resolve, Resolved};
use crate::value::Value;

/// Builds `IN` / `NOT IN` predicates for one enumerated attribute.
#[derive(Debug, Clone)]
pub struct ScopeGenerator {
    table_name: String,
    attribute: String,
    foreign_key: String,
    target: String,
    cache: Arc<EnumerationCache>,
    permit_empty_name: bool,
}

impl ScopeGenerator {
    /// Generator for `config` on hosts stored in `table_name`.
    pub fn new(table_name: impl Into<String>, config: &AttributeConfig) -> Self {
        Self {
            table_name: table_name.into(),
            attribute: config.name.clone(),
            foreign_key: config.foreign_key.clone(),
            target: config.target.clone(),
            cache: Arc::clone(&config.cache),
            permit_empty_name: config.permit_empty_name,
        }
    }

    /// Host table.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Attribute the predicates filter on.
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Resolve every value and build the predicate.
    ///
    /// Nil and blank values put NULL in the set. Any value that matches no
    /// row fails the whole call; lookup-failure policies do not apply here.
    pub fn build_predicate(&self, values: &[Value], negate: bool) -> Result<Predicate, Error> {
        let mut ids = Vec::with_capacity(values.len());
        let mut null = false;

        for value in values {
            match resolve(value, &self.cache, self.permit_empty_name)? {
                Resolved::Found(row) => ids.push(row.id()),
                Resolved::Absent => null = true,
                Resolved::Invalid(raw) => {
                    return Err(Error::Resolution {
                        target: self.target.clone(),
                        attribute: Some(self.attribute.clone()),
                        value: raw.to_string(),
                    });
                }
            }
        }

        let predicate = Predicate::new(&self.table_name, &self.foreign_key, ids, null, negate);
        debug!(attribute = %self.attribute, predicate = %predicate, "Built scope predicate");
        Ok(predicate)
    }

    /// Hosts whose attribute is one of `values`.
    pub fn with(&self, values: &[Value]) -> Result<Predicate, Error> {
        self.build_predicate(values, false)
    }

    /// Hosts whose attribute is none of `values`.
    pub fn exclude(&self, values: &[Value]) -> Result<Predicate, Error> {
        self.build_predicate(values, true)
    }

    /// Cached ids a predicate selects, ascending. NULL keys are not listed.
    pub fn selected_ids(&self, predicate: &Predicate) -> Result<Vec<i64>, Error> {
        let snapshot = self.cache.snapshot()?;
        Ok(snapshot
            .sorted_ids()
            .into_iter()
            .filter(|id| predicate.matches(Some(*id)))
            .collect())
    }
}

/// Which side of the set a named scope selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// `with_<attr>`
    With,
    /// `exclude_<attr>`
    Exclude,
}

impl ScopeKind {
    /// Name prefix.
    pub fn prefix(&self) -> &'static str {
        match self {
            ScopeKind::With => "with",
            ScopeKind::Exclude => "exclude",
        }
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// A registered scope such as `with_status` or `exclude_statuses`.
#[derive(Debug, Clone)]
pub struct NamedScope {
    name: String,
    kind: ScopeKind,
    generator: Arc<ScopeGenerator>,
}

impl NamedScope {
    pub(crate) fn new(name: String, kind: ScopeKind, generator: Arc<ScopeGenerator>) -> Self {
        Self {
            name,
            kind,
            generator,
        }
    }

    /// Scope name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// With or exclude.
    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    /// Underlying generator.
    pub fn generator(&self) -> &ScopeGenerator {
        &self.generator
    }

    /// Build the predicate for `values`.
    pub fn call(&self, values: &[Value]) -> Result<Predicate, Error> {
        self.generator
            .build_predicate(values, self.kind == ScopeKind::Exclude)
    }
}
