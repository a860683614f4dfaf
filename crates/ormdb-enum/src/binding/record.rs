//! General-purpose host record.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::{EnumeratedHost, Errors, LookupFailure, LookupFailureFn, Slot};
use crate::error::{ConsistencyFault, Error};

/// An in-memory host record holding foreign keys and enumerated slots.
///
/// Embedders with their own model types implement [`EnumeratedHost`]
/// directly; `Record` covers everything else (fixtures, tools, tests).
#[derive(Clone, Default)]
pub struct Record {
    host_type: String,
    foreign_keys: BTreeMap<String, Option<i64>>,
    slots: HashMap<String, Slot>,
    errors: Errors,
    faults: Vec<ConsistencyFault>,
    handlers: HashMap<String, Arc<LookupFailureFn>>,
    /// Foreign key writes since the last `clear_changes`.
    changes: Vec<(String, Option<i64>)>,
}

impl Record {
    /// Create an empty record of the given host type.
    pub fn new(host_type: impl Into<String>) -> Self {
        Self {
            host_type: host_type.into(),
            ..Default::default()
        }
    }

    /// Register a named lookup-failure handler.
    pub fn with_handler<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut dyn EnumeratedHost, &LookupFailure) -> Result<(), Error> + Send + Sync + 'static,
    {
        self.handlers.insert(name.into(), Arc::new(handler));
        self
    }

    /// Set a foreign key without going through a binder (as loading from
    /// storage would).
    pub fn with_foreign_key(mut self, column: impl Into<String>, id: Option<i64>) -> Self {
        self.foreign_keys.insert(column.into(), id);
        self
    }

    /// Consistency faults seen while reading.
    pub fn faults(&self) -> &[ConsistencyFault] {
        &self.faults
    }

    /// Foreign key writes since the last `clear_changes`, oldest first.
    pub fn changes(&self) -> &[(String, Option<i64>)] {
        &self.changes
    }

    /// Forget recorded changes.
    pub fn clear_changes(&mut self) {
        self.changes.clear();
    }
}

impl EnumeratedHost for Record {
    fn host_type(&self) -> &str {
        &self.host_type
    }

    fn foreign_key(&self, column: &str) -> Option<i64> {
        self.foreign_keys.get(column).copied().flatten()
    }

    fn set_foreign_key(&mut self, column: &str, id: Option<i64>) {
        self.foreign_keys.insert(column.to_string(), id);
        self.changes.push((column.to_string(), id));
    }

    fn slot(&self, attribute: &str) -> Option<&Slot> {
        self.slots.get(attribute)
    }

    fn set_slot(&mut self, attribute: &str, slot: Option<Slot>) {
        match slot {
            Some(slot) => {
                self.slots.insert(attribute.to_string(), slot);
            }
            None => {
                self.slots.remove(attribute);
            }
        }
    }

    fn errors(&self) -> &Errors {
        &self.errors
    }

    fn errors_mut(&mut self) -> &mut Errors {
        &mut self.errors
    }

    fn record_fault(&mut self, fault: ConsistencyFault) {
        self.faults.push(fault);
    }

    fn handle_lookup_failure(&mut self, handler: &str, failure: &LookupFailure) -> Result<(), Error> {
        let f = self
            .handlers
            .get(handler)
            .cloned()
            .ok_or_else(|| Error::UnknownHandler(handler.to_string()))?;
        f(self, failure)
    }
}

impl std::fmt::Debug for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record")
            .field("host_type", &self.host_type)
            .field("foreign_keys", &self.foreign_keys)
            .field("slots", &self.slots)
            .field("errors", &self.errors)
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}
