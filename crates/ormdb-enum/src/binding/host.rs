//! The contract a host record fulfils to carry enumerated attributes.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::LookupFailure;
use crate::enumeration::Row;
use crate::error::{ConsistencyFault, Error};
use crate::value::Value;

/// Transient per-attribute state kept on a host.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    /// Row last resolved for the current foreign key.
    Resolved(Arc<Row>),
    /// Raw value that failed to resolve under the validation-error policy.
    Invalid(Value),
}

/// Kind of validation error an enumerated attribute can record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// The assigned value names no row.
    Invalid,
}

impl ValidationErrorKind {
    /// Human readable message.
    pub fn message(&self) -> &'static str {
        match self {
            ValidationErrorKind::Invalid => "is invalid",
        }
    }
}

/// Field-level validation messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Errors {
    messages: BTreeMap<String, Vec<String>>,
}

impl Errors {
    /// Create an empty error set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error against an attribute. Duplicate messages are kept once.
    pub fn add(&mut self, attribute: &str, kind: ValidationErrorKind) {
        let messages = self.messages.entry(attribute.to_string()).or_default();
        if !messages.iter().any(|m| m == kind.message()) {
            messages.push(kind.message().to_string());
        }
    }

    /// Remove one kind of error from an attribute.
    pub fn remove(&mut self, attribute: &str, kind: ValidationErrorKind) {
        if let Some(messages) = self.messages.get_mut(attribute) {
            messages.retain(|m| m != kind.message());
            if messages.is_empty() {
                self.messages.remove(attribute);
            }
        }
    }

    /// Messages recorded for an attribute.
    pub fn on(&self, attribute: &str) -> &[String] {
        self.messages.get(attribute).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All messages by attribute.
    pub fn messages(&self) -> &BTreeMap<String, Vec<String>> {
        &self.messages
    }

    /// Check if there are no errors.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Remove every error.
    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

/// A record that stores enumerated attributes as foreign keys.
///
/// The foreign key is the source of truth; slots only cache the resolved row
/// or hold a rejected raw value.
pub trait EnumeratedHost {
    /// Host type name (e.g. `Booking`).
    fn host_type(&self) -> &str;

    /// Read a foreign key column.
    fn foreign_key(&self, column: &str) -> Option<i64>;

    /// Write a foreign key column.
    fn set_foreign_key(&mut self, column: &str, id: Option<i64>);

    /// Get the slot for an attribute.
    fn slot(&self, attribute: &str) -> Option<&Slot>;

    /// Replace or clear the slot for an attribute.
    fn set_slot(&mut self, attribute: &str, slot: Option<Slot>);

    /// Validation errors.
    fn errors(&self) -> &Errors;

    /// Mutable validation errors.
    fn errors_mut(&mut self) -> &mut Errors;

    /// Called when a stored foreign key has no row.
    fn record_fault(&mut self, fault: ConsistencyFault) {
        let _ = fault;
    }

    /// Run the named lookup-failure handler.
    fn handle_lookup_failure(&mut self, handler: &str, failure: &LookupFailure) -> Result<(), Error> {
        let _ = failure;
        Err(Error::UnknownHandler(handler.to_string()))
    }

    /// Check if the host has no validation errors.
    fn is_valid(&self) -> bool {
        self.errors().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_add_and_remove() {
        let mut errors = Errors::new();
        errors.add("state", ValidationErrorKind::Invalid);
        errors.add("state", ValidationErrorKind::Invalid);

        assert_eq!(errors.on("state"), ["is invalid".to_string()]);
        assert!(errors.on("status").is_empty());
        assert!(!errors.is_empty());

        errors.remove("state", ValidationErrorKind::Invalid);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_remove_keeps_other_messages() {
        let mut errors = Errors::new();
        errors.messages.insert("state".into(), vec!["can't be blank".into()]);
        errors.add("state", ValidationErrorKind::Invalid);

        errors.remove("state", ValidationErrorKind::Invalid);
        assert_eq!(errors.on("state"), ["can't be blank".to_string()]);
    }
}
