//! Lookup-failure policies.

use std::fmt;
use std::sync::Arc;

use super::EnumeratedHost;
use crate::enumeration::{EnumerationCache, Row};
use crate::error::Error;
use crate::resolve::{resolve, Resolved};
use crate::value::Value;

/// Whether a failure happened while reading or writing the attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// The stored foreign key no longer matched a row.
    Read,
    /// The assigned value matched no row.
    Write,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Read => write!(f, "read"),
            Operation::Write => write!(f, "write"),
        }
    }
}

/// Everything a policy needs to react to a failed lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupFailure {
    /// Read or write.
    pub operation: Operation,
    /// Enumerated attribute name.
    pub attribute: String,
    /// Foreign key column.
    pub foreign_key: String,
    /// Target enumeration type name.
    pub target: String,
    /// The value that failed to resolve.
    pub value: Value,
}

impl LookupFailure {
    /// Convert into the error the `Raise` policy surfaces.
    pub fn into_error(self) -> Error {
        Error::Resolution {
            target: self.target,
            attribute: Some(self.attribute),
            value: self.value.to_string(),
        }
    }
}

/// Callable invoked on lookup failure.
///
/// Receives the host and the failure; whatever it does to the host is the
/// outcome of the assignment. Returning an error aborts the assignment.
pub type LookupFailureFn =
    dyn Fn(&mut dyn EnumeratedHost, &LookupFailure) -> Result<(), Error> + Send + Sync;

/// What happens when a non-empty value matches no row.
#[derive(Clone, Default)]
pub enum LookupFailurePolicy {
    /// Fail the assignment with [`Error::Resolution`].
    #[default]
    Raise,
    /// Call the host's handler of this name
    /// (see [`EnumeratedHost::handle_lookup_failure`]).
    Delegate(String),
    /// Call an external function.
    Callback(Arc<LookupFailureFn>),
    /// Record an "is invalid" error on the attribute and keep the raw value for
    /// redisplay.
    ValidationError,
    /// Assign this row (by id or name) instead.
    Default(Value),
}

impl LookupFailurePolicy {
    /// Delegate to a named host handler.
    pub fn delegate(handler: impl Into<String>) -> Self {
        LookupFailurePolicy::Delegate(handler.into())
    }

    /// Delegate to an external function.
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(&mut dyn EnumeratedHost, &LookupFailure) -> Result<(), Error> + Send + Sync + 'static,
    {
        LookupFailurePolicy::Callback(Arc::new(f))
    }

    /// Substitute a fixed row.
    pub fn default_to(value: impl Into<Value>) -> Self {
        LookupFailurePolicy::Default(value.into())
    }

    /// Short description used by reflections.
    pub fn describe(&self) -> String {
        match self {
            LookupFailurePolicy::Raise => "raise".to_string(),
            LookupFailurePolicy::Delegate(handler) => handler.clone(),
            LookupFailurePolicy::Callback(_) => "callback".to_string(),
            LookupFailurePolicy::ValidationError => "validation_error".to_string(),
            LookupFailurePolicy::Default(value) => format!("default({value})"),
        }
    }

    /// Whether the policy wants to hear about read-side faults.
    pub(crate) fn observes_reads(&self) -> bool {
        matches!(
            self,
            LookupFailurePolicy::Delegate(_) | LookupFailurePolicy::Callback(_)
        )
    }

    /// Run the policy for a failed lookup.
    pub(crate) fn apply(
        &self,
        host: &mut dyn EnumeratedHost,
        failure: LookupFailure,
        cache: &EnumerationCache,
    ) -> Result<PolicyOutcome, Error> {
        match self {
            LookupFailurePolicy::Raise => Err(failure.into_error()),
            LookupFailurePolicy::Delegate(handler) => {
                host.handle_lookup_failure(handler, &failure)?;
                Ok(PolicyOutcome::Handled)
            }
            LookupFailurePolicy::Callback(f) => {
                f(host, &failure)?;
                Ok(PolicyOutcome::Handled)
            }
            LookupFailurePolicy::ValidationError => Ok(PolicyOutcome::RetainInvalid(failure.value)),
            LookupFailurePolicy::Default(value) => match resolve(value, cache, false)? {
                Resolved::Found(row) => Ok(PolicyOutcome::Substitute(row)),
                _ => Err(Error::Resolution {
                    target: failure.target,
                    attribute: Some(failure.attribute),
                    value: value.to_string(),
                }),
            },
        }
    }
}

impl fmt::Debug for LookupFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupFailurePolicy::Raise => write!(f, "Raise"),
            LookupFailurePolicy::Delegate(handler) => f.debug_tuple("Delegate").field(handler).finish(),
            LookupFailurePolicy::Callback(_) => write!(f, "Callback(..)"),
            LookupFailurePolicy::ValidationError => write!(f, "ValidationError"),
            LookupFailurePolicy::Default(value) => f.debug_tuple("Default").field(value).finish(),
        }
    }
}

/// What the binder does after a policy ran.
#[derive(Debug)]
pub(crate) enum PolicyOutcome {
    /// The handler took care of the host; nothing more to write.
    Handled,
    /// Keep the raw value in the attribute slot and flag the attribute invalid.
    RetainInvalid(Value),
    /// Store this row instead.
    Substitute(Arc<Row>),
}
