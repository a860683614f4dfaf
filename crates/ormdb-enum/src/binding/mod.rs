//! Enumerated attributes on host records.
//!
//! An attribute is stored as a foreign key on the host and read back as a
//! row of the target enumeration. [`AttributeBinder`] implements the
//! read/write semantics against any [`EnumeratedHost`].

mod attribute;
mod binder;
mod host;
mod policy;
mod record;

pub use attribute::{AttributeConfig, AttributeOptions};
pub use binder::AttributeBinder;
pub use host::{EnumeratedHost, Errors, Slot, ValidationErrorKind};
pub use policy::{LookupFailure, LookupFailureFn, LookupFailurePolicy, Operation};
pub use record::Record;
