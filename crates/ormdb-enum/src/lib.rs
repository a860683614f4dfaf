//! ORMDB Enum - Cached lookup-table enumerations for host records.
//!
//! A host record stores an enumerated attribute (say `status`) as a foreign
//! key into a small lookup table. This crate caches each lookup table,
//! resolves ids, names, symbols and rows to a single [`Row`], applies a
//! configurable policy when a value matches nothing, builds deterministic
//! query predicates and keeps per-host-type metadata for introspection.

pub mod binding;
pub mod catalog;
pub mod config;
pub mod enumeration;
pub mod error;
pub mod resolve;
pub mod scope;
pub mod value;

pub use binding::{
    AttributeBinder, AttributeConfig, AttributeOptions, EnumeratedHost, Errors, LookupFailure,
    LookupFailureFn, LookupFailurePolicy, Operation, Record, Slot, ValidationErrorKind,
};
pub use catalog::{EnumCatalog, EnumerationReflection, HostRegistry, MacroKind};
pub use config::{CacheConfig, NameMatching};
pub use enumeration::{
    CacheStats, EnumerationCache, Fixture, FixtureTable, JsonFileSource, Row, RowChange,
    RowSource, SledRowSource, Snapshot, StaticRowSource,
};
pub use error::{ConsistencyFault, Error};
pub use resolve::{resolve, Resolved};
pub use scope::{NamedScope, Predicate, ScopeGenerator, ScopeKind};
pub use value::Value;
