//! Metadata registry of enumerated attributes.
//!
//! Each host type owns a private [`HostRegistry`]; the [`EnumCatalog`] maps
//! host type names to them and answers introspection queries.

mod inflect;
mod reflection;
mod registry;

pub use inflect::{foreign_key_for, pluralize, tableize};
pub use reflection::{EnumerationReflection, MacroKind};
pub use registry::{EnumCatalog, HostRegistry};
