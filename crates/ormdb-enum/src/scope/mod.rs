//! Query scopes over enumerated attributes.

mod generator;
mod predicate;

pub use generator::{NamedScope, ScopeGenerator, ScopeKind};
pub use predicate::Predicate;
