//! Lookup table enumerations.
//!
//! An enumeration is the full, ordered set of rows of one small lookup table,
//! cached in memory and rebuilt wholesale when the table changes.

mod cache;
mod row;
mod sled_source;
mod snapshot;
mod source;

pub use cache::{CacheStats, EnumerationCache, RowChange};
pub use row::Row;
pub use sled_source::SledRowSource;
pub use snapshot::Snapshot;
pub use source::{Fixture, FixtureTable, JsonFileSource, RowSource, StaticRowSource};
