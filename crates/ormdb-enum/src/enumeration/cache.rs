//! Enumeration cache.
//!
//! Holds every row of one lookup table as an immutable [`Snapshot`]. The first
//! access builds it from the table's [`RowSource`]; `invalidate` marks it stale
//! so the next access rebuilds.
//!
//! Readers never wait on a rebuild while a snapshot exists: one caller takes the
//! rebuild gate and fetches, everyone else keeps reading the previous snapshot
//! until the new one is swapped in. Only a cold cache (no snapshot yet) makes
//! callers wait, and then for a single shared fetch.
//!
//! After a failed rebuild the stale snapshot is served without going back to
//! the source until [`CacheConfig::rebuild_retry_after`] has elapsed.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};

use super::{Row, RowSource, Snapshot};
use crate::catalog::tableize;
use crate::config::CacheConfig;
use crate::error::Error;

/// Kind of change made to a lookup table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowChange {
    /// A row was inserted.
    Created,
    /// A row was modified.
    Updated,
    /// A row was deleted.
    Destroyed,
}

/// Cache statistics.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    rebuilds: AtomicU64,
    rebuild_failures: AtomicU64,
}

impl CacheStats {
    /// Get hit count.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Get miss count.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Get the number of successful rebuilds.
    pub fn rebuilds(&self) -> u64 {
        self.rebuilds.load(Ordering::Relaxed)
    }

    /// Get the number of failed rebuilds.
    pub fn rebuild_failures(&self) -> u64 {
        self.rebuild_failures.load(Ordering::Relaxed)
    }

    /// Calculate hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits() as f64;
        let total = hits + self.misses() as f64;
        if total > 0.0 {
            hits / total
        } else {
            0.0
        }
    }

    fn record(&self, hit: bool) {
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// In-memory snapshot of every row of one lookup table.
pub struct EnumerationCache {
    /// Enumeration type name (e.g. `BookingStatus`).
    name: Arc<str>,
    /// Backing table name (e.g. `booking_statuses`).
    table_name: String,
    source: Arc<dyn RowSource>,
    config: CacheConfig,
    /// Last published snapshot.
    current: ArcSwapOption<Snapshot>,
    /// Set by `invalidate`, cleared when a rebuild starts.
    stale: AtomicBool,
    /// Held by the single caller performing a rebuild.
    rebuild_gate: Mutex<()>,
    /// No rebuild attempts before this instant (set by a failed rebuild).
    retry_at: Mutex<Option<Instant>>,
    generation: AtomicU64,
    stats: CacheStats,
}

impl EnumerationCache {
    /// Create a cache for the named enumeration backed by `source`.
    ///
    /// The table name defaults to the snake-case plural of the type name.
    pub fn new(name: impl Into<String>, source: Arc<dyn RowSource>) -> Self {
        let name: String = name.into();
        Self {
            table_name: tableize(&name),
            name: Arc::from(name),
            source,
            config: CacheConfig::default(),
            current: ArcSwapOption::empty(),
            stale: AtomicBool::new(false),
            rebuild_gate: Mutex::new(()),
            retry_at: Mutex::new(None),
            generation: AtomicU64::new(0),
            stats: CacheStats::default(),
        }
    }

    /// Override the backing table name.
    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }

    /// Set the cache configuration.
    pub fn with_config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    /// Enumeration type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Backing table name.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Row source this cache loads from.
    pub fn source(&self) -> &Arc<dyn RowSource> {
        &self.source
    }

    /// Cache statistics.
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Generation of the last published snapshot (0 before the first build).
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Check if a snapshot has been published.
    pub fn is_loaded(&self) -> bool {
        self.current.load().is_some()
    }

    /// Check if the cache has been invalidated since its last build.
    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::SeqCst)
    }

    /// Check if a recent failed rebuild is holding off further fetches.
    pub fn is_rebuild_deferred(&self) -> bool {
        matches!(*self.retry_at.lock(), Some(at) if Instant::now() < at)
    }

    /// Get the current snapshot, building or rebuilding it if needed.
    ///
    /// A failed rebuild leaves the previous snapshot in place and serves it;
    /// only a cache that has never been built returns `SourceUnavailable`.
    /// Stale reads inside the retry window do not touch the source.
    pub fn snapshot(&self) -> Result<Arc<Snapshot>, Error> {
        if let Some(current) = self.current.load_full() {
            if !self.is_stale() || self.is_rebuild_deferred() {
                return Ok(current);
            }

            // Someone else is rebuilding; keep serving the old snapshot.
            let Some(_guard) = self.rebuild_gate.try_lock() else {
                return Ok(current);
            };
            if !self.is_stale() {
                return Ok(self.current.load_full().unwrap_or(current));
            }
            return self.rebuild_locked().or_else(|e| {
                warn!(enumeration = %self.name, error = %e, "Serving stale enumeration snapshot");
                Ok(current)
            });
        }

        let _guard = self.rebuild_gate.lock();
        match self.current.load_full() {
            Some(current) if !self.is_stale() || self.is_rebuild_deferred() => Ok(current),
            Some(current) => self.rebuild_locked().or_else(|e| {
                warn!(enumeration = %self.name, error = %e, "Serving stale enumeration snapshot");
                Ok(current)
            }),
            None => self.rebuild_locked(),
        }
    }

    /// All rows in source order.
    pub fn all(&self) -> Result<Vec<Arc<Row>>, Error> {
        Ok(self.snapshot()?.rows().to_vec())
    }

    /// Find a row by id.
    pub fn find_by_id(&self, id: i64) -> Result<Option<Arc<Row>>, Error> {
        let found = self.snapshot()?.find_by_id(id).cloned();
        self.stats.record(found.is_some());
        Ok(found)
    }

    /// Find a row by name, normalized per the configured [`NameMatching`].
    ///
    /// [`NameMatching`]: crate::config::NameMatching
    pub fn find_by_name(&self, name: &str) -> Result<Option<Arc<Row>>, Error> {
        let found = self.snapshot()?.find_by_name(name).cloned();
        self.stats.record(found.is_some());
        Ok(found)
    }

    /// Check whether a row was published by this enumeration.
    ///
    /// Only checks the stamp; the row may have been deleted since.
    pub fn owns(&self, row: &Row) -> bool {
        row.enumeration() == Some(&*self.name)
    }

    /// Mark the cache stale; the next access rebuilds from the source.
    pub fn invalidate(&self) {
        self.stale.store(true, Ordering::SeqCst);
        debug!(enumeration = %self.name, "Enumeration cache invalidated");
    }

    /// Persistence hook: a row of the backing table changed.
    pub fn on_row_changed(&self, row_id: i64, change: RowChange) {
        debug!(enumeration = %self.name, row_id, ?change, "Lookup row changed");
        self.invalidate();
    }

    /// Rebuild now unless another caller published a newer snapshot while
    /// this one waited for the gate.
    ///
    /// Ignores the retry window. Falls back to the existing snapshot if the
    /// source fails.
    pub fn refresh(&self) -> Result<Arc<Snapshot>, Error> {
        let seen = self.generation();
        let _guard = self.rebuild_gate.lock();

        let current = self.current.load_full();
        if let Some(current) = &current {
            if self.generation() > seen {
                return Ok(Arc::clone(current));
            }
        }

        match (self.rebuild_locked(), current) {
            (Ok(snapshot), _) => Ok(snapshot),
            (Err(e), Some(current)) => {
                warn!(enumeration = %self.name, error = %e, "Refresh failed, keeping previous snapshot");
                Ok(current)
            }
            (Err(e), None) => Err(e),
        }
    }

    /// Fetch, index and publish. Caller holds `rebuild_gate`.
    #[instrument(skip(self), fields(enumeration = %self.name))]
    fn rebuild_locked(&self) -> Result<Arc<Snapshot>, Error> {
        // Cleared before the fetch so an invalidate during the fetch is not lost.
        self.stale.store(false, Ordering::SeqCst);

        let rows = match self.source.load_all() {
            Ok(rows) => rows,
            Err(e) => {
                self.record_failure();
                return Err(match e {
                    e @ Error::SourceUnavailable { .. } => e,
                    other => Error::SourceUnavailable {
                        table: self.table_name.clone(),
                        reason: other.to_string(),
                    },
                });
            }
        };

        let generation = self.generation() + 1;
        let snapshot = match Snapshot::build(&self.name, rows, self.config.name_matching, generation) {
            Ok(snapshot) => Arc::new(snapshot),
            Err(e) => {
                self.record_failure();
                return Err(e);
            }
        };

        self.current.store(Some(Arc::clone(&snapshot)));
        self.generation.store(generation, Ordering::SeqCst);
        *self.retry_at.lock() = None;
        self.stats.rebuilds.fetch_add(1, Ordering::Relaxed);

        info!(
            table = %self.table_name,
            rows = snapshot.len(),
            generation,
            "Enumeration cache rebuilt"
        );

        Ok(snapshot)
    }

    fn record_failure(&self) {
        self.stale.store(true, Ordering::SeqCst);
        self.stats.rebuild_failures.fetch_add(1, Ordering::Relaxed);
        *self.retry_at.lock() = Instant::now().checked_add(self.config.rebuild_retry_after);
    }
}

impl std::fmt::Debug for EnumerationCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnumerationCache")
            .field("name", &self.name)
            .field("table_name", &self.table_name)
            .field("generation", &self.generation())
            .field("stale", &self.is_stale())
            .finish()
    }
}
