//! Attribute binder: get/set semantics for one enumerated attribute.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use super::policy::PolicyOutcome;
use super::{
    AttributeConfig, EnumeratedHost, LookupFailure, Operation, Slot, ValidationErrorKind,
};
use crate::enumeration::{EnumerationCache, Row};
use crate::error::{ConsistencyFault, Error};
use crate::resolve::{resolve, Resolved};
use crate::value::Value;

/// Binds a host's foreign key column to an enumeration.
///
/// Shared by every record of the host type. Holds no per-record state; the
/// foreign key and slot live on the host.
#[derive(Debug)]
pub struct AttributeBinder {
    config: AttributeConfig,
    faults: AtomicU64,
}

impl AttributeBinder {
    /// Create a binder from a built configuration.
    pub fn new(config: AttributeConfig) -> Self {
        Self {
            config,
            faults: AtomicU64::new(0),
        }
    }

    /// Attribute configuration.
    pub fn config(&self) -> &AttributeConfig {
        &self.config
    }

    /// Attribute name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Foreign key column.
    pub fn foreign_key(&self) -> &str {
        &self.config.foreign_key
    }

    /// Target enumeration cache.
    pub fn cache(&self) -> &Arc<EnumerationCache> {
        &self.config.cache
    }

    /// Number of consistency faults seen on reads.
    pub fn faults(&self) -> u64 {
        self.faults.load(Ordering::Relaxed)
    }

    /// Read the attribute.
    ///
    /// Returns the row for the stored foreign key, `Null` when the key is
    /// unset, or the rejected raw value while a validation error is pending.
    /// A stored key with no row reads as `Null` and is reported as a
    /// [`ConsistencyFault`] instead of failing the read.
    pub fn get(&self, host: &mut dyn EnumeratedHost) -> Result<Value, Error> {
        let fk = host.foreign_key(&self.config.foreign_key);

        match host.slot(&self.config.name) {
            Some(Slot::Invalid(raw)) => return Ok(raw.clone()),
            Some(Slot::Resolved(row)) if Some(row.id()) == fk => {
                return Ok(Value::Row(Arc::clone(row)));
            }
            _ => {}
        }

        let Some(id) = fk else {
            host.set_slot(&self.config.name, None);
            return Ok(Value::Null);
        };

        match self.lookup_stored(id)? {
            Some(row) => {
                host.set_slot(&self.config.name, Some(Slot::Resolved(Arc::clone(&row))));
                Ok(Value::Row(row))
            }
            None => {
                self.report_fault(host, id);
                host.set_slot(&self.config.name, None);
                Ok(Value::Null)
            }
        }
    }

    /// Read the attribute as a row, ignoring any pending invalid value.
    pub fn row(&self, host: &mut dyn EnumeratedHost) -> Result<Option<Arc<Row>>, Error> {
        Ok(self.get(host)?.into_row())
    }

    /// Assign the attribute.
    ///
    /// Nil and blank values clear the foreign key under every policy. Values
    /// that match no row go through the configured
    /// [`LookupFailurePolicy`](super::LookupFailurePolicy).
    pub fn set(&self, host: &mut dyn EnumeratedHost, raw: impl Into<Value>) -> Result<(), Error> {
        let raw = raw.into();
        let previous = host.foreign_key(&self.config.foreign_key);

        match resolve(&raw, &self.config.cache, self.config.permit_empty_name)? {
            Resolved::Found(row) => {
                self.store(host, Some(row), previous);
                Ok(())
            }
            Resolved::Absent => {
                self.store(host, None, previous);
                Ok(())
            }
            Resolved::Invalid(raw) => {
                debug!(
                    host_type = %self.config.host_type,
                    attribute = %self.config.name,
                    value = %raw,
                    policy = %self.config.on_lookup_failure.describe(),
                    "Lookup failure on write"
                );
                let failure = self.failure(Operation::Write, raw);
                match self
                    .config
                    .on_lookup_failure
                    .apply(&mut *host, failure, &self.config.cache)?
                {
                    PolicyOutcome::Handled => {}
                    PolicyOutcome::RetainInvalid(raw) => {
                        host.set_slot(&self.config.name, Some(Slot::Invalid(raw)));
                        host.errors_mut()
                            .add(&self.config.name, ValidationErrorKind::Invalid);
                    }
                    PolicyOutcome::Substitute(row) => self.store(host, Some(row), previous),
                }
                Ok(())
            }
        }
    }

    /// Assign the declared default to a record whose foreign key is unset.
    pub fn apply_default(&self, host: &mut dyn EnumeratedHost) -> Result<(), Error> {
        let Some(default) = &self.config.default_value else {
            return Ok(());
        };
        if host.foreign_key(&self.config.foreign_key).is_some() || host.slot(&self.config.name).is_some() {
            return Ok(());
        }
        self.set(host, default.clone())
    }

    /// Re-check the attribute. Returns false (and records "is invalid") while
    /// the slot holds an unresolved value.
    pub fn validate(&self, host: &mut dyn EnumeratedHost) -> bool {
        host.errors_mut()
            .remove(&self.config.name, ValidationErrorKind::Invalid);
        if let Some(Slot::Invalid(_)) = host.slot(&self.config.name) {
            host.errors_mut()
                .add(&self.config.name, ValidationErrorKind::Invalid);
            return false;
        }
        true
    }

    /// Write the foreign key and cached row, clearing any pending invalid value.
    fn store(&self, host: &mut dyn EnumeratedHost, row: Option<Arc<Row>>, previous: Option<i64>) {
        let next = row.as_ref().map(|r| r.id());
        host.set_foreign_key(&self.config.foreign_key, next);
        host.set_slot(&self.config.name, row.map(Slot::Resolved));
        host.errors_mut()
            .remove(&self.config.name, ValidationErrorKind::Invalid);

        if previous != next {
            self.adjust_counters(previous, next);
        }
    }

    /// Best-effort counter maintenance on the lookup rows.
    fn adjust_counters(&self, previous: Option<i64>, next: Option<i64>) {
        let Some(column) = &self.config.counter_cache_column else {
            return;
        };
        let source = self.config.cache.source();
        let deltas = [(previous, -1), (next, 1)];
        for (id, delta) in deltas {
            let Some(id) = id else { continue };
            if let Err(e) = source.persist_counter_delta(id, column, delta) {
                warn!(
                    target_type = %self.config.target,
                    row_id = id,
                    column = %column,
                    error = %e,
                    "Counter cache update failed"
                );
            }
        }
    }

    /// Look up a stored id, rebuilding once on a miss unless a failed rebuild
    /// is still inside its retry window.
    fn lookup_stored(&self, id: i64) -> Result<Option<Arc<Row>>, Error> {
        let cache = &self.config.cache;
        if let Some(row) = cache.find_by_id(id)? {
            return Ok(Some(row));
        }
        if !cache.config().refresh_on_miss || cache.is_rebuild_deferred() {
            return Ok(None);
        }
        Ok(cache.refresh()?.find_by_id(id).cloned())
    }

    fn report_fault(&self, host: &mut dyn EnumeratedHost, id: i64) {
        self.faults.fetch_add(1, Ordering::Relaxed);
        let fault = ConsistencyFault {
            host_type: host.host_type().to_string(),
            attribute: self.config.name.clone(),
            foreign_key: self.config.foreign_key.clone(),
            target: self.config.target.clone(),
            id,
        };
        warn!(fault = %fault, "Stored foreign key has no lookup row");
        host.record_fault(fault);

        if self.config.on_lookup_failure.observes_reads() {
            let failure = self.failure(Operation::Read, Value::Int(id));
            if let Err(e) = self
                .config
                .on_lookup_failure
                .apply(&mut *host, failure, &self.config.cache)
            {
                warn!(error = %e, attribute = %self.config.name, "Read failure handler failed");
            }
        }
    }

    fn failure(&self, operation: Operation, value: Value) -> LookupFailure {
        LookupFailure {
            operation,
            attribute: self.config.name.clone(),
            foreign_key: self.config.foreign_key.clone(),
            target: self.config.target.clone(),
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{AttributeOptions, LookupFailurePolicy, Record};
    use crate::enumeration::StaticRowSource;

    fn statuses() -> Arc<StaticRowSource> {
        Arc::new(StaticRowSource::new(vec![
            Row::new(1, "confirmed"),
            Row::new(2, "received"),
            Row::new(3, "rejected"),
        ]))
    }

    fn binder_with(options: impl FnOnce(AttributeOptions) -> AttributeOptions) -> AttributeBinder {
        let cache = Arc::new(EnumerationCache::new("BookingStatus", statuses()));
        let config = options(AttributeOptions::new("status", cache))
            .build("Booking")
            .unwrap();
        AttributeBinder::new(config)
    }

    #[test]
    fn test_set_and_get_by_each_form() {
        let binder = binder_with(|o| o);
        let mut booking = Record::new("Booking");

        for input in [Value::sym("confirmed"), Value::from("confirmed"), Value::Int(1)] {
            binder.set(&mut booking, input).unwrap();
            let row = binder.row(&mut booking).unwrap().unwrap();
            assert_eq!(row.name(), "confirmed");
            assert_eq!(booking.foreign_key("status_id"), Some(1));
        }
    }

    #[test]
    fn test_unset_reads_nil() {
        let binder = binder_with(|o| o);
        let mut booking = Record::new("Booking");
        assert_eq!(binder.get(&mut booking).unwrap(), Value::Null);
    }

    #[test]
    fn test_raise_policy() {
        let binder = binder_with(|o| o);
        let mut booking = Record::new("Booking");
        binder.set(&mut booking, 2).unwrap();

        let err = binder.set(&mut booking, Value::sym("foo")).unwrap_err();
        assert!(err.is_resolution());
        // Unchanged
        assert_eq!(booking.foreign_key("status_id"), Some(2));
    }

    #[test]
    fn test_nil_and_blank_clear_under_every_policy() {
        let policies = vec![
            LookupFailurePolicy::Raise,
            LookupFailurePolicy::delegate("handler"),
            LookupFailurePolicy::callback(|_, _| panic!("must not be called")),
            LookupFailurePolicy::ValidationError,
            LookupFailurePolicy::default_to(1),
        ];
        for policy in policies {
            let binder = binder_with(|o| o.on_lookup_failure(policy));
            let mut booking = Record::new("Booking");

            binder.set(&mut booking, Value::sym("rejected")).unwrap();
            binder.set(&mut booking, Value::Null).unwrap();
            assert_eq!(booking.foreign_key("status_id"), None);
            assert_eq!(binder.get(&mut booking).unwrap(), Value::Null);

            binder.set(&mut booking, Value::sym("rejected")).unwrap();
            binder.set(&mut booking, "").unwrap();
            assert_eq!(booking.foreign_key("status_id"), None);
            assert!(booking.is_valid());
        }
    }

    #[test]
    fn test_validation_error_policy() {
        let binder = binder_with(|o| o.on_lookup_failure(LookupFailurePolicy::ValidationError));
        let mut booking = Record::new("Booking");

        binder.set(&mut booking, Value::sym("XXX")).unwrap();
        assert!(!booking.is_valid());
        assert_eq!(booking.errors().on("status"), ["is invalid".to_string()]);
        assert_eq!(binder.get(&mut booking).unwrap(), Value::sym("XXX"));
        assert!(!binder.validate(&mut booking));

        binder.set(&mut booking, Value::sym("received")).unwrap();
        assert!(binder.validate(&mut booking));
        assert!(booking.is_valid());
        assert_eq!(binder.row(&mut booking).unwrap().unwrap().id(), 2);
    }

    #[test]
    fn test_validation_error_with_permit_empty_name() {
        let binder = binder_with(|o| {
            o.on_lookup_failure(LookupFailurePolicy::ValidationError)
                .permit_empty_name(true)
        });
        let mut booking = Record::new("Booking");

        binder.set(&mut booking, "").unwrap();
        assert!(!booking.is_valid());
        assert_eq!(binder.get(&mut booking).unwrap(), Value::from(""));
    }

    #[test]
    fn test_default_policy_substitutes() {
        let binder = binder_with(|o| o.on_lookup_failure(LookupFailurePolicy::default_to(Value::sym("received"))));
        let mut booking = Record::new("Booking");

        binder.set(&mut booking, "bogus").unwrap();
        assert_eq!(booking.foreign_key("status_id"), Some(2));

        let broken = binder_with(|o| o.on_lookup_failure(LookupFailurePolicy::default_to(99)));
        assert!(broken.set(&mut booking, "bogus").unwrap_err().is_resolution());
    }

    #[test]
    fn test_callback_policy() {
        let binder = binder_with(|o| {
            o.on_lookup_failure(LookupFailurePolicy::callback(|host, failure| {
                assert_eq!(failure.value, Value::from("bad_status"));
                host.set_foreign_key("status_id", Some(3));
                Ok(())
            }))
        });
        let mut booking = Record::new("Booking");

        binder.set(&mut booking, "bad_status").unwrap();
        assert_eq!(booking.foreign_key("status_id"), Some(3));
    }

    #[test]
    fn test_delegate_without_handler_fails() {
        let binder = binder_with(|o| o.on_lookup_failure(LookupFailurePolicy::delegate("nope")));
        let mut booking = Record::new("Booking");
        assert!(matches!(
            binder.set(&mut booking, "bad_status"),
            Err(Error::UnknownHandler(_))
        ));
    }

    #[test]
    fn test_dangling_foreign_key_reads_nil_with_fault() {
        let source = statuses();
        let cache = Arc::new(EnumerationCache::new("BookingStatus", source.clone()));
        let binder = AttributeBinder::new(AttributeOptions::new("status", cache).build("Booking").unwrap());
        let mut booking = Record::new("Booking").with_foreign_key("status_id", Some(7));

        assert_eq!(binder.get(&mut booking).unwrap(), Value::Null);
        assert_eq!(binder.faults(), 1);
        assert_eq!(booking.faults().len(), 1);
        assert_eq!(booking.faults()[0].id, 7);
        // Initial build plus one refresh
        assert_eq!(source.load_count(), 2);
    }

    #[test]
    fn test_dangling_reads_during_outage_skip_refresh() {
        let source = statuses();
        let cache = Arc::new(EnumerationCache::new("BookingStatus", source.clone()));
        cache.all().unwrap();
        let binder = AttributeBinder::new(AttributeOptions::new("status", cache.clone()).build("Booking").unwrap());

        source.set_available(false);
        cache.invalidate();
        let mut booking = Record::new("Booking").with_foreign_key("status_id", Some(7));
        for _ in 0..10 {
            assert_eq!(binder.get(&mut booking).unwrap(), Value::Null);
        }

        assert_eq!(binder.faults(), 10);
        // Initial build plus the single failed rebuild
        assert_eq!(source.attempt_count(), 2);
    }

    #[test]
    fn test_read_miss_refresh_finds_new_row() {
        let source = statuses();
        let cache = Arc::new(EnumerationCache::new("BookingStatus", source.clone()));
        cache.all().unwrap();
        let binder = AttributeBinder::new(AttributeOptions::new("status", cache).build("Booking").unwrap());

        source.insert(Row::new(4, "cancelled"));
        let mut booking = Record::new("Booking").with_foreign_key("status_id", Some(4));
        let row = binder.row(&mut booking).unwrap().unwrap();
        assert_eq!(row.name(), "cancelled");
        assert_eq!(binder.faults(), 0);
    }

    #[test]
    fn test_read_fault_notifies_handler() {
        let binder = binder_with(|o| o.on_lookup_failure(LookupFailurePolicy::delegate("seen")));
        let mut booking = Record::new("Booking")
            .with_foreign_key("status_id", Some(42))
            .with_handler("seen", |host, failure| {
                assert_eq!(failure.operation, Operation::Read);
                assert_eq!(failure.value, Value::Int(42));
                host.set_foreign_key("status_id", None);
                Ok(())
            });

        assert_eq!(binder.get(&mut booking).unwrap(), Value::Null);
        assert_eq!(booking.foreign_key("status_id"), None);
    }

    #[test]
    fn test_slot_follows_foreign_key() {
        let binder = binder_with(|o| o);
        let mut booking = Record::new("Booking");
        binder.set(&mut booking, 1).unwrap();

        // Foreign key changed behind the binder's back
        booking.set_foreign_key("status_id", Some(3));
        assert_eq!(binder.row(&mut booking).unwrap().unwrap().name(), "rejected");
    }

    #[test]
    fn test_apply_default() {
        let binder = binder_with(|o| o.default_value(Value::sym("received")));
        let mut booking = Record::new("Booking");
        binder.apply_default(&mut booking).unwrap();
        assert_eq!(booking.foreign_key("status_id"), Some(2));

        let mut existing = Record::new("Booking").with_foreign_key("status_id", Some(3));
        binder.apply_default(&mut existing).unwrap();
        assert_eq!(existing.foreign_key("status_id"), Some(3));
    }

    #[test]
    fn test_counter_cache() {
        let source = statuses();
        let cache = Arc::new(EnumerationCache::new("BookingStatus", source.clone()));
        let binder = AttributeBinder::new(
            AttributeOptions::new("status", cache)
                .counter_cache("bookings_count")
                .build("Booking")
                .unwrap(),
        );
        let count = |id| {
            source
                .get(id)
                .and_then(|r| r.get("bookings_count").and_then(|v| v.as_i64()))
                .unwrap_or(0)
        };

        let mut booking = Record::new("Booking");
        binder.set(&mut booking, 1).unwrap();
        assert_eq!(count(1), 1);

        // Reassigning the same row does not count twice
        binder.set(&mut booking, "confirmed").unwrap();
        assert_eq!(count(1), 1);

        binder.set(&mut booking, 3).unwrap();
        assert_eq!((count(1), count(3)), (0, 1));

        binder.set(&mut booking, Value::Null).unwrap();
        assert_eq!(count(3), 0);
    }
}
