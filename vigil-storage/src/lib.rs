//! Vigil Storage - Storage Trait and In-Memory Implementation
//!
//! Defines the storage abstraction the server and the evaluation
//! protocol run against, plus the in-memory reference implementation
//! used in production-less deployments and tests.

use std::collections::HashMap;
use std::sync::RwLock;

use vigil_core::{
    Asset, Attribute, ConditionStatus, LogEntry, Measurement, Metric, ResourceId, ServiceView,
    StorageError, Timestamp, Trigger,
};

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage abstraction over the monitoring resource hierarchy.
///
/// The reference trigger-evaluation semantics are sequential in
/// iteration order; `triggers_for_measurement` must return triggers in a
/// stable order.
pub trait Storage: Send + Sync {
    // Service views
    fn insert_service_view(&self, view: ServiceView) -> StorageResult<()>;
    fn service_view(&self, id: ResourceId) -> StorageResult<ServiceView>;
    fn delete_service_view(&self, id: ResourceId) -> StorageResult<()>;

    // Assets
    fn insert_asset(&self, asset: Asset) -> StorageResult<()>;
    fn asset(&self, id: ResourceId) -> StorageResult<Asset>;
    fn delete_asset(&self, id: ResourceId) -> StorageResult<()>;

    // Attributes
    fn insert_attribute(&self, attribute: Attribute) -> StorageResult<()>;
    fn attribute(&self, id: ResourceId) -> StorageResult<Attribute>;
    fn delete_attribute(&self, id: ResourceId) -> StorageResult<()>;

    // Metrics
    fn insert_metric(&self, metric: Metric) -> StorageResult<()>;
    fn metric(&self, id: ResourceId) -> StorageResult<Metric>;
    /// Refuses deletion while any measurement references the metric.
    fn delete_metric(&self, id: ResourceId) -> StorageResult<()>;

    // Measurements
    fn insert_measurement(&self, measurement: Measurement) -> StorageResult<()>;
    fn measurement(&self, id: ResourceId) -> StorageResult<Measurement>;
    fn update_measurement(&self, measurement: &Measurement) -> StorageResult<()>;
    fn delete_measurement(&self, id: ResourceId) -> StorageResult<()>;

    // Triggers
    fn insert_trigger(&self, trigger: Trigger) -> StorageResult<()>;
    fn trigger(&self, id: ResourceId) -> StorageResult<Trigger>;
    fn delete_trigger(&self, id: ResourceId) -> StorageResult<()>;
    /// All triggers watching the given measurement, in stable order.
    fn triggers_for_measurement(&self, measurement: ResourceId) -> StorageResult<Vec<Trigger>>;
    fn update_trigger_status(
        &self,
        id: ResourceId,
        status: ConditionStatus,
        at: Timestamp,
    ) -> StorageResult<()>;

    // Logs
    fn insert_log_entry(&self, entry: LogEntry) -> StorageResult<()>;
    fn log_entry(&self, id: ResourceId) -> StorageResult<LogEntry>;
    fn log_entries_for_trigger(&self, trigger: ResourceId) -> StorageResult<Vec<LogEntry>>;
}

// ============================================================================
// IN-MEMORY IMPLEMENTATION
// ============================================================================

#[derive(Default)]
struct Tables {
    service_views: HashMap<ResourceId, ServiceView>,
    assets: HashMap<ResourceId, Asset>,
    attributes: HashMap<ResourceId, Attribute>,
    metrics: HashMap<ResourceId, Metric>,
    measurements: HashMap<ResourceId, Measurement>,
    triggers: HashMap<ResourceId, Trigger>,
    // insertion order doubles as the stable iteration order
    trigger_order: Vec<ResourceId>,
    logs: HashMap<ResourceId, LogEntry>,
    log_order: Vec<ResourceId>,
}

/// In-memory store backed by hash maps behind a single `RwLock`.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StorageResult<std::sync::RwLockReadGuard<'_, Tables>> {
        self.tables.read().map_err(|_| StorageError::LockPoisoned)
    }

    fn write(&self) -> StorageResult<std::sync::RwLockWriteGuard<'_, Tables>> {
        self.tables.write().map_err(|_| StorageError::LockPoisoned)
    }
}

fn found<T: Clone>(
    map: &HashMap<ResourceId, T>,
    kind: &'static str,
    id: ResourceId,
) -> StorageResult<T> {
    map.get(&id)
        .cloned()
        .ok_or(StorageError::NotFound { kind, id })
}

fn remove<T>(
    map: &mut HashMap<ResourceId, T>,
    kind: &'static str,
    id: ResourceId,
) -> StorageResult<T> {
    map.remove(&id).ok_or(StorageError::NotFound { kind, id })
}

impl Storage for MemoryStore {
    fn insert_service_view(&self, view: ServiceView) -> StorageResult<()> {
        self.write()?.service_views.insert(view.id, view);
        Ok(())
    }

    fn service_view(&self, id: ResourceId) -> StorageResult<ServiceView> {
        found(&self.read()?.service_views, "serviceview", id)
    }

    fn delete_service_view(&self, id: ResourceId) -> StorageResult<()> {
        remove(&mut self.write()?.service_views, "serviceview", id).map(|_| ())
    }

    fn insert_asset(&self, asset: Asset) -> StorageResult<()> {
        self.write()?.assets.insert(asset.id, asset);
        Ok(())
    }

    fn asset(&self, id: ResourceId) -> StorageResult<Asset> {
        found(&self.read()?.assets, "asset", id)
    }

    fn delete_asset(&self, id: ResourceId) -> StorageResult<()> {
        remove(&mut self.write()?.assets, "asset", id).map(|_| ())
    }

    fn insert_attribute(&self, attribute: Attribute) -> StorageResult<()> {
        self.write()?.attributes.insert(attribute.id, attribute);
        Ok(())
    }

    fn attribute(&self, id: ResourceId) -> StorageResult<Attribute> {
        found(&self.read()?.attributes, "attribute", id)
    }

    fn delete_attribute(&self, id: ResourceId) -> StorageResult<()> {
        remove(&mut self.write()?.attributes, "attribute", id).map(|_| ())
    }

    fn insert_metric(&self, metric: Metric) -> StorageResult<()> {
        self.write()?.metrics.insert(metric.id, metric);
        Ok(())
    }

    fn metric(&self, id: ResourceId) -> StorageResult<Metric> {
        found(&self.read()?.metrics, "metric", id)
    }

    fn delete_metric(&self, id: ResourceId) -> StorageResult<()> {
        let mut tables = self.write()?;
        if tables.measurements.values().any(|m| m.metric == id) {
            return Err(StorageError::StillReferenced { kind: "metric", id });
        }
        remove(&mut tables.metrics, "metric", id).map(|_| ())
    }

    fn insert_measurement(&self, measurement: Measurement) -> StorageResult<()> {
        self.write()?.measurements.insert(measurement.id, measurement);
        Ok(())
    }

    fn measurement(&self, id: ResourceId) -> StorageResult<Measurement> {
        found(&self.read()?.measurements, "measurement", id)
    }

    fn update_measurement(&self, measurement: &Measurement) -> StorageResult<()> {
        let mut tables = self.write()?;
        if !tables.measurements.contains_key(&measurement.id) {
            return Err(StorageError::NotFound {
                kind: "measurement",
                id: measurement.id,
            });
        }
        tables.measurements.insert(measurement.id, measurement.clone());
        Ok(())
    }

    fn delete_measurement(&self, id: ResourceId) -> StorageResult<()> {
        remove(&mut self.write()?.measurements, "measurement", id).map(|_| ())
    }

    fn insert_trigger(&self, trigger: Trigger) -> StorageResult<()> {
        let mut tables = self.write()?;
        if !tables.triggers.contains_key(&trigger.id) {
            tables.trigger_order.push(trigger.id);
        }
        tables.triggers.insert(trigger.id, trigger);
        Ok(())
    }

    fn trigger(&self, id: ResourceId) -> StorageResult<Trigger> {
        found(&self.read()?.triggers, "trigger", id)
    }

    fn delete_trigger(&self, id: ResourceId) -> StorageResult<()> {
        let mut tables = self.write()?;
        remove(&mut tables.triggers, "trigger", id)?;
        tables.trigger_order.retain(|t| *t != id);
        Ok(())
    }

    fn triggers_for_measurement(&self, measurement: ResourceId) -> StorageResult<Vec<Trigger>> {
        let tables = self.read()?;
        Ok(tables
            .trigger_order
            .iter()
            .filter_map(|id| tables.triggers.get(id))
            .filter(|t| t.measurement == measurement)
            .cloned()
            .collect())
    }

    fn update_trigger_status(
        &self,
        id: ResourceId,
        status: ConditionStatus,
        at: Timestamp,
    ) -> StorageResult<()> {
        let mut tables = self.write()?;
        let trigger = tables
            .triggers
            .get_mut(&id)
            .ok_or(StorageError::NotFound { kind: "trigger", id })?;
        trigger.status = status;
        trigger.status_update_time = at;
        Ok(())
    }

    fn insert_log_entry(&self, entry: LogEntry) -> StorageResult<()> {
        let mut tables = self.write()?;
        tables.log_order.push(entry.id);
        tables.logs.insert(entry.id, entry);
        Ok(())
    }

    fn log_entry(&self, id: ResourceId) -> StorageResult<LogEntry> {
        found(&self.read()?.logs, "log", id)
    }

    fn log_entries_for_trigger(&self, trigger: ResourceId) -> StorageResult<Vec<LogEntry>> {
        let tables = self.read()?;
        Ok(tables
            .log_order
            .iter()
            .filter_map(|id| tables.logs.get(id))
            .filter(|entry| entry.trigger == trigger)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::{ColumnType, MeasurementState, ResultColumn};

    fn metric() -> Metric {
        Metric {
            id: ResourceId::new(),
            name: "latency".into(),
            annotation: None,
            result_format: vec![ResultColumn {
                name: "ms".into(),
                column_type: ColumnType::Number,
            }],
        }
    }

    fn measurement(metric: ResourceId) -> Measurement {
        Measurement {
            id: ResourceId::new(),
            name: "m".into(),
            parent: ResourceId::new(),
            metric,
            result: None,
            objective: None,
            state: MeasurementState::Pending,
        }
    }

    fn trigger(measurement: ResourceId) -> Trigger {
        Trigger {
            id: ResourceId::new(),
            name: "t".into(),
            parent: ResourceId::new(),
            measurement,
            condition: "true".into(),
            notification: None,
            guard_time: 0,
            tags: Vec::new(),
            status: ConditionStatus::False,
            status_update_time: Timestamp::now(),
        }
    }

    #[test]
    fn metric_deletion_is_refused_while_referenced() {
        let store = MemoryStore::new();
        let m = metric();
        let metric_id = m.id;
        store.insert_metric(m).unwrap();
        store.insert_measurement(measurement(metric_id)).unwrap();

        let err = store.delete_metric(metric_id).unwrap_err();
        assert!(matches!(err, StorageError::StillReferenced { .. }));
        assert!(store.metric(metric_id).is_ok());
    }

    #[test]
    fn metric_deletion_succeeds_once_unreferenced() {
        let store = MemoryStore::new();
        let m = metric();
        let metric_id = m.id;
        store.insert_metric(m).unwrap();
        let msr = measurement(metric_id);
        let msr_id = msr.id;
        store.insert_measurement(msr).unwrap();
        store.delete_measurement(msr_id).unwrap();
        store.delete_metric(metric_id).unwrap();
        assert!(store.metric(metric_id).is_err());
    }

    #[test]
    fn triggers_are_returned_in_insertion_order() {
        let store = MemoryStore::new();
        let measurement_id = ResourceId::new();
        let mut ids = Vec::new();
        for _ in 0..5 {
            let t = trigger(measurement_id);
            ids.push(t.id);
            store.insert_trigger(t).unwrap();
        }
        // a trigger on another measurement is not included
        store.insert_trigger(trigger(ResourceId::new())).unwrap();

        let got: Vec<_> = store
            .triggers_for_measurement(measurement_id)
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(got, ids);
    }

    #[test]
    fn update_trigger_status_persists() {
        let store = MemoryStore::new();
        let t = trigger(ResourceId::new());
        let id = t.id;
        store.insert_trigger(t).unwrap();
        let at = Timestamp::from_unix(12345);
        store
            .update_trigger_status(id, ConditionStatus::Error, at)
            .unwrap();
        let stored = store.trigger(id).unwrap();
        assert_eq!(stored.status, ConditionStatus::Error);
        assert_eq!(stored.status_update_time, at);
    }

    #[test]
    fn missing_resources_report_not_found() {
        let store = MemoryStore::new();
        let id = ResourceId::new();
        assert!(matches!(
            store.measurement(id).unwrap_err(),
            StorageError::NotFound { kind: "measurement", .. }
        ));
        assert!(store
            .update_measurement(&measurement(ResourceId::new()))
            .is_err());
    }

    #[test]
    fn log_entries_filter_by_trigger() {
        let store = MemoryStore::new();
        let t = trigger(ResourceId::new());
        store.insert_log_entry(LogEntry::failure(&t, "one")).unwrap();
        store.insert_log_entry(LogEntry::firing(&t, None)).unwrap();
        let other = trigger(ResourceId::new());
        store
            .insert_log_entry(LogEntry::failure(&other, "unrelated"))
            .unwrap();

        let entries = store.log_entries_for_trigger(t.id).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].error.as_deref(), Some("one"));
        assert!(entries[1].error.is_none());
    }
}
