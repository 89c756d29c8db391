//! The metrics store interface and an in-memory
//! implementation. Persistence of aggregated results beyond this interface
//! is explicitly out of scope ; a production
//! deployment plugs in a different `MetricsStore` impl backed by the real
//! store).

use crate::meta::Meta;
use std::time::Duration;

/// One metrics-store record, as emitted by the postprocessor for each of
/// `latency`, `service_time`, `client_processing_time`, `processing_time`
/// and `throughput`.
#[derive(Debug, Clone)]
pub struct MetricRecord {
    pub name: String,
    pub value: f64,
    pub unit: String,
    pub task: String,
    pub operation: String,
    pub operation_type: String,
    pub sample_type: crate::sample::SampleType,
    pub absolute_time: Duration,
    pub relative_time: Duration,
    pub meta_data: Meta,
}

pub trait MetricsStore: Send + Sync {
    #[allow(clippy::too_many_arguments)]
    fn put_value_cluster_level(&self, record: MetricRecord);
}

/// An in-memory `MetricsStore`, suitable for single-process runs and
/// tests. A persistent implementation living outside this crate would
/// forward to an actual OpenSearch/ other metrics cluster instead.
#[derive(Default)]
pub struct InMemoryMetricsStore {
    records: parking_lot::Mutex<Vec<MetricRecord>>,
}

impl InMemoryMetricsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<MetricRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Clone for MetricRecord {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            value: self.value,
            unit: self.unit.clone(),
            task: self.task.clone(),
            operation: self.operation.clone(),
            operation_type: self.operation_type.clone(),
            sample_type: self.sample_type,
            absolute_time: self.absolute_time,
            relative_time: self.relative_time,
            meta_data: self.meta_data.clone(),
        }
    }
}

impl MetricsStore for InMemoryMetricsStore {
    fn put_value_cluster_level(&self, record: MetricRecord) {
        self.records.lock().push(record);
    }
}
