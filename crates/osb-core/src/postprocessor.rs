//! The Sample Postprocessor (component H): converts raw
//! samples into metrics-store records, with optional downsampling.

use crate::ids::ClientId;
use crate::metrics_store::{MetricRecord, MetricsStore};
use crate::sample::Sample;
use std::collections::HashMap;

/// Runs at task completion: drains a sampler (by taking its samples),
/// downsamples the request-timing metrics, always computes throughput per
/// raw sample, and writes every record to `store`.
pub fn postprocess(samples: Vec<Sample>, downsample_factor: usize, store: &dyn MetricsStore) {
    let downsample_factor = downsample_factor.max(1);
    let mut per_client_index: HashMap<ClientId, usize> = HashMap::new();
    let mut last_absolute_time: HashMap<ClientId, std::time::Duration> = HashMap::new();

    for sample in samples {
        let index = per_client_index.entry(sample.client_id).or_insert(0);
        let take_request_metrics = *index % downsample_factor == 0;
        *index += 1;

        if take_request_metrics {
            emit(store, &sample, "latency", sample.latency.as_secs_f64() * 1000.0, "ms");
            emit(
                store,
                &sample,
                "service_time",
                sample.service_time.as_secs_f64() * 1000.0,
                "ms");
            emit(
                store,
                &sample,
                "client_processing_time",
                sample.client_processing_time.as_secs_f64() * 1000.0,
                "ms");
            emit(
                store,
                &sample,
                "processing_time",
                sample.processing_time.as_secs_f64() * 1000.0,
                "ms");
        }

        // throughput is always emitted, to preserve rate accuracy even
        // when request-level metrics are downsampled.
        let (value, unit) = match sample.throughput_override {
            Some(value) => (value, sample.total_ops_unit.clone()),
            None => {
                let previous = last_absolute_time.get(&sample.client_id).copied();
                let elapsed = previous
                .map(|prev| sample.absolute_time.saturating_sub(prev))
                .filter(|d| !d.is_zero());
                let rate = elapsed
                .map(|d| sample.total_ops / d.as_secs_f64())
                .unwrap_or(0.0);
                (rate, format!("{}/s", sample.total_ops_unit))
            }
        };
        last_absolute_time.insert(sample.client_id, sample.absolute_time);
        store.put_value_cluster_level(MetricRecord {
                name: "throughput".to_string(),
                value,
                unit,
                task: sample.task.clone(),
                operation: sample.operation.clone(),
                operation_type: sample.operation_type.clone(),
                sample_type: sample.sample_type,
                absolute_time: sample.absolute_time,
                relative_time: sample.relative_time,
                meta_data: sample.request_meta_data.clone(),
            });
    }
}

fn emit(store: &dyn MetricsStore, sample: &Sample, name: &str, value: f64, unit: &str) {
    store.put_value_cluster_level(MetricRecord {
            name: name.to_string(),
            value,
            unit: unit.to_string(),
            task: sample.task.clone(),
            operation: sample.operation.clone(),
            operation_type: sample.operation_type.clone(),
            sample_type: sample.sample_type,
            absolute_time: sample.absolute_time,
            relative_time: sample.relative_time,
            meta_data: sample.request_meta_data.clone(),
        });
}
