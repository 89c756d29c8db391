//! The raw per-request [`Sample`].

use crate::ids::ClientId;
use crate::meta::Meta;
use std::time::Duration;

/// Whether a sample falls in a task's warmup window (discarded for headline
/// metrics) or its measurement window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum SampleType {
    Warmup,
    Normal,
}

/// One measurement record for one request.
///
/// Invariant: `client_processing_time <= service_time <= latency` when the
/// executor is not throughput-throttled; when throttled, `latency` also
/// includes the scheduling wait, so only `latency >= service_time` holds
///.
#[derive(Debug, Clone)]
pub struct Sample {
    pub client_id: ClientId,
    pub absolute_time: Duration,
    pub relative_time: Duration,
    pub task: String,
    pub operation: String,
    pub operation_type: String,
    pub sample_type: SampleType,
    pub request_meta_data: Meta,
    pub latency: Duration,
    pub service_time: Duration,
    pub client_processing_time: Duration,
    pub processing_time: Duration,
    pub throughput_override: Option<f64>,
    pub total_ops: f64,
    pub total_ops_unit: String,
    pub time_period: Duration,
    pub percent_completed: Option<f64>,
    pub dependent_timings: Vec<DependentTiming>,
}

/// A timing entry surfaced by a composite runner for one of its inner
/// sub-streams.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DependentTiming {
    pub operation: String,
    pub operation_type: String,
    pub absolute_time: Duration,
    pub relative_time: Duration,
    pub service_time: Duration,
}
