//! Recognized configuration surfaces: schedule options per
//! task, and the redline feedback-controller options. The workload file
//! that produces these structs is parsed by an external collaborator
//! (Non-goal); the structs and their defaulting rules are
//! in-scope ambient configuration surface.

use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_retry_wait_period() -> f64 {
    0.5
}

/// Per-task schedule configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub target_throughput: Option<String>,
    pub target_interval: Option<f64>,
    pub clients: usize,
    pub warmup_iterations: Option<u64>,
    pub warmup_time_period: Option<Duration>,
    pub iterations: Option<u64>,
    pub time_period: Option<Duration>,
    pub ramp_up_time_period: Option<Duration>,
    pub schedule: Option<String>,
    /// `ignore-response-error-level ∈ {non-fatal}`.
    #[serde(default)]
    pub ignore_response_error_level_non_fatal: bool,
    #[serde(default)]
    pub completes_parent: bool,
}

impl ScheduleConfig {
    /// `target-throughput` and `target-interval` are mutually exclusive;
    /// specifying both is a fatal configuration error.
    pub fn validate(&self) -> Result<(), crate::error::BenchError> {
        if self.target_throughput.is_some() && self.target_interval.is_some() {
            return Err(crate::error::BenchError::config(
                    "target-throughput and target-interval are mutually exclusive"));
        }
        Ok(())
    }
}

/// Feedback control (redline) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedlineConfig {
    pub enabled: bool,
    pub max_cpu_usage: Option<f64>,
    pub cpu_window_seconds: f64,
    pub scaleup_interval_seconds: f64,
    pub scaledown_percentage: f64,
    pub error_quiet_seconds: f64,
    /// Window used to debounce a burst of errors into a single SLEEP
    /// transition, rather than re-triggering on every error in the burst.
    pub error_debounce_seconds: f64,
    pub sleep_seconds: f64,
}

impl Default for RedlineConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_cpu_usage: None,
            cpu_window_seconds: 60.0,
            scaleup_interval_seconds: 30.0,
            scaledown_percentage: 0.5,
            error_quiet_seconds: 30.0,
            error_debounce_seconds: 5.0,
            sleep_seconds: 30.0,
        }
    }
}

/// Retry wrapper configuration defaults, read from per-request `Params`
/// rather than a static config struct , but collected here so
/// the defaulting rules live in one documented place.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryDefaults {
    #[serde(default = "default_retry_wait_period")]
    pub retry_wait_period: f64,
}

impl Default for RetryDefaults {
    fn default() -> Self {
        Self {
            retry_wait_period: default_retry_wait_period(),
        }
    }
}
