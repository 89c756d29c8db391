//! Scheduling primitives: pacing ([`scheduler`]), target-throughput parsing
//! ([`throughput`]), and the fused per-client element stream
//! ([`schedule_handle`]).

pub mod schedule_handle;
pub mod scheduler;
pub mod throughput;

pub use schedule_handle::{ScheduleHandle, ScheduleItem};
pub use scheduler::{Deterministic, Poisson, Scheduler, Unthrottled};
pub use throughput::{parse_target_interval, parse_target_throughput, Throughput};

use crate::error::{BenchError, BenchResult};
use crate::task::Task;

/// Builds the [`Scheduler`] for one task from its `target_throughput`/
/// `target_interval`/`schedule_name` fields. The two
/// throughput fields are mutually exclusive (fatal configuration error if
/// both are set); with neither set, the task runs unthrottled.
pub fn build_scheduler(task: &Task, clients: usize) -> BenchResult<Box<dyn Scheduler>> {
    if task.target_throughput.is_some() && task.target_interval.is_some() {
        return Err(BenchError::config(
                "target-throughput and target-interval are mutually exclusive"));
    }

    let rate = if let Some(raw) = &task.target_throughput {
        Some(throughput::parse_target_throughput(raw).map_err(BenchError::config)?.rate)
    } else if let Some(seconds) = task.target_interval {
        let interval = throughput::parse_target_interval(seconds).map_err(BenchError::config)?;
        Some(1.0 / interval.as_secs_f64())
    } else {
        None
    };

    let scheduler: Box<dyn Scheduler> = match (task.schedule_name.as_deref(), rate) {
        (Some("unthrottled"), _) | (None, None) => Box::new(Unthrottled),
        (Some("poisson"), Some(rate)) => Box::new(Poisson::new(rate, clients)),
        (Some("poisson"), None) => {
            return Err(BenchError::config("schedule \"poisson\" requires a target-throughput or target-interval"))
        }
        (Some("deterministic") | None, Some(rate)) => Box::new(Deterministic::new(rate, clients)),
        (Some(other), _) => return Err(BenchError::config(format!("unsupported schedule \"{other}\""))),
    };
    Ok(scheduler)
}

#[cfg(test)]
mod build_scheduler_tests {
    use super::*;
    use crate::task::Operation;

    fn task(target_throughput: Option<&str>, schedule_name: Option<&str>) -> Task {
        let mut task = Task::new(
            "t",
            Operation {
                name: "t".into(),
                op_type: "noop".into(),
                params: Default::default(),
                param_source_name: None,
            },
            1);
        task.target_throughput = target_throughput.map(str::to_string);
        task.schedule_name = schedule_name.map(str::to_string);
        task
    }

    #[test]
    fn defaults_to_unthrottled_with_no_throughput_or_name() {
        assert!(build_scheduler(&task(None, None), 1).is_ok());
    }

    #[test]
    fn both_target_throughput_and_interval_is_a_config_error() {
        let mut t = task(Some("10"), None);
        t.target_interval = Some(0.1);
        assert!(matches!(build_scheduler(&t, 1), Err(BenchError::Config(_))));
    }

    #[test]
    fn poisson_without_a_rate_is_a_config_error() {
        assert!(matches!(build_scheduler(&task(None, Some("poisson")), 1), Err(BenchError::Config(_))));
    }

    #[test]
    fn unsupported_schedule_name_is_a_config_error() {
        assert!(matches!(build_scheduler(&task(Some("10"), Some("custom")), 1), Err(BenchError::Config(_))));
    }
}
