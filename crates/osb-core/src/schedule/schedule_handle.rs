//! The Schedule Handle (component E): a lazy, restartable
//! sequence of `(expected_scheduled_time, sample_type, progress, runner,
//! params)` tuples, fusing a [`ParamSource`](crate::param_source::ParamSource)
//! and a [`Scheduler`] for one client.

use crate::param_source::ParamSource;
use crate::params::Params;
use crate::runner::Runner;
use crate::sample::SampleType;
use crate::schedule::scheduler::Scheduler;
use crate::task::Bound;
use std::sync::Arc;
use std::time::Duration;

/// One emitted element of a schedule handle.
pub struct ScheduleItem {
    pub expected_scheduled_time: Duration,
    pub sample_type: SampleType,
    pub progress_percent: Option<f64>,
    pub runner: Arc<dyn Runner>,
    pub params: Params,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Warmup,
    Measurement,
}

pub struct ScheduleHandle {
    scheduler: Box<dyn Scheduler>,
    param_source: Box<dyn ParamSource>,
    runner: Arc<dyn Runner>,
    warmup: Bound,
    measurement: Bound,
    ramp_up_wait_time: Duration,

    expected_time: Duration,
    warmup_issued: u64,
    measurement_issued: u64,
    measurement_phase_start: Option<Duration>,
    finished: bool,
    last_runner_completed: bool,
}

impl ScheduleHandle {
    pub fn new(
        scheduler: Box<dyn Scheduler>,
        param_source: Box<dyn ParamSource>,
        runner: Arc<dyn Runner>,
        warmup: Bound,
        measurement: Bound,
        ramp_up_wait_time: Duration) -> Self {
        Self {
            scheduler,
            param_source,
            runner,
            warmup,
            measurement,
            ramp_up_wait_time,
            expected_time: Duration::ZERO,
            warmup_issued: 0,
            measurement_issued: 0,
            measurement_phase_start: None,
            finished: false,
            last_runner_completed: false,
        }
    }

    /// Delay before the first element, staggered across clients so that
    /// within `ramp_up_time_period` all clients start linearly (the caller
    /// is responsible for computing the per-client offset; this handle
    /// just reports the value it was constructed with).
    pub fn ramp_up_wait_time(&self) -> Duration {
        self.ramp_up_wait_time
    }

    pub fn before_request(&mut self, now: Duration) {
        self.scheduler.before_request(now);
    }

    pub fn after_request(&mut self, now: Duration, weight: f64, unit: &str) {
        self.scheduler.after_request(now, weight, unit);
    }

    /// The executor calls this right after invoking the runner; a
    /// `completed = true` report stops the schedule on the following call
    /// to `next`.
    pub fn report_runner_completed(&mut self, completed: bool) {
        self.last_runner_completed = completed;
    }

    fn phase(&self) -> Phase {
        let warmup_done = match (self.warmup.iterations, self.warmup.time_period) {
            (Some(target), _) => self.warmup_issued >= target,
            (None, Some(target)) => self.expected_time >= target,
            (None, None) => true,
        };
        if warmup_done {
            Phase::Measurement
        } else {
            Phase::Warmup
        }
    }

    fn measurement_exhausted(&self, phase_start: Duration) -> bool {
        let elapsed = self.expected_time.saturating_sub(phase_start);
        match (self.measurement.iterations, self.measurement.time_period) {
            (Some(target), _) => self.measurement_issued >= target,
            (None, Some(target)) => elapsed >= target,
            (None, None) => false,
        }
    }

    fn total_iteration_target(&self) -> Option<u64> {
        match (self.warmup.iterations, self.measurement.iterations) {
            (Some(w), Some(i)) => Some(w + i),
            _ => None,
        }
    }

    /// Produces the next element, or `None` once the schedule has stopped:
    /// the parameter source signaled end-of-stream, iterations/time are
    /// exhausted (the earlier of the two),
    /// or the previous runner invocation reported `completed = true`.
    pub fn next(&mut self) -> Option<ScheduleItem> {
        if self.finished || self.last_runner_completed {
            self.finished = true;
            return None;
        }

        let phase = self.phase();
        if phase == Phase::Measurement {
            let phase_start = *self.measurement_phase_start.get_or_insert(self.expected_time);
            if self.measurement_exhausted(phase_start) {
                self.finished = true;
                return None;
            }
        }

        let params = match self.param_source.next_params() {
            Some(params) => params,
            None => {
                self.finished = true;
                return None;
            }
        };

        let sample_type = match phase {
            Phase::Warmup => SampleType::Warmup,
            Phase::Measurement => SampleType::Normal,
        };

        let progress_percent = self.total_iteration_target().map(|total| {
                let issued_before = self.warmup_issued + self.measurement_issued;
                (issued_before + 1) as f64 / total as f64
            });

        let item = ScheduleItem {
            expected_scheduled_time: self.expected_time,
            sample_type,
            progress_percent,
            runner: self.runner.clone(),
            params,
        };

        match sample_type {
            SampleType::Warmup => self.warmup_issued += 1,
            SampleType::Normal => self.measurement_issued += 1,
        }
        self.expected_time = self.scheduler.next(self.expected_time);

        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param_source::CountingParamSource;
    use crate::runner::RunnerOutcome;
    use crate::schedule::scheduler::Deterministic;

    struct NoopRunner;

    #[async_trait::async_trait]
    impl Runner for NoopRunner {
        async fn call(
            &self,
            _clients: &crate::cluster_client::ClientMap,
            _params: &Params) -> crate::error::BenchResult<RunnerOutcome> {
            Ok(RunnerOutcome::None)
        }

        fn op_type(&self) -> &str {
            "noop"
        }
    }

    #[test]
    fn seed_scenario_a_matches_spec_schedule() {
        // clients=1, iterations=5, warmup_iterations=3, target-throughput=10 ops/s
        let scheduler = Box::new(Deterministic::new(10.0, 1));
        let source = Box::new(CountingParamSource::new(8, |_| Params::new()));
        let runner: Arc<dyn Runner> = Arc::new(NoopRunner);
        let warmup = Bound {
            iterations: Some(3),
            time_period: None,
        };
        let measurement = Bound {
            iterations: Some(5),
            time_period: None,
        };
        let mut handle = ScheduleHandle::new(scheduler, source, runner, warmup, measurement, Duration::ZERO);

        let mut observed = Vec::new();
        while let Some(item) = handle.next() {
            observed.push((
                    item.expected_scheduled_time,
                    item.sample_type,
                    item.progress_percent));
        }

        let expected_times: Vec<_> = (0..8).map(|i| Duration::from_millis(i * 100)).collect();
        let observed_times: Vec<_> = observed.iter().map(|(t, _, _)| *t).collect();
        assert_eq!(observed_times, expected_times);

        for (i, (_, sample_type, progress)) in observed.iter().enumerate() {
            let expected_type = if i < 3 { SampleType::Warmup } else { SampleType::Normal };
            assert_eq!(*sample_type, expected_type, "at index {i}");
            assert_eq!(*progress, Some((i + 1) as f64 / 8.0));
        }
    }

    #[test]
    fn stops_at_the_earlier_of_param_source_exhaustion_and_iterations() {
        // finite source of size 2 but iterations=5: stop at 2.
        let scheduler = Box::new(Deterministic::new(100.0, 1));
        let source = Box::new(CountingParamSource::new(2, |_| Params::new()));
        let runner: Arc<dyn Runner> = Arc::new(NoopRunner);
        let measurement = Bound {
            iterations: Some(5),
            time_period: None,
        };
        let mut handle = ScheduleHandle::new(
            scheduler,
            source,
            runner,
            Bound::default(),
            measurement,
            Duration::ZERO);
        let mut count = 0;
        while handle.next().is_some() {
            count += 1;
        }
        assert_eq!(count, 2);
    }

    #[test]
    fn runner_completion_stops_the_schedule() {
        let scheduler = Box::new(Deterministic::new(100.0, 1));
        let source = Box::new(CountingParamSource::new(100, |_| Params::new()));
        let runner: Arc<dyn Runner> = Arc::new(NoopRunner);
        let mut handle = ScheduleHandle::new(
            scheduler,
            source,
            runner,
            Bound::default(),
            Bound::default(),
            Duration::ZERO);
        assert!(handle.next().is_some());
        handle.report_runner_completed(true);
        assert!(handle.next().is_none());
    }
}
