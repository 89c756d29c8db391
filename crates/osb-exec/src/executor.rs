//! The Async Executor (component F): the per-client
//! cooperative request loop that drives a [`ScheduleHandle`], times each
//! request, honors cancellation/completion, and applies throughput
//! throttling.

use crate::messages::{ErrorSender, FeedbackEvent, SharedClientStates};
use crate::signal::Signal;
use osb_core::cluster_client::{default_client, ClientMap};
use osb_core::error::{BenchError, BenchResult};
use osb_core::ids::ClientId;
use osb_core::meta::Meta;
use osb_core::params::Params;
use osb_core::runner::RunnerOutcome;
use osb_core::sample::Sample;
use osb_core::sampler::Sampler;
use osb_core::schedule::ScheduleHandle;
use osb_core::task::Task;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Global policy for recoverable (HTTP-level) request failures, overridden
/// per-task by `ignore-response-error-level=non-fatal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnError {
    Continue,
    Abort,
}

/// Everything one client's executor loop needs. Owns its [`ScheduleHandle`]
/// (restartable, but in practice driven to exhaustion exactly once per
/// task execution).
pub struct ExecutorConfig {
    pub client_id: ClientId,
    pub task: Task,
    pub schedule_handle: ScheduleHandle,
    pub clients: ClientMap,
    pub sampler: Arc<Sampler>,
    /// Gated by a profiling flag upstream; `None` when profiling is off.
    pub profile_sampler: Option<Arc<Sampler>>,
    pub cancel_signal: Signal,
    pub complete_signal: Signal,
    pub on_error: OnError,
    pub shared_states: SharedClientStates,
    pub error_queue: Option<ErrorSender>,
    /// Base request deadline; a per-request `request-timeout` param adds
    /// to it.
    pub base_timeout: Duration,
}

/// A running executor, as a background tokio task.
pub struct ExecutorHandle {
    join: tokio::task::JoinHandle<BenchResult<()>>,
}

impl ExecutorHandle {
    pub fn spawn(config: ExecutorConfig) -> Self {
        Self {
            join: tokio::spawn(run(config)),
        }
    }

    pub async fn join(self) -> BenchResult<()> {
        match self.join.await {
            Ok(result) => result,
            Err(join_error) if join_error.is_cancelled() => Ok(()),
            Err(join_error) => Err(BenchError::benchmark(format!("executor task panicked: {join_error}"))),
        }
    }
}

/// Runs one client's request loop to completion or cancellation.
///
/// NOTE: the original's streaming-producer factory (for corpus-backed bulk
/// bodies) is not modeled here — parameter sources that stream large
/// request bodies are a Non-goal of this crate ; every built-in operation consumes
/// fully-materialized `Params` instead.
pub async fn run(mut config: ExecutorConfig) -> BenchResult<()> {
    let ramp_up = config.schedule_handle.ramp_up_wait_time;
    tokio::select! {
        _ = config.cancel_signal.wait() => return Ok(()),
        _ = tokio::time::sleep(ramp_up) => {}
    }

    let total_start = Instant::now();

    loop {
        if config.cancel_signal.is_set() {
            break;
        }
        if config.complete_signal.is_set() && !config.task.completes_parent {
            break;
        }

        let item = match config.schedule_handle.next() {
            Some(item) => item,
            None => break,
        };

        let active = config.shared_states.is_active(config.client_id);

        let processing_start = Instant::now();
        let elapsed = processing_start.saturating_duration_since(total_start);
        let throttle_wait = item.expected_scheduled_time.saturating_sub(elapsed);
        let throttled = !throttle_wait.is_zero();
        if throttled {
            tokio::select! {
                _ = config.cancel_signal.wait() => break,
                _ = tokio::time::sleep(throttle_wait) => {}
            }
        }

        config.schedule_handle.before_request(processing_start.saturating_duration_since(total_start));

        if !active {
            // inactive clients still advance the schedule and notify the
            // scheduler, but never touch the cluster and never sample
            //.
            config.schedule_handle.after_request(Instant::now().saturating_duration_since(total_start), 0.0, "ops");
            continue;
        }

        let mut params = item.params.clone();
        if item.runner.op_type() == "vector-search" {
            params.insert("num_clients", config.task.clients as u64);
            params.insert("num_cores", num_cpus::get() as u64);
        }

        let default = default_client(&config.clients)?;
        let request_context = default.new_request_context();
        request_context.on_client_request_start();

        let request_timeout = params
        .get_f64("request-timeout")
        .map(Duration::from_secs_f64)
        .unwrap_or(Duration::ZERO);
        let deadline = config.base_timeout + request_timeout;

        // built-in runners don't thread the request context through their own
        // body, so client_request_* and request_* bracket the same call and
        // client_processing_time collapses to zero; a runner that wants a
        // separate client-side phase would mark request_start itself.
        request_context.on_request_start();
        let call = item.runner.call(&config.clients, &params);
        let timed_call = tokio::time::timeout(deadline, call);
        let outcome_result = tokio::select! {
            _ = config.cancel_signal.wait() => break,
            result = timed_call => result,
        };
        request_context.on_request_end();
        request_context.on_client_request_end();
        let timing = request_context.snapshot();

        let outcome = match outcome_result {
            Err(_elapsed) => {
                return Err(BenchError::task_failure(
                        &config.task.name,
                        BenchError::transport(format!(
                                "request for operation '{}' exceeded its {:?} deadline",
                                item.runner.op_type(),
                                deadline
                            ))));
            }
            Ok(Err(err)) => match err.http_status_code() {
                Some(status) => {
                    let fatal = config.on_error == OnError::Abort && !config.task.ignore_response_error_level_non_fatal;
                    if fatal {
                        return Err(BenchError::task_failure(&config.task.name, err));
                    }
                    if let Some(queue) = &config.error_queue {
                        let _ = queue.try_send(FeedbackEvent::ClusterError);
                    }
                    let mut meta = Meta::with_success(false);
                    meta.insert("http-status", status);
                    meta.insert("error-type", "transport");
                    meta.insert("error-description", err.to_string());
                    RunnerOutcome::Dict(meta)
                }
                None => return Err(BenchError::task_failure(&config.task.name, err)),
            },
            Ok(Ok(outcome)) => outcome,
        };

        let (weight, unit, meta) = match outcome {
            RunnerOutcome::None => (1.0, "ops".to_string(), Meta::with_success(true)),
            RunnerOutcome::Weight(weight, unit) => (weight, unit, Meta::with_success(true)),
            RunnerOutcome::Dict(meta) => {
                let weight = meta.weight().unwrap_or(1.0);
                let unit = meta.unit().unwrap_or("ops").to_string();
                (weight, unit, meta)
            }
        };

        let now = Instant::now();
        config
        .schedule_handle
        .after_request(now.saturating_duration_since(total_start), weight, &unit);

        let service_time = timing
        .request_end
        .and_then(|end| timing.request_start.map(|start| end.saturating_duration_since(start)))
        .unwrap_or_default();
        let client_processing_time = timing
        .client_request_end
        .and_then(|end| timing.client_request_start.map(|start| end.saturating_duration_since(start)))
        .unwrap_or_default()
        .saturating_sub(service_time);
        let latency = if throttled {
            timing
            .client_request_end
            .and_then(|end| timing.client_request_start.map(|start| end.saturating_duration_since(start)))
            .unwrap_or_default()
            + throttle_wait
        } else {
            service_time
        };
        let processing_end = Instant::now();
        let processing_time = processing_end.saturating_duration_since(processing_start);

        let relative_time = config.sampler.relative_time(now);
        let sample = Sample {
            client_id: config.client_id,
            absolute_time: now.saturating_duration_since(total_start),
            relative_time,
            task: config.task.name.clone(),
            operation: config.task.operation.name.clone(),
            operation_type: config.task.operation.op_type.clone(),
            sample_type: item.sample_type,
            request_meta_data: meta.clone(),
            latency,
            service_time,
            client_processing_time,
            processing_time,
            throughput_override: meta.throughput_override(),
            total_ops: weight,
            total_ops_unit: unit,
            time_period: relative_time,
            percent_completed: item.runner.percent_completed().or(item.progress_percent),
            dependent_timings: meta
            .get("dependent_timing")
            .and_then(|value| serde_json::from_value(value.clone()).ok())
            .unwrap_or_default(),
        };
        config.sampler.add(sample.clone());
        if let Some(profile_sampler) = &config.profile_sampler {
            profile_sampler.add(sample);
        }

        let completed = item.runner.completed().unwrap_or(false);
        config.schedule_handle.report_runner_completed(completed);
        if completed {
            if config.task.completes_parent {
                config.complete_signal.set();
            }
            break;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use osb_core::cluster_client::{ClusterClient, ClusterResponse, DEFAULT_CLUSTER};
    use osb_core::param_source::CountingParamSource;
    use osb_core::request_context::RequestContext;
    use osb_core::runner::Runner;
    use osb_core::schedule::scheduler::Deterministic;
    use osb_core::task::{Bound, Operation};
    use std::collections::HashMap as StdHashMap;

    struct EchoClient;

    #[async_trait::async_trait]
    impl ClusterClient for EchoClient {
        async fn perform_request(
            &self,
            _method: &str,
            _path: &str,
            _params: &Params,
            _body: Option<serde_json::Value>,
            _headers: Option<StdHashMap<String, String>>) -> BenchResult<ClusterResponse> {
            Ok(ClusterResponse {
                    status: 200,
                    body: serde_json::json!({}),
                })
        }

        fn new_request_context(&self) -> RequestContext {
            RequestContext::new()
        }
    }

    struct AlwaysOk;

    #[async_trait::async_trait]
    impl Runner for AlwaysOk {
        async fn call(&self, _clients: &ClientMap, _params: &Params) -> BenchResult<RunnerOutcome> {
            Ok(RunnerOutcome::weight(1.0, "ops"))
        }

        fn op_type(&self) -> &str {
            "noop"
        }
    }

    struct AlwaysFailsHttp;

    #[async_trait::async_trait]
    impl Runner for AlwaysFailsHttp {
        async fn call(&self, _clients: &ClientMap, _params: &Params) -> BenchResult<RunnerOutcome> {
            Err(BenchError::http_status(503, "service unavailable"))
        }

        fn op_type(&self) -> &str {
            "failing"
        }
    }

    struct AlwaysFailsConnection;

    #[async_trait::async_trait]
    impl Runner for AlwaysFailsConnection {
        async fn call(&self, _clients: &ClientMap, _params: &Params) -> BenchResult<RunnerOutcome> {
            Err(BenchError::transport("connection refused"))
        }

        fn op_type(&self) -> &str {
            "failing-connection"
        }
    }

    fn clients_with_default() -> ClientMap {
        let mut clients = ClientMap::new();
        clients.insert(DEFAULT_CLUSTER.to_string(), Arc::new(EchoClient));
        clients
    }

    fn task(name: &str, iterations: u64) -> Task {
        Task {
            name: name.to_string(),
            operation: Operation {
                name: name.to_string(),
                op_type: "noop".to_string(),
                params: Default::default(),
                param_source_name: None,
            },
            clients: 1,
            warmup: Bound::default(),
            measurement: Bound {
                iterations: Some(iterations),
                time_period: None,
            },
            ramp_up_time: None,
            schedule_name: None,
            target_throughput: None,
            target_interval: None,
            completes_parent: false,
            ignore_response_error_level_non_fatal: false,
        }
    }

    fn handle_with(runner: Arc<dyn Runner>, iterations: u64) -> ScheduleHandle {
        let scheduler = Box::new(Deterministic::new(1000.0, 1));
        let source = Box::new(CountingParamSource::new(iterations, |_| Params::new()));
        ScheduleHandle::new(
            scheduler,
            source,
            runner,
            Bound::default(),
            Bound {
                iterations: Some(iterations),
                time_period: None,
            },
            Duration::ZERO)
    }

    #[tokio::test(start_paused = true)]
    async fn a_successful_run_emits_exactly_one_sample_per_iteration() {
        let sampler = Arc::new(Sampler::new());
        let config = ExecutorConfig {
            client_id: ClientId(0),
            task: task("t", 5),
            schedule_handle: handle_with(Arc::new(AlwaysOk), 5),
            clients: clients_with_default(),
            sampler: sampler.clone(),
            profile_sampler: None,
            cancel_signal: Signal::new(),
            complete_signal: Signal::new(),
            on_error: OnError::Continue,
            shared_states: SharedClientStates::new(),
            error_queue: None,
            base_timeout: Duration::from_secs(30),
        };
        run(config).await.unwrap();
        assert_eq!(sampler.len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn an_inactive_client_advances_the_schedule_without_sampling() {
        let sampler = Arc::new(Sampler::new());
        let shared_states = SharedClientStates::new();
        shared_states.set_active(ClientId(0), false);
        let config = ExecutorConfig {
            client_id: ClientId(0),
            task: task("t", 3),
            schedule_handle: handle_with(Arc::new(AlwaysOk), 3),
            clients: clients_with_default(),
            sampler: sampler.clone(),
            profile_sampler: None,
            cancel_signal: Signal::new(),
            complete_signal: Signal::new(),
            on_error: OnError::Continue,
            shared_states,
            error_queue: None,
            base_timeout: Duration::from_secs(30),
        };
        run(config).await.unwrap();
        assert!(sampler.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn http_failure_continues_and_emits_a_failed_sample_when_on_error_continue() {
        let sampler = Arc::new(Sampler::new());
        let config = ExecutorConfig {
            client_id: ClientId(0),
            task: task("t", 1),
            schedule_handle: handle_with(Arc::new(AlwaysFailsHttp), 1),
            clients: clients_with_default(),
            sampler: sampler.clone(),
            profile_sampler: None,
            cancel_signal: Signal::new(),
            complete_signal: Signal::new(),
            on_error: OnError::Continue,
            shared_states: SharedClientStates::new(),
            error_queue: None,
            base_timeout: Duration::from_secs(30),
        };
        run(config).await.unwrap();
        let samples = sampler.drain();
        assert_eq!(samples.len(), 1);
        assert!(!samples[0].request_meta_data.success());
    }

    #[tokio::test(start_paused = true)]
    async fn http_failure_aborts_when_on_error_abort() {
        let config = ExecutorConfig {
            client_id: ClientId(0),
            task: task("t", 1),
            schedule_handle: handle_with(Arc::new(AlwaysFailsHttp), 1),
            clients: clients_with_default(),
            sampler: Arc::new(Sampler::new()),
            profile_sampler: None,
            cancel_signal: Signal::new(),
            complete_signal: Signal::new(),
            on_error: OnError::Abort,
            shared_states: SharedClientStates::new(),
            error_queue: None,
            base_timeout: Duration::from_secs(30),
        };
        assert!(run(config).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn ignore_response_error_level_overrides_global_abort() {
        let mut task = task("t", 1);
        task.ignore_response_error_level_non_fatal = true;
        let config = ExecutorConfig {
            client_id: ClientId(0),
            task,
            schedule_handle: handle_with(Arc::new(AlwaysFailsHttp), 1),
            clients: clients_with_default(),
            sampler: Arc::new(Sampler::new()),
            profile_sampler: None,
            cancel_signal: Signal::new(),
            complete_signal: Signal::new(),
            on_error: OnError::Abort,
            shared_states: SharedClientStates::new(),
            error_queue: None,
            base_timeout: Duration::from_secs(30),
        };
        assert!(run(config).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn a_connection_error_always_aborts_regardless_of_on_error() {
        let config = ExecutorConfig {
            client_id: ClientId(0),
            task: task("t", 1),
            schedule_handle: handle_with(Arc::new(AlwaysFailsConnection), 1),
            clients: clients_with_default(),
            sampler: Arc::new(Sampler::new()),
            profile_sampler: None,
            cancel_signal: Signal::new(),
            complete_signal: Signal::new(),
            on_error: OnError::Continue,
            shared_states: SharedClientStates::new(),
            error_queue: None,
            base_timeout: Duration::from_secs(30),
        };
        assert!(run(config).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_signal_stops_the_loop_promptly() {
        let sampler = Arc::new(Sampler::new());
        let cancel_signal = Signal::new();
        cancel_signal.set();
        let config = ExecutorConfig {
            client_id: ClientId(0),
            task: task("t", 100),
            schedule_handle: handle_with(Arc::new(AlwaysOk), 100),
            clients: clients_with_default(),
            sampler: sampler.clone(),
            profile_sampler: None,
            cancel_signal,
            complete_signal: Signal::new(),
            on_error: OnError::Continue,
            shared_states: SharedClientStates::new(),
            error_queue: None,
            base_timeout: Duration::from_secs(30),
        };
        run(config).await.unwrap();
        assert!(sampler.is_empty());
    }
}
