//! The Worker (component J): hosts the executors for the
//! clients assigned to it on one host, runs them one schedule step at a
//! time, and reports join-point arrivals to the [`crate::coordinator::Coordinator`].

use crate::executor::{ExecutorConfig, ExecutorHandle, OnError};
use crate::messages::{CoordinatorToWorker, ErrorSender, JoinPointReached, SharedClientStates, WorkerError, WorkerToCoordinator};
use crate::signal::Signal;
use osb_core::allocator::{Allocation, AllocationEntry};
use osb_core::cluster_client::ClientMap;
use osb_core::error::{BenchError, BenchResult};
use osb_core::ids::{ClientId, WorkerId};
use osb_core::param_source::{InfiniteParamSource, ParamSource};
use osb_core::params::Params;
use osb_core::sample::Sample;
use osb_core::sampler::Sampler;
use osb_core::schedule::{build_scheduler, ScheduleHandle};
use osb_core::task::Task;
use osb_runner::registry::Registry;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Everything one worker process needs to drive its clients through a
/// schedule. `samplers`/`profile_samplers` are shared with the coordinator
/// (and every other worker), keyed by task name, so that a task whose
/// clients are spread across several workers accumulates into one buffer
/// per task.
pub struct WorkerConfig {
    pub worker_id: WorkerId,
    pub client_ids: Vec<ClientId>,
    pub allocation: Arc<Allocation>,
    pub tasks: Arc<HashMap<String, Task>>,
    pub registry: Arc<Registry>,
    pub clients: ClientMap,
    pub shared_states: SharedClientStates,
    pub error_queue: Option<ErrorSender>,
    pub on_error: OnError,
    pub base_timeout: Duration,
    pub samplers: Arc<dashmap::DashMap<String, Arc<Sampler>>>,
    pub profile_samplers: Option<Arc<dashmap::DashMap<String, Arc<Sampler>>>>,
    pub to_coordinator: mpsc::Sender<WorkerToCoordinator>,
    pub from_coordinator: mpsc::Receiver<CoordinatorToWorker>,
}

pub struct Worker {
    config: WorkerConfig,
}

impl Worker {
    pub fn new(config: WorkerConfig) -> Self {
        Self { config }
    }

    fn sampler_for(&self, task_name: &str) -> Arc<Sampler> {
        Arc::clone(
            self.config
            .samplers
            .entry(task_name.to_string())
            .or_insert_with(|| Arc::new(Sampler::new())))
    }

    fn profile_sampler_for(&self, task_name: &str) -> Option<Arc<Sampler>> {
        self.config.profile_samplers.as_ref().map(|samplers| {
                Arc::clone(
                    samplers
                    .entry(task_name.to_string())
                    .or_insert_with(|| Arc::new(Sampler::new())))
            })
    }

    /// Runs every step of this worker's clients' allocation to completion,
    /// rendezvousing with the coordinator at each join point.
    pub async fn run(mut self) -> BenchResult<()> {
        let total_start = Instant::now();
        let steps = self.config.allocation.join_points.len().saturating_sub(1);
        tracing::info!(
            worker_id = self.config.worker_id.0,
            clients = self.config.client_ids.len(),
            steps,
            "worker starting"
        );

        for step in 0..steps {
            let cancel_signal = Signal::new();
            let complete_signal = Signal::new();

            let mut running = tokio::task::JoinSet::new();
            for &client_id in &self.config.client_ids {
                let entry = &self.config.allocation.client_lists[client_id.0][2 * step + 1];
                match entry {
                    AllocationEntry::Idle => {}
                    AllocationEntry::Join(_) => unreachable!("odd positions are never join points"),
                    AllocationEntry::Task(task_alloc) => {
                        let task = self
                        .config
                        .tasks
                        .get(&task_alloc.task_name)
                        .ok_or_else(|| BenchError::data(format!("no task definition for '{}'", task_alloc.task_name)))?
                        .clone();
                        let executor_config = self.build_executor_config(
                            client_id,
                            &task,
                            task_alloc.client_index_in_task,
                            task_alloc.total_clients_of_task,
                            cancel_signal.clone(),
                            complete_signal.clone())?;
                        running.spawn(ExecutorHandle::spawn(executor_config).join());
                    }
                }
            }

            // drive spawned executors to completion while staying responsive
            // to a CompleteCurrentTask/Cancel broadcast from the coordinator.
            loop {
                if running.is_empty() {
                    break;
                }
                tokio::select! {
                    Some(joined) = running.join_next() => {
                        match joined {
                            Ok(Ok(())) => {}
                            Ok(Err(err)) => {
                                tracing::error!(worker_id = self.config.worker_id.0, step, %err, "executor raised a fatal error");
                                self.config.to_coordinator
                                .send(WorkerToCoordinator::Error(WorkerError {
                                            worker_id: self.config.worker_id,
                                            message: err.to_string(),
                                        }))
                                .await
                                .ok();
                                return Err(err);
                            }
                            Err(join_error) => {
                                return Err(BenchError::benchmark(format!("executor task panicked: {join_error}")));
                            }
                        }
                    }
                    Some(message) = self.config.from_coordinator.recv() => {
                        match message {
                            CoordinatorToWorker::CompleteCurrentTask => complete_signal.set(),
                            CoordinatorToWorker::Cancel => {
                                cancel_signal.set();
                            }
                            CoordinatorToWorker::DriveAt(_) => {
                                // a release for a step this worker has already
                                // passed; this worker is still mid-step, ignore.
                            }
                        }
                    }
                }
            }

            let join_point = &self.config.allocation.join_points[step + 1];
            self.config
            .to_coordinator
            .send(WorkerToCoordinator::JoinPointReached(JoinPointReached {
                        worker_id: self.config.worker_id,
                        join_point_id: join_point.id,
                        timestamp: total_start.elapsed(),
                        preceding_task_completes_parent: join_point.preceding_task_completes_parent,
                    }))
            .await
            .map_err(|_| BenchError::benchmark("coordinator channel closed"))?;

            if step + 1 == steps {
                // this was the final join point; no further release to wait for.
                break;
            }

            loop {
                match self.config.from_coordinator.recv().await {
                    Some(CoordinatorToWorker::DriveAt(start_at)) => {
                        let now = total_start.elapsed();
                        if start_at > now {
                            tokio::time::sleep(start_at - now).await;
                        }
                        break;
                    }
                    Some(CoordinatorToWorker::Cancel) => return Ok(()),
                    Some(CoordinatorToWorker::CompleteCurrentTask) => {
                        // a stray completion notice for the step we just left; the
                        // executors for that step are already gone. Ignore.
                    }
                    None => return Err(BenchError::benchmark("coordinator channel closed")),
                }
            }
        }

        Ok(())
    }

    fn build_executor_config(
        &self,
        client_id: ClientId,
        task: &Task,
        client_index_in_task: usize,
        total_clients_of_task: usize,
        cancel_signal: Signal,
        complete_signal: Signal) -> BenchResult<ExecutorConfig> {
        let runner = self.config.registry.resolve(&task.operation.op_type)?;
        let scheduler = build_scheduler(task, total_clients_of_task.max(1))?;

        let params = Params::from(task.operation.params.clone());
        let source: Box<dyn ParamSource> = Box::new(InfiniteParamSource::new(move |_| params.clone()));
        let source = source.partition(client_index_in_task, total_clients_of_task.max(1));

        let ramp_up_wait_time = match task.ramp_up_time {
            Some(ramp_up_time_period) if total_clients_of_task > 1 => {
                ramp_up_time_period.mul_f64(client_index_in_task as f64 / total_clients_of_task as f64)
            }
            Some(_) => Duration::ZERO,
            None => Duration::ZERO,
        };

        let schedule_handle = ScheduleHandle::new(scheduler, source, runner, task.warmup, task.measurement, ramp_up_wait_time);

        Ok(ExecutorConfig {
                client_id,
                task: task.clone(),
                schedule_handle,
                clients: self.config.clients.clone(),
                sampler: self.sampler_for(&task.name),
                profile_sampler: self.profile_sampler_for(&task.name),
                cancel_signal,
                complete_signal,
                on_error: self.config.on_error,
                shared_states: self.config.shared_states.clone(),
                error_queue: self.config.error_queue.clone(),
                base_timeout: self.config.base_timeout,
            })
    }
}

/// Accumulates every sample a task's clients have produced across all
/// workers so far; used by the coordinator to drain a completed task's
/// sampler. Exposed here since it only depends on the shared map shape the
/// worker and coordinator both hold.
pub fn drain_task_samples(samplers: &dashmap::DashMap<String, Arc<Sampler>>, task_name: &str) -> Vec<Sample> {
    samplers.get(task_name).map(|sampler| sampler.drain()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::OnError;
    use crate::messages::error_queue;
    use osb_core::cluster_client::{ClusterClient, ClusterResponse, DEFAULT_CLUSTER};
    use osb_core::error::BenchResult as Result;
    use osb_core::request_context::RequestContext;
    use osb_core::runner::{Runner, RunnerOutcome};
    use osb_core::task::{Bound, Operation};
    use osb_runner::registry::Registry;
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
            _headers: Option<StdHashMap<String, String>>) -> Result<ClusterResponse> {
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
        async fn call(&self, _clients: &ClientMap, _params: &Params) -> Result<RunnerOutcome> {
            Ok(RunnerOutcome::weight(1.0, "ops"))
        }

        fn op_type(&self) -> &str {
            "noop"
        }
    }

    fn task(name: &str, clients: usize, iterations: u64) -> Task {
        let mut t = Task::new(
            name,
            Operation {
                name: name.to_string(),
                op_type: "noop".to_string(),
                params: Default::default(),
                param_source_name: None,
            },
            clients);
        t.measurement = Bound {
            iterations: Some(iterations),
            time_period: None,
        };
        t
    }

    #[tokio::test(start_paused = true)]
    async fn a_single_step_worker_reports_one_join_point_arrival_per_client() {
        let schedule = vec![osb_core::task::ScheduleNode::Task(task("t", 2, 3))];
        let allocation = Arc::new(osb_core::allocator::allocate(&schedule));
        let mut tasks = HashMap::new();
        tasks.insert("t".to_string(), task("t", 2, 3));

        let registry = Arc::new(Registry::new());
        registry.register("noop", Arc::new(AlwaysOk));

        let mut clients = ClientMap::new();
        clients.insert(DEFAULT_CLUSTER.to_string(), Arc::new(EchoClient) as Arc<dyn ClusterClient>);

        let (to_coord_tx, mut to_coord_rx) = mpsc::channel(16);
        let (_from_coord_tx, from_coord_rx) = mpsc::channel(16);
        let (_err_tx, err_rx) = error_queue(16);
        drop(err_rx);

        let worker = Worker::new(WorkerConfig {
                worker_id: WorkerId(0),
                client_ids: vec![ClientId(0), ClientId(1)],
                allocation,
                tasks: Arc::new(tasks),
                registry,
                clients,
                shared_states: SharedClientStates::new(),
                error_queue: None,
                on_error: OnError::Continue,
                base_timeout: Duration::from_secs(30),
                samplers: Arc::new(dashmap::DashMap::new()),
                profile_samplers: None,
                to_coordinator: to_coord_tx,
                from_coordinator: from_coord_rx,
            });

        worker.run().await.unwrap();

        let message = to_coord_rx.recv().await.expect("one join-point arrival");
        match message {
            WorkerToCoordinator::JoinPointReached(reached) => {
                assert_eq!(reached.worker_id, WorkerId(0));
            }
            WorkerToCoordinator::Error(err) => panic!("unexpected error: {}", err.message),
        }
        assert!(to_coord_rx.try_recv().is_err(), "exactly one arrival for one step");
    }
}
