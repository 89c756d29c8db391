//! The Coordinator (component K): root controller. Prepares
//! a workload's chosen test procedure, assigns clients to workers,
//! advances the global step on join-point rendezvous, and publishes
//! results through the [`MetricsStore`].

use crate::assignment::{calculate_worker_assignments, HostSpec};
use crate::executor::OnError;
use crate::feedback::{CpuMonitor, FeedbackActor};
use crate::messages::{error_queue, CoordinatorToWorker, SharedClientStates, WorkerToCoordinator};
use crate::worker::{drain_task_samples, Worker, WorkerConfig};
use osb_core::allocator::{allocate, Allocation};
use osb_core::cluster_client::ClientMap;
use osb_core::config::RedlineConfig;
use osb_core::error::{BenchError, BenchResult};
use osb_core::ids::WorkerId;
use osb_core::metrics_store::MetricsStore;
use osb_core::postprocessor::postprocess;
use osb_core::sampler::Sampler;
use osb_core::task::{Task, TestProcedure};
use osb_runner::registry::Registry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

pub struct CoordinatorConfig {
    pub test_procedure: TestProcedure,
    pub hosts: Vec<HostSpec>,
    pub registry: Arc<Registry>,
    pub clients: ClientMap,
    pub store: Arc<dyn MetricsStore>,
    pub on_error: OnError,
    pub base_timeout: Duration,
    pub downsample_factor: usize,
    pub redline: RedlineConfig,
    pub cpu_monitor: Option<Arc<dyn CpuMonitor>>,
    /// Gates whether a second, profile-only [`Sampler`] is kept per task.
    pub profiling_enabled: bool,
    /// Capacity of the feedback actor's error queue.
    pub error_queue_capacity: usize,
    /// How often the feedback actor ticks, when redline is enabled.
    pub feedback_tick_period: Duration,
}

/// Summary of one completed (or aborted) run, handed back to whatever
/// external caller started the Coordinator (CLI/orchestration glue is out
/// of scope).
#[derive(Debug)]
pub struct CoordinatorReport {
    pub total_clients: usize,
    pub steps_completed: usize,
    pub metric_records_published: usize,
}

pub struct Coordinator {
    config: CoordinatorConfig,
}

impl Coordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        Self { config }
    }

    fn tasks_by_name(&self) -> HashMap<String, Task> {
        let mut tasks = HashMap::new();
        for node in &self.config.test_procedure.schedule {
            for task in node.tasks() {
                tasks.insert(task.name.clone(), task.clone());
            }
        }
        tasks
    }

    /// Runs the chosen test procedure to completion: allocates clients to
    /// workers, drives the join-point rendezvous loop, and publishes every
    /// task's samples to the metrics store as each step completes.
    pub async fn run(self) -> BenchResult<CoordinatorReport> {
        let total_start = Instant::now();
        let allocation = Arc::new(allocate(&self.config.test_procedure.schedule));
        let tasks = Arc::new(self.tasks_by_name());
        let total_clients = allocation.total_clients();
        let steps = allocation.join_points.len().saturating_sub(1);

        let assignments = calculate_worker_assignments(&self.config.hosts, total_clients);
        let total_workers = assignments.len().max(1);

        let shared_states = SharedClientStates::new();
        let (error_tx, error_rx) = error_queue(self.config.error_queue_capacity.max(1));

        let feedback_handle = if self.config.redline.enabled {
            let actor = FeedbackActor::new(
                self.config.redline.clone(),
                shared_states.clone(),
                total_clients,
                error_rx,
                error_tx.clone(),
                self.config.cpu_monitor.clone());
            let period = self.config.feedback_tick_period;
            Some(tokio::spawn(actor.run(period)))
        } else {
            drop(error_rx);
            None
        };

        let samplers: Arc<dashmap::DashMap<String, Arc<Sampler>>> = Arc::new(dashmap::DashMap::new());
        let profile_samplers = self
        .config
        .profiling_enabled
        .then(|| Arc::new(dashmap::DashMap::new()));

        let (to_coordinator_tx, mut to_coordinator_rx) = mpsc::channel(total_workers.max(1) * 4);
        let mut worker_senders: HashMap<WorkerId, mpsc::Sender<CoordinatorToWorker>> = HashMap::new();
        let mut worker_handles = Vec::new();

        for (index, assignment) in assignments.into_iter().enumerate() {
            let worker_id = WorkerId(index);
            let (from_coordinator_tx, from_coordinator_rx) = mpsc::channel(8);
            worker_senders.insert(worker_id, from_coordinator_tx);

            let worker = Worker::new(WorkerConfig {
                    worker_id,
                    client_ids: assignment.client_ids,
                    allocation: Arc::clone(&allocation),
                    tasks: Arc::clone(&tasks),
                    registry: Arc::clone(&self.config.registry),
                    clients: self.config.clients.clone(),
                    shared_states: shared_states.clone(),
                    error_queue: self.config.redline.enabled.then(|| error_tx.clone()),
                    on_error: self.config.on_error,
                    base_timeout: self.config.base_timeout,
                    samplers: Arc::clone(&samplers),
                    profile_samplers: profile_samplers.clone(),
                    to_coordinator: to_coordinator_tx.clone(),
                    from_coordinator: from_coordinator_rx,
                });
            worker_handles.push(tokio::spawn(worker.run()));
        }
        drop(to_coordinator_tx);

        let mut workers_arrived: HashSet<WorkerId> = HashSet::new();
        let mut current_step = 0usize;
        let mut complete_signaled_this_step = false;
        let mut metric_records_published = 0usize;
        let mut run_error: Option<BenchError> = None;

        while current_step < steps {
            match to_coordinator_rx.recv().await {
                Some(WorkerToCoordinator::JoinPointReached(reached)) => {
                    if reached.preceding_task_completes_parent && !complete_signaled_this_step {
                        complete_signaled_this_step = true;
                        broadcast(&worker_senders, CoordinatorToWorker::CompleteCurrentTask).await;
                    }
                    workers_arrived.insert(reached.worker_id);
                    if workers_arrived.len() < total_workers {
                        continue;
                    }

                    if let Some(node) = self.config.test_procedure.schedule.get(current_step) {
                        for task in node.tasks() {
                            let samples = drain_task_samples(&samplers, &task.name);
                            if !samples.is_empty() {
                                metric_records_published += samples.len() * 5;
                                postprocess(samples, self.config.downsample_factor, self.config.store.as_ref());
                            }
                            samplers.remove(&task.name);
                            if let Some(profile) = &profile_samplers {
                                profile.remove(&task.name);
                            }
                        }
                    }

                    current_step += 1;
                    workers_arrived.clear();
                    complete_signaled_this_step = false;

                    if current_step < steps {
                        let drive_at = total_start.elapsed();
                        broadcast(&worker_senders, CoordinatorToWorker::DriveAt(drive_at)).await;
                    }
                }
                Some(WorkerToCoordinator::Error(err)) => {
                    broadcast(&worker_senders, CoordinatorToWorker::Cancel).await;
                    run_error = Some(BenchError::benchmark(err.message));
                    break;
                }
                None => {
                    run_error = Some(BenchError::benchmark("all worker channels closed unexpectedly"));
                    break;
                }
            }
        }

        if let Some(handle) = feedback_handle {
            handle.abort();
        }
        for handle in worker_handles {
            if let Ok(Err(err)) = handle.await {
                run_error.get_or_insert(err);
            }
        }

        match run_error {
            Some(err) => Err(err),
            None => Ok(CoordinatorReport {
                    total_clients,
                    steps_completed: current_step,
                    metric_records_published,
                }),
        }
    }
}

async fn broadcast(senders: &HashMap<WorkerId, mpsc::Sender<CoordinatorToWorker>>, message: CoordinatorToWorker) {
    for sender in senders.values() {
        let _ = sender.send(message.clone()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::HostSpec;
    use osb_core::cluster_client::{ClusterClient, ClusterResponse, DEFAULT_CLUSTER};
    use osb_core::error::BenchResult as Result;
    use osb_core::metrics_store::InMemoryMetricsStore;
    use osb_core::params::Params;
    use osb_core::request_context::RequestContext;
    use osb_core::runner::{Runner, RunnerOutcome};
    use osb_core::task::{Bound, Operation, ScheduleNode};
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
    async fn a_single_task_single_step_run_publishes_every_sample_and_completes() {
        let registry = Arc::new(Registry::new());
        registry.register("noop", Arc::new(AlwaysOk));

        let mut clients = ClientMap::new();
        clients.insert(DEFAULT_CLUSTER.to_string(), Arc::new(EchoClient) as Arc<dyn ClusterClient>);

        let store = Arc::new(InMemoryMetricsStore::new());

        let coordinator = Coordinator::new(CoordinatorConfig {
                test_procedure: TestProcedure {
                    name: "default".to_string(),
                    schedule: vec![ScheduleNode::Task(task("t", 2, 3))],
                },
                hosts: vec![HostSpec::new("h1", 2)],
                registry,
                clients,
                store: store.clone(),
                on_error: OnError::Continue,
                base_timeout: Duration::from_secs(30),
                downsample_factor: 1,
                redline: RedlineConfig {
                    enabled: false,
                    ..RedlineConfig::default()
                },
                cpu_monitor: None,
                profiling_enabled: false,
                error_queue_capacity: 16,
                feedback_tick_period: Duration::from_secs(1),
            });

        let report = coordinator.run().await.unwrap();
        assert_eq!(report.total_clients, 2);
        assert_eq!(report.steps_completed, 1);

        let records = store.records();
        // 2 clients * 3 iterations * 5 metrics (latency, service_time,
        // client_processing_time, processing_time, throughput) per sample.
        assert_eq!(records.len(), 2 * 3 * 5);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_worker_slots_still_pass_through_every_join_point() {
        let registry = Arc::new(Registry::new());
        registry.register("noop", Arc::new(AlwaysOk));
        let mut clients = ClientMap::new();
        clients.insert(DEFAULT_CLUSTER.to_string(), Arc::new(EchoClient) as Arc<dyn ClusterClient>);
        let store = Arc::new(InMemoryMetricsStore::new());

        // 1 client requested but 4 cores -> 3 idle worker slots must still
        // rendezvous at every join point.
        let coordinator = Coordinator::new(CoordinatorConfig {
                test_procedure: TestProcedure {
                    name: "default".to_string(),
                    schedule: vec![ScheduleNode::Task(task("t", 1, 2))],
                },
                hosts: vec![HostSpec::new("h1", 4)],
                registry,
                clients,
                store,
                on_error: OnError::Continue,
                base_timeout: Duration::from_secs(30),
                downsample_factor: 1,
                redline: RedlineConfig {
                    enabled: false,
                    ..RedlineConfig::default()
                },
                cpu_monitor: None,
                profiling_enabled: false,
                error_queue_capacity: 16,
                feedback_tick_period: Duration::from_secs(1),
            });

        let report = coordinator.run().await.unwrap();
        assert_eq!(report.steps_completed, 1);
    }
}
