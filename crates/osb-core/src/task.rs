//! The declarative data model: workloads, test procedures,
//! tasks and operations.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// `{name, type, params, param_source_name}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    pub name: String,
    #[serde(rename = "type")]
    pub op_type: String,
    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,
    pub param_source_name: Option<String>,
}

/// Either bound on a task's length is satisfiable independently; at most one
/// of `iterations`/`time_period` may be set.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Bound {
    pub iterations: Option<u64>,
    pub time_period: Option<Duration>,
}

impl Bound {
    pub fn is_finite(&self) -> bool {
        self.iterations.is_some() || self.time_period.is_some()
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        if self.iterations.is_some() && self.time_period.is_some() {
            Err("at most one of iterations/time_period may be set")
        } else {
            Ok(())
        }
    }
}

/// `{name, operation, clients, warmup_iterations|warmup_time, iterations|
/// time_period, ramp_up_time, schedule_name, params, completes_parent}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub name: String,
    pub operation: Operation,
    pub clients: usize,
    #[serde(default)]
    pub warmup: Bound,
    #[serde(default)]
    pub measurement: Bound,
    #[serde(default)]
    pub ramp_up_time: Option<Duration>,
    #[serde(default)]
    pub schedule_name: Option<String>,
    /// `target-throughput`, e.g. `"5 MB/s"`, `"100 docs/s"`, or
    /// a bare number. Mutually exclusive with `target_interval`.
    #[serde(default)]
    pub target_throughput: Option<String>,
    /// `target-interval` seconds, the reciprocal of a rate.
    #[serde(default)]
    pub target_interval: Option<f64>,
    #[serde(default)]
    pub completes_parent: bool,
    /// `ignore-response-error-level ∈ {non-fatal}`: per-task override of the
    /// global `on_error=abort` policy.
    #[serde(default)]
    pub ignore_response_error_level_non_fatal: bool,
}

impl Task {
    pub fn new(name: impl Into<String>, operation: Operation, clients: usize) -> Self {
        Self {
            name: name.into(),
            operation,
            clients,
            warmup: Bound::default(),
            measurement: Bound::default(),
            ramp_up_time: None,
            schedule_name: None,
            target_throughput: None,
            target_interval: None,
            completes_parent: false,
            ignore_response_error_level_non_fatal: false,
        }
    }
}

/// A node in a test procedure's schedule: either a bare task, or a
/// `Parallel` group of tasks sharing a client budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScheduleNode {
    Task(Task),
    Parallel {
        tasks: Vec<Task>,
        /// Node-level `clients=` override; when present and larger than
        /// `sum(tasks.clients)`, extra clients cycle over subtasks.
        clients: Option<usize>,
    },
}

impl ScheduleNode {
    /// Total client count contributed by this node.
    pub fn client_count(&self) -> usize {
        match self {
            ScheduleNode::Task(task) => task.clients,
            ScheduleNode::Parallel { tasks, clients } => {
                let sum: usize = tasks.iter().map(|t| t.clients).sum();
                clients.unwrap_or(sum).max(sum)
            }
        }
    }

    pub fn tasks(&self) -> Vec<&Task> {
        match self {
            ScheduleNode::Task(task) => vec![task],
            ScheduleNode::Parallel { tasks,.. } => tasks.iter().collect(),
        }
    }
}

/// An ordered DAG of tasks separated by join points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestProcedure {
    pub name: String,
    pub schedule: Vec<ScheduleNode>,
}

/// A named collection of test procedures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workload {
    pub name: String,
    pub test_procedures: Vec<TestProcedure>,
}

impl Workload {
    pub fn test_procedure(&self, name: &str) -> Option<&TestProcedure> {
        self.test_procedures.iter().find(|tp| tp.name == name)
    }
}
