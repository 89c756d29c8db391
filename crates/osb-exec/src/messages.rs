//! Cross-worker messages and the
//! shared, lock-light state the executor and feedback actor communicate
//! through within one worker process: `shared_client_states` (single writer, many readers) and
//! `error_queue` (MPMC, bounded).
//!
//! Workers and the coordinator talk over `tokio::sync::mpsc` channels; a
//! real multi-host deployment would serialize these same payloads over a
//! wire transport, which is out of scope here.

use dashmap::DashMap;
use osb_core::ids::{ClientId, JoinPointId, WorkerId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Sent by a `Worker` to the `Coordinator` when every client it hosts has
/// reported arrival at a join point for the current step.
#[derive(Debug, Clone)]
pub struct JoinPointReached {
    pub worker_id: WorkerId,
    pub join_point_id: JoinPointId,
    pub timestamp: Duration,
    /// True if the join point just passed had
    /// `preceding_task_completes_parent = true`.
    pub preceding_task_completes_parent: bool,
}

/// Sent by a `Worker` when one of its executors raises a fatal
/// [`osb_core::error::BenchError`].
#[derive(Debug, Clone)]
pub struct WorkerError {
    pub worker_id: WorkerId,
    pub message: String,
}

/// Messages a worker sends to the coordinator.
#[derive(Debug, Clone)]
pub enum WorkerToCoordinator {
    JoinPointReached(JoinPointReached),
    Error(WorkerError),
}

/// Messages the coordinator broadcasts to every worker.
#[derive(Debug, Clone)]
pub enum CoordinatorToWorker {
    /// Instructs executors running the task that just completed its
    /// parent to stop ASAP.
    CompleteCurrentTask,
    /// Releases workers to start the next step at the given wall-clock
    /// offset from the benchmark epoch.
    DriveAt(Duration),
    /// Cancels every client across every worker.
    Cancel,
}

/// A cluster error signal observed at the executor or composite layer,
/// enqueued for the feedback actor to drain.
#[derive(Debug, Clone, Copy)]
pub enum FeedbackEvent {
    /// A request against the cluster failed (HTTP error or connection
    /// error recovered as a failed sample).
    ClusterError,
    /// The CPU watchdog observed a node over `max_cpu_usage`.
    CpuThresholdExceeded,
}

/// Bounded MPMC error queue: many executors enqueue, the feedback actor is
/// the sole consumer. Modeled as a bounded `tokio::sync::mpsc` channel;
/// `try_send` drops the event on a full queue rather than blocking a
/// client's request loop.
pub type ErrorSender = tokio::sync::mpsc::Sender<FeedbackEvent>;
pub type ErrorReceiver = tokio::sync::mpsc::Receiver<FeedbackEvent>;

pub fn error_queue(capacity: usize) -> (ErrorSender, ErrorReceiver) {
    tokio::sync::mpsc::channel(capacity)
}

/// Per-client active/paused flags, written solely by the feedback actor
/// and read by every client's executor each schedule iteration. Absent entries default to active, matching "`shared_states[client_id]`
/// (or True if absent)".
#[derive(Clone, Default)]
pub struct SharedClientStates {
    states: Arc<DashMap<ClientId, Arc<AtomicBool>>>,
}

impl SharedClientStates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self, client: ClientId) -> bool {
        self.states
        .get(&client)
        .map(|flag| flag.load(Ordering::Acquire))
        .unwrap_or(true)
    }

    pub fn set_active(&self, client: ClientId, active: bool) {
        self.states
        .entry(client)
        .or_insert_with(|| Arc::new(AtomicBool::new(true)))
        .store(active, Ordering::Release);
    }

    /// All known client ids, in no particular order.
    pub fn known_clients(&self) -> Vec<ClientId> {
        self.states.iter().map(|entry| *entry.key()).collect()
    }

    pub fn active_count(&self) -> usize {
        self.states.iter().filter(|entry| entry.value().load(Ordering::Acquire)).count()
    }

    /// Active client ids, ascending.
    pub fn active_client_ids(&self) -> Vec<ClientId> {
        let mut ids: Vec<ClientId> = self
        .states
        .iter()
        .filter(|entry| entry.value().load(Ordering::Acquire))
        .map(|entry| *entry.key())
        .collect();
        ids.sort();
        ids
    }

    /// Inactive client ids, ascending.
    pub fn inactive_client_ids(&self) -> Vec<ClientId> {
        let mut ids: Vec<ClientId> = self
        .states
        .iter()
        .filter(|entry| !entry.value().load(Ordering::Acquire))
        .map(|entry| *entry.key())
        .collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_client_defaults_active() {
        let states = SharedClientStates::new();
        assert!(states.is_active(ClientId(0)));
    }

    #[test]
    fn set_active_is_observed_by_later_reads() {
        let states = SharedClientStates::new();
        states.set_active(ClientId(3), false);
        assert!(!states.is_active(ClientId(3)));
        states.set_active(ClientId(3), true);
        assert!(states.is_active(ClientId(3)));
    }
}
