//! Async executor, worker/coordinator rendezvous and redline feedback
//! control for the load-generation engine. Built atop the seam traits in
//! `osb-core` and the registry/wrappers in `osb-runner`.

pub mod assignment;
pub mod coordinator;
pub mod executor;
pub mod feedback;
pub mod messages;
pub mod signal;
pub mod worker;

pub use assignment::{calculate_worker_assignments, HostSpec, WorkerAssignment};
pub use coordinator::{Coordinator, CoordinatorConfig, CoordinatorReport};
pub use executor::{ExecutorConfig, ExecutorHandle, OnError};
pub use feedback::{CpuMonitor, FeedbackActor, FeedbackState};
pub use messages::{CoordinatorToWorker, SharedClientStates, WorkerToCoordinator};
pub use signal::Signal;
pub use worker::{Worker, WorkerConfig};
