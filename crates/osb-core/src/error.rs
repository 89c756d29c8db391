//! Error taxonomy shared by every layer of the engine.
//!
//! Mirrors the benchmark's process-wide exception hierarchy: a single flat
//! set of variants rather than a tree of subclasses, since Rust error
//! handling composes better over `match` than over `is_instance_of`.

use std::fmt;

/// The engine-wide error type.
///
/// An HTTP-level `Transport` error is recovered locally wherever possible
/// (a failed sample is emitted instead of unwinding); every other variant
/// propagates to the coordinator and aborts the run.
#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    /// Base case: an unstructured benchmark failure with an optional cause.
    #[error("{message}")]
    Benchmark {
        message: String,
        #[source]
        cause: Option<Box<BenchError>>,
    },

    /// A problem launching the benchmark candidate (cluster provisioning,
    /// not part of this crate's scope, but the variant is still carried so
    /// callers in the harness crate can report it uniformly).
    #[error("launch error: {0}")]
    Launch(String),

    /// The user or operator misconfigured something outside the workload
    /// itself (missing metrics store, missing binary,...).
    #[error("system setup error: {0}")]
    SystemSetup(String),

    /// A precondition check failed.
    #[error("assertion failed: {0}")]
    Assertion(String),

    /// A per-task `assertions` check failed; always fatal to the run.
    #[error("task assertion failed: {0}")]
    TaskAssertion(String),

    /// Bad engine or schedule configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Something is wrong with benchmark data (corpora, ground truth,...).
    #[error("data error: {0}")]
    Data(String),

    #[error("supply error: {0}")]
    Supply(String),

    #[error("build error: {0}")]
    Build(String),

    #[error("invalid syntax: {0}")]
    InvalidSyntax(String),

    #[error("invalid name: {0}")]
    InvalidName(String),

    /// Something is wrong with the workload configuration (e.g. a
    /// workload-param that can't be set).
    #[error("workload config error: {0}")]
    WorkloadConfig(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// A transport-layer failure. `http_status = None` marks a
    /// connection-level failure (refused, DNS, socket) — always fatal to
    /// the task at the executor layer ; `Some(status)` marks
    /// an HTTP-level error response, recovered locally as a failed sample
    /// unless the task's `on_error` policy is `abort`. Either
    /// way the retry wrapper may absorb it at the runner layer first, when
    /// `retry-on-timeout` is set and the status is `408` or the failure is
    /// connection-level.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        http_status: Option<u16>,
    },
}

impl BenchError {
    pub fn benchmark(message: impl Into<String>) -> Self {
        BenchError::Benchmark {
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(message: impl Into<String>, cause: BenchError) -> Self {
        BenchError::Benchmark {
            message: message.into(),
            cause: Some(Box::new(cause)),
        }
    }

    /// Wraps a task-scoped error the way the executor does before handing
    /// it to the worker: `"Cannot run task [name]: <message>"`.
    pub fn task_failure(task_name: impl fmt::Display, message: impl fmt::Display) -> Self {
        BenchError::benchmark(format!("Cannot run task [{task_name}]: {message}"))
    }

    pub fn data(message: impl Into<String>) -> Self {
        BenchError::Data(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        BenchError::Config(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        BenchError::NotFound(message.into())
    }

    /// A connection-level transport failure (refused, DNS, socket, timeout
    /// below the HTTP layer).
    pub fn transport(message: impl Into<String>) -> Self {
        BenchError::Transport {
            message: message.into(),
            http_status: None,
        }
    }

    /// An HTTP-level error response (status >= 400).
    pub fn http_status(status: u16, message: impl Into<String>) -> Self {
        BenchError::Transport {
            message: message.into(),
            http_status: Some(status),
        }
    }

    pub fn assertion(message: impl Into<String>) -> Self {
        BenchError::Assertion(message.into())
    }

    pub fn task_assertion(message: impl Into<String>) -> Self {
        BenchError::TaskAssertion(message.into())
    }

    pub fn workload_config(message: impl Into<String>) -> Self {
        BenchError::WorkloadConfig(message.into())
    }

    /// True for errors that are never recoverable at the executor layer
    /// regardless of the task's `on_error` policy: connection-level
    /// transport failures, assertion failures, and configuration/data
    /// errors. An HTTP-level transport error (`http_status = Some(_)`) is
    /// NOT fatal by this definition — the executor recovers it as a failed
    /// sample unless `on_error = abort`.
    pub fn is_fatal_to_executor(&self) -> bool {
        match self {
            BenchError::Transport { http_status,.. } => http_status.is_none(),
            BenchError::Assertion(_)
            | BenchError::TaskAssertion(_)
            | BenchError::Data(_)
            | BenchError::Config(_)
            | BenchError::WorkloadConfig(_) => true,
            _ => false,
        }
    }

    /// The HTTP status of an HTTP-level transport error, if any.
    pub fn http_status_code(&self) -> Option<u16> {
        match self {
            BenchError::Transport { http_status,.. } => *http_status,
            _ => None,
        }
    }
}

pub type BenchResult<T> = Result<T, BenchError>;
