//! The Runner contract (component C): `async call(clients,
//! params) -> result`, where result is `None`, `(weight, unit)`, or a
//! `dict`-shaped [`Meta`].

use crate::cluster_client::ClientMap;
use crate::error::BenchResult;
use crate::meta::Meta;
use crate::params::Params;

/// The three shapes a runner's return value can take.
#[derive(Debug, Clone)]
pub enum RunnerOutcome {
    /// No result reported; interpreted downstream as `(1, "ops", success)`.
    None,
    /// A bare weight/unit pair; interpreted as a successful sample.
    Weight(f64, String),
    /// A full metadata dict (`success`, `weight`, `unit`, `http-status`,
    /// dependent timings,...).
    Dict(Meta),
}

impl RunnerOutcome {
    pub fn dict(meta: Meta) -> Self {
        RunnerOutcome::Dict(meta)
    }

    pub fn weight(weight: f64, unit: impl Into<String>) -> Self {
        RunnerOutcome::Weight(weight, unit.into())
    }
}

/// Executes one request against the cluster and returns a weight/unit/meta
/// record. Stateless except for `Composite`, which owns a scoped context
/// (see `osb-runner::composite`).
#[async_trait::async_trait]
pub trait Runner: Send + Sync {
    async fn call(&self, clients: &ClientMap, params: &Params) -> BenchResult<RunnerOutcome>;

    /// A runner advertises `multi_cluster = true` to receive the full
    /// client map instead of only the default cluster.
    fn multi_cluster(&self) -> bool {
        false
    }

    /// Progress capability for "wait-for-*" runners (force-merge polling,
    /// wait-for-transform, wait-for-snapshot, wait-for-recovery, indices
    /// recovery, train-knn-model). `None` means this runner never
    /// completes early and has no meaningful progress percentage.
    fn completed(&self) -> Option<bool> {
        None
    }

    fn percent_completed(&self) -> Option<f64> {
        None
    }

    /// Human-readable operation type, used in logs and error messages.
    fn op_type(&self) -> &str;
}
