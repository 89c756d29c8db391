//! The runner registry: `register_runner(op_type, runner)`
//! installs a runner wrapped `Completion → Assertion → ClusterExtraction →
//! Base` and keyed by operation-type string.

use crate::wrappers::{AssertionWrapper, ClusterExtractionWrapper, CompletionWrapper};
use dashmap::DashMap;
use osb_core::error::{BenchError, BenchResult};
use osb_core::runner::Runner;
use std::sync::Arc;

#[derive(Default)]
pub struct Registry {
    runners: DashMap<String, Arc<dyn Runner>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps `base` in the fixed registry chain and installs it under
    /// `op_type`, replacing any previous registration for that type.
    pub fn register(&self, op_type: impl Into<String>, base: Arc<dyn Runner>) {
        let wrapped: Arc<dyn Runner> = Arc::new(CompletionWrapper::new(Arc::new(AssertionWrapper::new(Arc::new(
                            ClusterExtractionWrapper::new(base))))));
        self.runners.insert(op_type.into(), wrapped);
    }

    pub fn get(&self, op_type: &str) -> Option<Arc<dyn Runner>> {
        self.runners.get(op_type).map(|entry| Arc::clone(entry.value()))
    }

    pub fn resolve(&self, op_type: &str) -> BenchResult<Arc<dyn Runner>> {
        self.get(op_type)
        .ok_or_else(|| BenchError::not_found(format!("no runner registered for operation type '{op_type}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use osb_core::cluster_client::ClientMap;
    use osb_core::error::BenchResult as Result;
    use osb_core::params::Params;
    use osb_core::runner::RunnerOutcome;

    struct Noop;

    #[async_trait::async_trait]
    impl Runner for Noop {
        async fn call(&self, _clients: &ClientMap, _params: &Params) -> Result<RunnerOutcome> {
            Ok(RunnerOutcome::None)
        }

        fn op_type(&self) -> &str {
            "noop"
        }
    }

    #[test]
    fn unregistered_op_type_resolves_to_a_not_found_error() {
        let registry = Registry::new();
        assert!(registry.resolve("bulk").is_err());
    }

    #[tokio::test]
    async fn a_registered_runner_is_reachable_through_all_three_wrappers() {
        let registry = Registry::new();
        registry.register("noop", Arc::new(Noop));
        let runner = registry.resolve("noop").unwrap();
        let clients = ClientMap::new();
        let params = Params::new();
        assert!(matches!(runner.call(&clients, &params).await.unwrap(), RunnerOutcome::None));
    }
}
