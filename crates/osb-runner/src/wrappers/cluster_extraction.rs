//! Cluster-extraction wrapper: maps the multi-client map down to the
//! single default client unless the delegate advertises
//! `multi_cluster = true`.

use osb_core::cluster_client::{ClientMap, DEFAULT_CLUSTER};
use osb_core::error::{BenchError, BenchResult};
use osb_core::params::Params;
use osb_core::runner::{Runner, RunnerOutcome};
use std::sync::Arc;

pub struct ClusterExtractionWrapper {
    delegate: Arc<dyn Runner>,
}

impl ClusterExtractionWrapper {
    pub fn new(delegate: Arc<dyn Runner>) -> Self {
        Self { delegate }
    }
}

#[async_trait::async_trait]
impl Runner for ClusterExtractionWrapper {
    async fn call(&self, clients: &ClientMap, params: &Params) -> BenchResult<RunnerOutcome> {
        if self.delegate.multi_cluster() {
            return self.delegate.call(clients, params).await;
        }
        let default = clients
        .get(DEFAULT_CLUSTER)
        .ok_or_else(|| BenchError::data("no default cluster configured"))?;
        let mut single = ClientMap::new();
        single.insert(DEFAULT_CLUSTER.to_string(), Arc::clone(default));
        self.delegate.call(&single, params).await
    }

    fn multi_cluster(&self) -> bool {
        self.delegate.multi_cluster()
    }

    fn completed(&self) -> Option<bool> {
        self.delegate.completed()
    }

    fn percent_completed(&self) -> Option<f64> {
        self.delegate.percent_completed()
    }

    fn op_type(&self) -> &str {
        self.delegate.op_type()
    }
}
