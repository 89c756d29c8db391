//! Completion wrapper: forwards `completed`/`percent_completed` from the
//! delegate, grounded on the original's `WithCompletion`/`NoCompletion`
//! `Delegator` pair (both collapse to one forwarding decorator here, since
//! the `Runner` trait already defaults those methods to `None`).

use osb_core::cluster_client::ClientMap;
use osb_core::error::BenchResult;
use osb_core::params::Params;
use osb_core::runner::{Runner, RunnerOutcome};
use std::sync::Arc;

pub struct CompletionWrapper {
    delegate: Arc<dyn Runner>,
}

impl CompletionWrapper {
    pub fn new(delegate: Arc<dyn Runner>) -> Self {
        Self { delegate }
    }
}

#[async_trait::async_trait]
impl Runner for CompletionWrapper {
    async fn call(&self, clients: &ClientMap, params: &Params) -> BenchResult<RunnerOutcome> {
        self.delegate.call(clients, params).await
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
