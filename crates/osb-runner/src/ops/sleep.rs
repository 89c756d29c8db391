//! `sleep`: suspends for a fixed duration without issuing any request,
//! grounded on the original's `Sleep`. Still brackets request-context
//! timing marks on the default cluster's client so executor-side latency
//! accounting sees the pause.

use super::mandatory;
use osb_core::cluster_client::ClientMap;
use osb_core::error::BenchResult;
use osb_core::meta::Meta;
use osb_core::params::Params;
use osb_core::runner::{Runner, RunnerOutcome};

pub struct Sleep;

#[async_trait::async_trait]
impl Runner for Sleep {
    async fn call(&self, clients: &ClientMap, params: &Params) -> BenchResult<RunnerOutcome> {
        let duration = mandatory(params, "duration", "sleep")?
        .as_f64()
        .ok_or_else(|| osb_core::error::BenchError::data("'duration' must be a number of seconds"))?;
        let context = super::default(clients)?.new_request_context();
        context.on_request_start();
        tokio::time::sleep(std::time::Duration::from_secs_f64(duration)).await;
        context.on_request_end();
        Ok(RunnerOutcome::Dict(Meta::with_success(true)))
    }

    fn op_type(&self) -> &str {
        "sleep"
    }
}
