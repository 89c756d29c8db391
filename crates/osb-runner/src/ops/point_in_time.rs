//! `open-point-in-time` / `close-point-in-time`, grounded on the
//! original's `OpenPointInTime`/`ClosePointInTime`. The pit id travels
//! through the composite context the same way it does there.

use super::{default, mandatory_str};
use crate::composite_context;
use osb_core::cluster_client::ClientMap;
use osb_core::error::BenchResult;
use osb_core::meta::Meta;
use osb_core::params::Params;
use osb_core::runner::{Runner, RunnerOutcome};
use serde_json::Value;

pub struct OpenPointInTime;

#[async_trait::async_trait]
impl Runner for OpenPointInTime {
    async fn call(&self, clients: &ClientMap, params: &Params) -> BenchResult<RunnerOutcome> {
        let op_name = mandatory_str(params, "name", "open-point-in-time")?;
        let index = mandatory_str(params, "index", "open-point-in-time")?;
        let keep_alive = params.get_str("keep-alive").unwrap_or("1m");
        let mut query = params.get("request-params").and_then(Value::as_object).cloned().unwrap_or_default();
        query.insert("keep_alive".to_string(), Value::from(keep_alive));
        let request_params = Params::from(query);

        let client = default(clients)?;
        let response = client
        .perform_request("POST", &format!("/{index}/_search/point_in_time"), &request_params, None, None)
        .await?;
        let pit_id = response.body.get("id").cloned().unwrap_or(Value::Null);
        composite_context::put(op_name, pit_id)?;

        Ok(RunnerOutcome::Dict(Meta::with_success(true)))
    }

    fn op_type(&self) -> &str {
        "open-point-in-time"
    }
}

pub struct ClosePointInTime;

#[async_trait::async_trait]
impl Runner for ClosePointInTime {
    async fn call(&self, clients: &ClientMap, params: &Params) -> BenchResult<RunnerOutcome> {
        let pit_op = mandatory_str(params, "with-point-in-time-from", "close-point-in-time")?;
        let pit_id = composite_context::get(pit_op)?;
        let request_params = params.get("request-params").and_then(Value::as_object).cloned().map(Params::from).unwrap_or_default();
        let body = serde_json::json!({"id": pit_id});

        let client = default(clients)?;
        client
        .perform_request("DELETE", "/_search/point_in_time", &request_params, Some(body), None)
        .await?;
        composite_context::remove(pit_op)?;

        Ok(RunnerOutcome::Dict(Meta::with_success(true)))
    }

    fn op_type(&self) -> &str {
        "close-point-in-time"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use osb_core::cluster_client::{ClusterClient, ClusterResponse, DEFAULT_CLUSTER};
    use osb_core::request_context::RequestContext;
    use std::sync::Arc;

    struct FixedClient(Value);

    #[async_trait::async_trait]
    impl ClusterClient for FixedClient {
        async fn perform_request(
            &self,
            _method: &str,
            _path: &str,
            _params: &Params,
            _body: Option<Value>,
            _headers: Option<std::collections::HashMap<String, String>>) -> BenchResult<ClusterResponse> {
            Ok(ClusterResponse {
                    status: 200,
                    body: self.0.clone(),
                })
        }

        fn new_request_context(&self) -> RequestContext {
            RequestContext::new()
        }
    }

    #[tokio::test]
    async fn open_then_close_round_trips_the_pit_id() {
        let mut open_clients = ClientMap::new();
        open_clients.insert(DEFAULT_CLUSTER.to_string(), Arc::new(FixedClient(serde_json::json!({"id": "pit-xyz"}))));
        let mut open_params = Params::new();
        open_params.insert("name", "pit-op");
        open_params.insert("index", "logs");

        composite_context::scope(async {
                OpenPointInTime.call(&open_clients, &open_params).await.unwrap();

                let mut close_clients = ClientMap::new();
                close_clients.insert(DEFAULT_CLUSTER.to_string(), Arc::new(FixedClient(Value::Null)));
                let mut close_params = Params::new();
                close_params.insert("with-point-in-time-from", "pit-op");

                ClosePointInTime.call(&close_clients, &close_params).await.unwrap();
                assert!(composite_context::get("pit-op").is_err());
            })
        .await;
    }
}
