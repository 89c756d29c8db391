//! `cluster-health`: grounded on the original's `ClusterHealth`, whose
//! `ClusterHealthStatus` enum orders Red < Yellow < Green with Unknown as
//! the "anything goes" default.

use super::default;
use osb_core::cluster_client::ClientMap;
use osb_core::error::BenchResult;
use osb_core::meta::Meta;
use osb_core::params::Params;
use osb_core::runner::{Runner, RunnerOutcome};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Status {
    Unknown,
    Red,
    Yellow,
    Green,
}

fn status(value: &str) -> Status {
    match value.to_ascii_uppercase().as_str() {
        "RED" => Status::Red,
        "YELLOW" => Status::Yellow,
        "GREEN" => Status::Green,
        _ => Status::Unknown,
    }
}

pub struct ClusterHealth;

#[async_trait::async_trait]
impl Runner for ClusterHealth {
    async fn call(&self, clients: &ClientMap, params: &Params) -> BenchResult<RunnerOutcome> {
        let request_params = params.get("request-params").and_then(Value::as_object).cloned().unwrap_or_default();
        let expected_status = request_params
        .get("wait_for_status")
        .and_then(Value::as_str)
        .map(status)
        .unwrap_or(Status::Unknown);
        let expected_relocating_shards = if request_params.contains_key("wait_for_no_relocating_shards") {
            0u64
        } else {
            u64::MAX
        };

        let client = default(clients)?;
        let empty_params = Params::new();
        let response = client.perform_request("GET", "/_cluster/health", &empty_params, None, None).await?;

        let cluster_status = response.body.get("status").and_then(Value::as_str).unwrap_or("unknown").to_string();
        let relocating_shards = response.body.get("relocating_shards").and_then(Value::as_u64).unwrap_or(0);
        let success = status(&cluster_status) >= expected_status && relocating_shards <= expected_relocating_shards;

        let mut meta = Meta::with_success(success);
        meta.insert("weight", 1.0);
        meta.insert("unit", "ops");
        meta.insert("cluster-status", cluster_status);
        meta.insert("relocating-shards", relocating_shards);
        Ok(RunnerOutcome::Dict(meta))
    }

    fn op_type(&self) -> &str {
        "cluster-health"
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

    fn clients_with(body: Value) -> ClientMap {
        let mut clients = ClientMap::new();
        clients.insert(DEFAULT_CLUSTER.to_string(), Arc::new(FixedClient(body)));
        clients
    }

    #[tokio::test]
    async fn green_cluster_satisfies_yellow_expectation() {
        let clients = clients_with(serde_json::json!({"status": "green", "relocating_shards": 0}));
        let mut params = Params::new();
        params.insert("request-params", serde_json::json!({"wait_for_status": "yellow"}));
        let outcome = ClusterHealth.call(&clients, &params).await.unwrap();
        match outcome {
            RunnerOutcome::Dict(meta) => assert!(meta.success()),
            other => panic!("expected dict outcome, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn relocating_shards_fail_the_check_when_none_expected() {
        let clients = clients_with(serde_json::json!({"status": "green", "relocating_shards": 2}));
        let mut params = Params::new();
        params.insert(
            "request-params",
            serde_json::json!({"wait_for_status": "green", "wait_for_no_relocating_shards": true}));
        let outcome = ClusterHealth.call(&clients, &params).await.unwrap();
        match outcome {
            RunnerOutcome::Dict(meta) => assert!(!meta.success()),
            other => panic!("expected dict outcome, got {other:?}"),
        }
    }
}
