//! Transform lifecycle (`create-transform`, `start-transform`,
//! `wait-for-transform`, `delete-transform`), grounded on the original's
//! matching classes. `WaitForTransform` carries progress state across
//! calls the same way the original instance does, via an internal mutex
//! rather than `&mut self` (the `Runner` contract takes `&self`).

use super::{default, mandatory_str};
use osb_core::cluster_client::ClientMap;
use osb_core::error::{BenchError, BenchResult};
use osb_core::meta::Meta;
use osb_core::params::Params;
use osb_core::runner::{Runner, RunnerOutcome};
use parking_lot::Mutex;
use serde_json::Value;
use std::time::{Duration, Instant};

pub struct CreateTransform;

#[async_trait::async_trait]
impl Runner for CreateTransform {
    async fn call(&self, clients: &ClientMap, params: &Params) -> BenchResult<RunnerOutcome> {
        let transform_id = mandatory_str(params, "transform-id", "create-transform")?;
        let body = super::mandatory(params, "body", "create-transform")?.clone();
        let defer_validation = params.get_bool_or("defer-validation", false);
        let mut query = serde_json::Map::new();
        query.insert("defer_validation".to_string(), Value::Bool(defer_validation));
        let request_params = Params::from(query);
        let client = default(clients)?;
        client
        .perform_request("PUT", &format!("/_transform/{transform_id}"), &request_params, Some(body), None)
        .await?;
        Ok(RunnerOutcome::Dict(Meta::with_success(true)))
    }

    fn op_type(&self) -> &str {
        "create-transform"
    }
}

pub struct StartTransform;

#[async_trait::async_trait]
impl Runner for StartTransform {
    async fn call(&self, clients: &ClientMap, params: &Params) -> BenchResult<RunnerOutcome> {
        let transform_id = mandatory_str(params, "transform-id", "start-transform")?;
        let client = default(clients)?;
        let empty_params = Params::new();
        client
        .perform_request("POST", &format!("/_transform/{transform_id}/_start"), &empty_params, None, None)
        .await?;
        Ok(RunnerOutcome::Dict(Meta::with_success(true)))
    }

    fn op_type(&self) -> &str {
        "start-transform"
    }
}

pub struct DeleteTransform;

#[async_trait::async_trait]
impl Runner for DeleteTransform {
    async fn call(&self, clients: &ClientMap, params: &Params) -> BenchResult<RunnerOutcome> {
        let transform_id = mandatory_str(params, "transform-id", "delete-transform")?;
        let force = params.get_bool_or("force", false);
        let mut query = serde_json::Map::new();
        query.insert("force".to_string(), Value::Bool(force));
        let request_params = Params::from(query);
        let client = default(clients)?;
        let _ = client
        .perform_request("DELETE", &format!("/_transform/{transform_id}"), &request_params, None, None)
        .await;
        Ok(RunnerOutcome::Dict(Meta::with_success(true)))
    }

    fn op_type(&self) -> &str {
        "delete-transform"
    }
}

#[derive(Default)]
struct ProgressState {
    completed: bool,
    percent_completed: f64,
    start_time: Option<Instant>,
    last_documents_processed: i64,
    last_processing_time: i64,
}

pub struct WaitForTransform {
    state: Mutex<ProgressState>,
}

impl Default for WaitForTransform {
    fn default() -> Self {
        Self {
            state: Mutex::new(ProgressState::default()),
        }
    }
}

#[async_trait::async_trait]
impl Runner for WaitForTransform {
    async fn call(&self, clients: &ClientMap, params: &Params) -> BenchResult<RunnerOutcome> {
        let transform_id = mandatory_str(params, "transform-id", "wait-for-transform")?;
        let force = params.get_bool_or("force", false);
        let wait_for_completion = params.get_bool_or("wait-for-completion", true);
        let wait_for_checkpoint = params.get_bool_or("wait-for-checkpoint", true);
        let transform_timeout = params.get_f64("transform-timeout").unwrap_or(3600.0);
        let poll_interval = params.get_f64("poll-interval").unwrap_or(0.5);

        let client = default(clients)?;

        let started_now = {
            let mut state = self.state.lock();
            if state.start_time.is_none() {
                state.start_time = Some(Instant::now());
                true
            } else {
                false
            }
        };
        if started_now {
            let mut query = serde_json::Map::new();
            query.insert("force".to_string(), Value::Bool(force));
            query.insert("wait_for_completion".to_string(), Value::Bool(false));
            query.insert("wait_for_checkpoint".to_string(), Value::Bool(wait_for_checkpoint));
            let request_params = Params::from(query);
            client
            .perform_request("POST", &format!("/_transform/{transform_id}/_stop"), &request_params, None, None)
            .await?;
        }

        loop {
            let empty_params = Params::new();
            let response = client
            .perform_request("GET", &format!("/_transform/{transform_id}/_stats"), &empty_params, None, None)
            .await?;
            let entry = response.body.get("transforms").and_then(Value::as_array).and_then(|a| a.first()).cloned().unwrap_or(Value::Null);
            let state_name = entry.get("state").and_then(Value::as_str).unwrap_or("");
            let transform_stats = entry.get("stats").cloned().unwrap_or(Value::Null);

            let elapsed = {
                let state = self.state.lock();
                state.start_time.map(|t| t.elapsed().as_secs_f64()).unwrap_or(0.0)
            };
            if elapsed > transform_timeout {
                return Err(BenchError::task_assertion(format!(
                            "Transform [{transform_id}] timed out after [{transform_timeout}] seconds. Please consider increasing the timeout in the workload."
                        )));
            }
            if state_name == "failed" {
                let reason = entry.get("reason").and_then(Value::as_str).unwrap_or("unknown");
                return Err(BenchError::task_assertion(format!("Transform [{transform_id}] failed with [{reason}].")));
            }

            let mut state = self.state.lock();
            if state_name == "stopped" || !wait_for_completion {
                state.completed = true;
                state.percent_completed = 1.0;
            } else {
                let percent = entry.get_path("checkpointing.next.checkpoint_progress.percent_complete").and_then(Value::as_f64).unwrap_or(0.0);
                state.percent_completed = percent / 100.0;
            }

            let documents_processed = transform_stats.get("documents_processed").and_then(Value::as_i64).unwrap_or(0);
            let mut processing_time = transform_stats.get("search_time_in_ms").and_then(Value::as_i64).unwrap_or(0);
            processing_time += transform_stats.get("processing_time_in_ms").and_then(Value::as_i64).unwrap_or(0);
            processing_time += transform_stats.get("index_time_in_ms").and_then(Value::as_i64).unwrap_or(0);
            let documents_processed_delta = documents_processed - state.last_documents_processed;
            let processing_time_delta = processing_time - state.last_processing_time;

            if state.completed || (documents_processed_delta > 5000 && processing_time_delta > 500) {
                let throughput = if state.completed {
                    if processing_time > 0 {
                        documents_processed as f64 / processing_time as f64 * 1000.0
                    } else {
                        0.0
                    }
                } else if processing_time_delta > 0 {
                    documents_processed_delta as f64 / processing_time_delta as f64 * 1000.0
                } else {
                    0.0
                };

                state.last_documents_processed = documents_processed;
                state.last_processing_time = processing_time;
                drop(state);

                let mut meta = Meta::with_success(true);
                meta.insert("transform-id", transform_id);
                meta.insert("weight", documents_processed as f64);
                meta.insert("unit", "docs");
                meta.insert("throughput", throughput);
                return Ok(RunnerOutcome::Dict(meta));
            }
            drop(state);
            tokio::time::sleep(Duration::from_secs_f64(poll_interval)).await;
        }
    }

    fn completed(&self) -> Option<bool> {
        Some(self.state.lock().completed)
    }

    fn percent_completed(&self) -> Option<f64> {
        Some(self.state.lock().percent_completed)
    }

    fn op_type(&self) -> &str {
        "wait-for-transform"
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
    async fn stopped_transform_reports_completed_and_full_progress() {
        let mut clients = ClientMap::new();
        clients.insert(
            DEFAULT_CLUSTER.to_string(),
            Arc::new(FixedClient(serde_json::json!({
                            "transforms": [{
                                    "state": "stopped",
                                    "stats": {"documents_processed": 9000, "processing_time_in_ms": 3000}
                                }]
                        }))));
        let mut params = Params::new();
        params.insert("transform-id", "t1");

        let runner = WaitForTransform::default();
        let outcome = runner.call(&clients, &params).await.unwrap();
        assert_eq!(runner.completed(), Some(true));
        assert_eq!(runner.percent_completed(), Some(1.0));
        match outcome {
            RunnerOutcome::Dict(meta) => assert_eq!(meta.get_path("throughput").and_then(Value::as_f64), Some(3000.0)),
            other => panic!("expected dict outcome, got {other:?}"),
        }
    }
}
