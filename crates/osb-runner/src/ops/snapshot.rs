//! Snapshot lifecycle (`delete-snapshot-repository`,
//! `create-snapshot-repository`, `create-snapshot`,
//! `wait-for-snapshot-create`, `restore-snapshot`), grounded on the
//! original's matching classes.

use super::{default, mandatory, mandatory_str};
use osb_core::cluster_client::ClientMap;
use osb_core::error::{BenchError, BenchResult};
use osb_core::meta::Meta;
use osb_core::params::Params;
use osb_core::runner::{Runner, RunnerOutcome};
use serde_json::Value;
use std::time::Duration;

pub struct DeleteSnapshotRepository;

#[async_trait::async_trait]
impl Runner for DeleteSnapshotRepository {
    async fn call(&self, clients: &ClientMap, params: &Params) -> BenchResult<RunnerOutcome> {
        let repository = mandatory_str(params, "repository", "delete-snapshot-repository")?;
        let client = default(clients)?;
        let empty_params = Params::new();
        client
        .perform_request("DELETE", &format!("/_snapshot/{repository}"), &empty_params, None, None)
        .await?;
        Ok(RunnerOutcome::Dict(Meta::with_success(true)))
    }

    fn op_type(&self) -> &str {
        "delete-snapshot-repository"
    }
}

pub struct CreateSnapshotRepository;

#[async_trait::async_trait]
impl Runner for CreateSnapshotRepository {
    async fn call(&self, clients: &ClientMap, params: &Params) -> BenchResult<RunnerOutcome> {
        let repository = mandatory_str(params, "repository", "create-snapshot-repository")?;
        let body = mandatory(params, "body", "create-snapshot-repository")?.clone();
        let request_params = params.get("request-params").and_then(Value::as_object).cloned().map(Params::from).unwrap_or_default();
        let client = default(clients)?;
        client
        .perform_request("PUT", &format!("/_snapshot/{repository}"), &request_params, Some(body), None)
        .await?;
        Ok(RunnerOutcome::Dict(Meta::with_success(true)))
    }

    fn op_type(&self) -> &str {
        "create-snapshot-repository"
    }
}

pub struct CreateSnapshot;

#[async_trait::async_trait]
impl Runner for CreateSnapshot {
    async fn call(&self, clients: &ClientMap, params: &Params) -> BenchResult<RunnerOutcome> {
        let repository = mandatory_str(params, "repository", "create-snapshot")?;
        let snapshot = mandatory_str(params, "snapshot", "create-snapshot")?;
        let body = mandatory(params, "body", "create-snapshot")?.clone();
        let wait_for_completion = params.get_bool_or("wait-for-completion", false);
        let mut query = serde_json::Map::new();
        query.insert("wait_for_completion".to_string(), Value::Bool(wait_for_completion));
        let request_params = Params::from(query);
        let client = default(clients)?;
        client
        .perform_request(
            "PUT",
            &format!("/_snapshot/{repository}/{snapshot}"),
            &request_params,
            Some(body),
            None)
        .await?;
        Ok(RunnerOutcome::Dict(Meta::with_success(true)))
    }

    fn op_type(&self) -> &str {
        "create-snapshot"
    }
}

pub struct WaitForSnapshotCreate;

#[async_trait::async_trait]
impl Runner for WaitForSnapshotCreate {
    async fn call(&self, clients: &ClientMap, params: &Params) -> BenchResult<RunnerOutcome> {
        let repository = mandatory_str(params, "repository", "wait-for-snapshot-create")?;
        let snapshot = mandatory_str(params, "snapshot", "wait-for-snapshot-create")?;
        let wait_period = params.get_f64("completion-recheck-wait-period").unwrap_or(1.0);
        let client = default(clients)?;
        let empty_params = Params::new();

        let stats = loop {
            let response = client
            .perform_request(
                "GET",
                &format!("/_snapshot/{repository}/{snapshot}/_status"),
                &empty_params,
                None,
                None)
            .await?;
            if let Some(entry) = response.body.get("snapshots").and_then(Value::as_array).and_then(|s| s.first()) {
                let state = entry.get("state").and_then(Value::as_str).unwrap_or("");
                if state == "FAILED" {
                    return Err(BenchError::assertion(format!(
                                "Snapshot [{snapshot}] failed. Please check logs."
                            )));
                }
                if state == "SUCCESS" {
                    break entry.get("stats").cloned().unwrap_or(Value::Null);
                }
            }
            tokio::time::sleep(Duration::from_secs_f64(wait_period)).await;
        };

        let size = stats.get_path_u64("total.size_in_bytes");
        let file_count = stats.get_path_u64("total.file_count");
        let start_time_millis = stats.get_path_u64("start_time_in_millis");
        let duration_millis = stats.get_path_u64("time_in_millis");
        let duration_seconds = duration_millis as f64 / 1000.0;

        let mut meta = Meta::with_success(true);
        meta.insert("weight", size as f64);
        meta.insert("unit", "byte");
        meta.insert("throughput", if duration_seconds > 0.0 { size as f64 / duration_seconds } else { 0.0 });
        meta.insert("start_time_millis", start_time_millis);
        meta.insert("stop_time_millis", start_time_millis + duration_millis);
        meta.insert("duration", duration_millis);
        meta.insert("file_count", file_count);
        Ok(RunnerOutcome::Dict(meta))
    }

    fn op_type(&self) -> &str {
        "wait-for-snapshot-create"
    }
}

pub struct RestoreSnapshot;

#[async_trait::async_trait]
impl Runner for RestoreSnapshot {
    async fn call(&self, clients: &ClientMap, params: &Params) -> BenchResult<RunnerOutcome> {
        let repository = mandatory_str(params, "repository", "restore-snapshot")?;
        let snapshot = mandatory_str(params, "snapshot", "restore-snapshot")?;
        let wait_for_completion = params.get_bool_or("wait-for-completion", false);
        let body = params.get("body").cloned().unwrap_or(Value::Object(Default::default()));
        let mut query = serde_json::Map::new();
        query.insert("wait_for_completion".to_string(), Value::Bool(wait_for_completion));
        let request_params = Params::from(query);
        let client = default(clients)?;
        client
        .perform_request(
            "POST",
            &format!("/_snapshot/{repository}/{snapshot}/_restore"),
            &request_params,
            Some(body),
            None)
        .await?;
        Ok(RunnerOutcome::Dict(Meta::with_success(true)))
    }

    fn op_type(&self) -> &str {
        "restore-snapshot"
    }
}

trait GetPathU64 {
    fn get_path_u64(&self, path: &str) -> u64;
}

impl GetPathU64 for Value {
    fn get_path_u64(&self, path: &str) -> u64 {
        let mut current = self;
        for segment in path.split('.') {
            current = match current.get(segment) {
                Some(value) => value,
                None => return 0,
            };
        }
        current.as_u64().unwrap_or(0)
    }
}
