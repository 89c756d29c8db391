//! Batch index/data-stream/template lifecycle operations:
//! `create-index`, `delete-index`, `create-data-stream`,
//! `delete-data-stream`, and the index/component/composable template
//! create/delete pairs. Grounded on the original's `CreateIndex`,
//! `DeleteIndex`, `Create/DeleteComponentTemplate`,
//! `Create/DeleteComposableTemplate`, `Create/DeleteIndexTemplate`.

use super::{default, mandatory};
use osb_core::cluster_client::ClientMap;
use osb_core::error::BenchResult;
use osb_core::meta::Meta;
use osb_core::params::Params;
use osb_core::runner::{Runner, RunnerOutcome};
use serde_json::Value;

fn weight_ops(count: u64) -> RunnerOutcome {
    let mut meta = Meta::with_success(true);
    meta.insert("weight", count);
    meta.insert("unit", "ops");
    RunnerOutcome::Dict(meta)
}

async fn exists(clients: &ClientMap, path: &str) -> BenchResult<bool> {
    let client = default(clients)?;
    let request_params = Params::new();
    match client.perform_request("HEAD", path, &request_params, None, None).await {
        Ok(response) => Ok(response.is_success()),
        Err(_) => Ok(false),
    }
}

pub struct CreateIndex;

#[async_trait::async_trait]
impl Runner for CreateIndex {
    async fn call(&self, clients: &ClientMap, params: &Params) -> BenchResult<RunnerOutcome> {
        let indices = mandatory(params, "indices", "create-index")?
        .as_array()
        .ok_or_else(|| osb_core::error::BenchError::data("'indices' must be an array of [name, body] pairs"))?;
        let client = default(clients)?;
        let request_params = Params::new();
        for entry in indices {
            let name = entry.get(0).and_then(Value::as_str).unwrap_or_default();
            let body = entry.get(1).cloned();
            client.perform_request("PUT", &format!("/{name}"), &request_params, body, None).await?;
        }
        Ok(weight_ops(indices.len() as u64))
    }

    fn op_type(&self) -> &str {
        "create-index"
    }
}

pub struct DeleteIndex;

#[async_trait::async_trait]
impl Runner for DeleteIndex {
    async fn call(&self, clients: &ClientMap, params: &Params) -> BenchResult<RunnerOutcome> {
        let indices = mandatory(params, "indices", "delete-index")?
        .as_array()
        .ok_or_else(|| osb_core::error::BenchError::data("'indices' must be an array of names"))?;
        let only_if_exists = params.get_bool_or("only-if-exists", false);
        let client = default(clients)?;
        let request_params = Params::new();
        let mut ops = 0u64;
        for entry in indices {
            let name = entry.as_str().unwrap_or_default();
            let path = format!("/{name}");
            if !only_if_exists {
                client.perform_request("DELETE", &path, &request_params, None, None).await?;
                ops += 1;
            } else if exists(clients, &path).await? {
                client.perform_request("DELETE", &path, &request_params, None, None).await?;
                ops += 1;
            }
        }
        Ok(weight_ops(ops))
    }

    fn op_type(&self) -> &str {
        "delete-index"
    }
}

pub struct CreateDataStream;

#[async_trait::async_trait]
impl Runner for CreateDataStream {
    async fn call(&self, clients: &ClientMap, params: &Params) -> BenchResult<RunnerOutcome> {
        let streams = mandatory(params, "data-streams", "create-data-stream")?
        .as_array()
        .ok_or_else(|| osb_core::error::BenchError::data("'data-streams' must be an array of names"))?;
        let client = default(clients)?;
        let request_params = Params::new();
        for entry in streams {
            let name = entry.as_str().unwrap_or_default();
            client
            .perform_request("PUT", &format!("/_data_stream/{name}"), &request_params, None, None)
            .await?;
        }
        Ok(weight_ops(streams.len() as u64))
    }

    fn op_type(&self) -> &str {
        "create-data-stream"
    }
}

pub struct DeleteDataStream;

#[async_trait::async_trait]
impl Runner for DeleteDataStream {
    async fn call(&self, clients: &ClientMap, params: &Params) -> BenchResult<RunnerOutcome> {
        let streams = mandatory(params, "data-streams", "delete-data-stream")?
        .as_array()
        .ok_or_else(|| osb_core::error::BenchError::data("'data-streams' must be an array of names"))?;
        let only_if_exists = params.get_bool_or("only-if-exists", false);
        let client = default(clients)?;
        let request_params = Params::new();
        let mut ops = 0u64;
        for entry in streams {
            let name = entry.as_str().unwrap_or_default();
            let path = format!("/_data_stream/{name}");
            if !only_if_exists || exists(clients, &path).await? {
                client.perform_request("DELETE", &path, &request_params, None, None).await?;
                ops += 1;
            }
        }
        Ok(weight_ops(ops))
    }

    fn op_type(&self) -> &str {
        "delete-data-stream"
    }
}

/// Shared shape for the three "create a named template body" operations:
/// component, composable (index) and legacy index templates differ only in
/// their REST path.
async fn create_templates(clients: &ClientMap, params: &Params, op_type: &str, path_prefix: &str) -> BenchResult<RunnerOutcome> {
    let templates = mandatory(params, "templates", op_type)?
    .as_array()
    .ok_or_else(|| osb_core::error::BenchError::data("'templates' must be an array of [name, body] pairs"))?;
    let client = default(clients)?;
    let request_params = Params::new();
    for entry in templates {
        let name = entry.get(0).and_then(Value::as_str).unwrap_or_default();
        let body = entry.get(1).cloned();
        client
        .perform_request("PUT", &format!("{path_prefix}/{name}"), &request_params, body, None)
        .await?;
    }
    Ok(weight_ops(templates.len() as u64))
}

/// Shared shape for the three "delete a named template, optionally
/// cleaning up matching indices" operations.
async fn delete_templates(clients: &ClientMap, params: &Params, op_type: &str, path_prefix: &str) -> BenchResult<RunnerOutcome> {
    let templates = mandatory(params, "templates", op_type)?
    .as_array()
    .ok_or_else(|| osb_core::error::BenchError::data("'templates' must be an array"))?;
    let only_if_exists = params.get_bool_or("only-if-exists", false);
    let client = default(clients)?;
    let request_params = Params::new();
    let mut ops = 0u64;
    for entry in templates {
        let (name, delete_matching_indices, index_pattern) = match entry {
            Value::Array(items) => (
                items.first().and_then(Value::as_str).unwrap_or_default(),
                items.get(1).and_then(Value::as_bool).unwrap_or(false),
                items.get(2).and_then(Value::as_str)),
            Value::String(name) => (name.as_str(), false, None),
            _ => ("", false, None),
        };
        let path = format!("{path_prefix}/{name}");
        if !only_if_exists || exists(clients, &path).await? {
            client.perform_request("DELETE", &path, &request_params, None, None).await?;
            ops += 1;
        }
        if delete_matching_indices {
            if let Some(pattern) = index_pattern.filter(|p| !p.is_empty()) {
                client
                .perform_request("DELETE", &format!("/{pattern}"), &request_params, None, None)
                .await?;
                ops += 1;
            }
        }
    }
    Ok(weight_ops(ops))
}

pub struct CreateComponentTemplate;

#[async_trait::async_trait]
impl Runner for CreateComponentTemplate {
    async fn call(&self, clients: &ClientMap, params: &Params) -> BenchResult<RunnerOutcome> {
        create_templates(clients, params, "create-component-template", "/_component_template").await
    }

    fn op_type(&self) -> &str {
        "create-component-template"
    }
}

pub struct DeleteComponentTemplate;

#[async_trait::async_trait]
impl Runner for DeleteComponentTemplate {
    async fn call(&self, clients: &ClientMap, params: &Params) -> BenchResult<RunnerOutcome> {
        delete_templates(clients, params, "delete-component-template", "/_component_template").await
    }

    fn op_type(&self) -> &str {
        "delete-component-template"
    }
}

pub struct CreateComposableTemplate;

#[async_trait::async_trait]
impl Runner for CreateComposableTemplate {
    async fn call(&self, clients: &ClientMap, params: &Params) -> BenchResult<RunnerOutcome> {
        create_templates(clients, params, "create-composable-template", "/_index_template").await
    }

    fn op_type(&self) -> &str {
        "create-composable-template"
    }
}

pub struct DeleteComposableTemplate;

#[async_trait::async_trait]
impl Runner for DeleteComposableTemplate {
    async fn call(&self, clients: &ClientMap, params: &Params) -> BenchResult<RunnerOutcome> {
        delete_templates(clients, params, "delete-composable-template", "/_index_template").await
    }

    fn op_type(&self) -> &str {
        "delete-composable-template"
    }
}

pub struct CreateIndexTemplate;

#[async_trait::async_trait]
impl Runner for CreateIndexTemplate {
    async fn call(&self, clients: &ClientMap, params: &Params) -> BenchResult<RunnerOutcome> {
        create_templates(clients, params, "create-index-template", "/_template").await
    }

    fn op_type(&self) -> &str {
        "create-index-template"
    }
}

pub struct DeleteIndexTemplate;

#[async_trait::async_trait]
impl Runner for DeleteIndexTemplate {
    async fn call(&self, clients: &ClientMap, params: &Params) -> BenchResult<RunnerOutcome> {
        delete_templates(clients, params, "delete-index-template", "/_template").await
    }

    fn op_type(&self) -> &str {
        "delete-index-template"
    }
}

/// `force-merge`, grounded on the original's `ForceMerge`. In
/// `mode = "polling"` it submits the merge and then polls the tasks API
/// until no `indices:admin/forcemerge` task remains running.
pub struct ForceMerge;

#[async_trait::async_trait]
impl Runner for ForceMerge {
    async fn call(&self, clients: &ClientMap, params: &Params) -> BenchResult<RunnerOutcome> {
        let index = params.get_str("index").unwrap_or("_all");
        let mut query = serde_json::Map::new();
        if let Some(max_num_segments) = params.get("max-num-segments") {
            query.insert("max_num_segments".to_string(), max_num_segments.clone());
        }
        let request_params = Params::from(query);
        let client = default(clients)?;
        client
        .perform_request("POST", &format!("/{index}/_forcemerge"), &request_params, None, None)
        .await?;

        if params.get_str("mode") == Some("polling") {
            let poll_period = params.get_f64("poll-period").unwrap_or(1.0);
            loop {
                tokio::time::sleep(std::time::Duration::from_secs_f64(poll_period)).await;
                let mut task_query = serde_json::Map::new();
                task_query.insert("actions".to_string(), Value::from("indices:admin/forcemerge"));
                let task_params = Params::from(task_query);
                let response = client.perform_request("GET", "/_tasks", &task_params, None, None).await?;
                let active_nodes = response.body.get("nodes").and_then(Value::as_object).map(|n| n.len()).unwrap_or(0);
                if active_nodes == 0 {
                    break;
                }
            }
        }

        Ok(RunnerOutcome::Dict(Meta::with_success(true)))
    }

    fn op_type(&self) -> &str {
        "force-merge"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use osb_core::cluster_client::{ClusterClient, ClusterResponse, DEFAULT_CLUSTER};
    use osb_core::request_context::RequestContext;
    use std::sync::Arc;

    struct AlwaysOk;

    #[async_trait::async_trait]
    impl ClusterClient for AlwaysOk {
        async fn perform_request(
            &self,
            _method: &str,
            _path: &str,
            _params: &Params,
            _body: Option<Value>,
            _headers: Option<std::collections::HashMap<String, String>>) -> BenchResult<ClusterResponse> {
            Ok(ClusterResponse {
                    status: 200,
                    body: Value::Null,
                })
        }

        fn new_request_context(&self) -> RequestContext {
            RequestContext::new()
        }
    }

    fn clients() -> ClientMap {
        let mut clients = ClientMap::new();
        clients.insert(DEFAULT_CLUSTER.to_string(), Arc::new(AlwaysOk));
        clients
    }

    #[tokio::test]
    async fn create_index_counts_every_entry() {
        let mut params = Params::new();
        params.insert("indices", serde_json::json!([["a", {}], ["b", {}]]));
        let outcome = CreateIndex.call(&clients, &params).await.unwrap();
        match outcome {
            RunnerOutcome::Dict(meta) => assert_eq!(meta.weight(), Some(2.0)),
            other => panic!("expected dict outcome, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn delete_index_without_only_if_exists_always_deletes() {
        let mut params = Params::new();
        params.insert("indices", serde_json::json!(["a", "b", "c"]));
        let outcome = DeleteIndex.call(&clients, &params).await.unwrap();
        match outcome {
            RunnerOutcome::Dict(meta) => assert_eq!(meta.weight(), Some(3.0)),
            other => panic!("expected dict outcome, got {other:?}"),
        }
    }
}
