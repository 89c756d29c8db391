//! Async search lifecycle (`submit-async-search`, `get-async-search`,
//! `delete-async-search`), grounded on the original's matching classes.
//! Search ids travel through the composite context the same way they do
//! in the original's `CompositeContext`.

use super::{default, mandatory, mandatory_str};
use crate::composite_context;
use osb_core::cluster_client::ClientMap;
use osb_core::error::BenchResult;
use osb_core::meta::Meta;
use osb_core::params::Params;
use osb_core::runner::{Runner, RunnerOutcome};
use serde_json::Value;

pub struct SubmitAsyncSearch;

#[async_trait::async_trait]
impl Runner for SubmitAsyncSearch {
    async fn call(&self, clients: &ClientMap, params: &Params) -> BenchResult<RunnerOutcome> {
        let body = mandatory(params, "body", "submit-async-search")?.clone();
        let index = params.get_str("index");
        let request_params = params.get("request-params").and_then(Value::as_object).cloned().map(Params::from).unwrap_or_default();
        let path = match index {
            Some(index) => format!("/{index}/_async_search"),
            None => "/_async_search".to_string(),
        };
        let client = default(clients)?;
        let response = client.perform_request("POST", &path, &request_params, Some(body), None).await?;

        let op_name = mandatory_str(params, "name", "submit-async-search")?;
        let search_id = response.body.get("id").cloned().unwrap_or(Value::Null);
        composite_context::put(op_name, search_id)?;

        Ok(RunnerOutcome::Dict(Meta::with_success(true)))
    }

    fn op_type(&self) -> &str {
        "submit-async-search"
    }
}

/// Yields `(search_id, op_name)` pairs for every named search whose id is
/// still present in the composite context (a falsy/missing id means that
/// search has already completed and been cleaned up).
fn async_search_ids(op_names: &[String]) -> Vec<(String, String)> {
    op_names
    .iter()
    .filter_map(|name| match composite_context::get(name) {
            Ok(value) if !value.is_null() => value.as_str().map(|id| (id.to_string(), name.clone())),
            _ => None,
        })
    .collect()
}

fn op_names(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect(),
        _ => Vec::new(),
    }
}

pub struct GetAsyncSearch;

#[async_trait::async_trait]
impl Runner for GetAsyncSearch {
    async fn call(&self, clients: &ClientMap, params: &Params) -> BenchResult<RunnerOutcome> {
        let searches = mandatory(params, "retrieve-results-for", "get-async-search")?.clone();
        let request_params = params.get("request-params").and_then(Value::as_object).cloned().map(Params::from).unwrap_or_default();
        let client = default(clients)?;

        let mut success = true;
        let mut stats = serde_json::Map::new();
        for (search_id, search) in async_search_ids(&op_names(&searches)) {
            let response = client
            .perform_request("GET", &format!("/_async_search/{search_id}"), &request_params, None, None)
            .await?;
            let is_running = response.body.get("is_running").and_then(Value::as_bool).unwrap_or(false);
            success = success && !is_running;
            if !is_running {
                let inner = response.body.get("response").cloned().unwrap_or(Value::Null);
                stats.insert(
                    search,
                    serde_json::json!({
                            "hits": inner.get_path("hits.total.value"),
                            "hits_relation": inner.get_path("hits.total.relation"),
                            "timed_out": inner.get("timed_out"),
                            "took": inner.get("took"),
                        }));
            }
        }

        let mut meta = Meta::with_success(success);
        meta.insert("weight", stats.len() as u64);
        meta.insert("unit", "ops");
        meta.insert("stats", Value::Object(stats));
        Ok(RunnerOutcome::Dict(meta))
    }

    fn op_type(&self) -> &str {
        "get-async-search"
    }
}

pub struct DeleteAsyncSearch;

#[async_trait::async_trait]
impl Runner for DeleteAsyncSearch {
    async fn call(&self, clients: &ClientMap, params: &Params) -> BenchResult<RunnerOutcome> {
        let searches = mandatory(params, "delete-results-for", "delete-async-search")?.clone();
        let client = default(clients)?;
        let empty_params = Params::new();
        for (search_id, search) in async_search_ids(&op_names(&searches)) {
            client
            .perform_request("DELETE", &format!("/_async_search/{search_id}"), &empty_params, None, None)
            .await?;
            composite_context::remove(&search)?;
        }
        Ok(RunnerOutcome::Dict(Meta::with_success(true)))
    }

    fn op_type(&self) -> &str {
        "delete-async-search"
    }
}

trait GetPath {
    fn get_path(&self, path: &str) -> Value;
}

impl GetPath for Value {
    fn get_path(&self, path: &str) -> Value {
        let mut current = self;
        for segment in path.split('.') {
            match current.get(segment) {
                Some(value) => current = value,
                None => return Value::Null,
            }
        }
        current.clone()
    }
}
