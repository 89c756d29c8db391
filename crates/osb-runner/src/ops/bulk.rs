//! `bulk`: grounded on the original's `BulkIndex`.

use super::{default, mandatory};
use osb_core::cluster_client::ClientMap;
use osb_core::error::BenchResult;
use osb_core::meta::Meta;
use osb_core::params::Params;
use osb_core::runner::{Runner, RunnerOutcome};
use serde_json::Value;
use std::collections::HashMap;

pub struct Bulk;

#[async_trait::async_trait]
impl Runner for Bulk {
    async fn call(&self, clients: &ClientMap, params: &Params) -> BenchResult<RunnerOutcome> {
        let with_action_metadata = mandatory(params, "action-metadata-present", "bulk")?
        .as_bool()
        .unwrap_or(false);
        let bulk_size = mandatory(params, "bulk-size", "bulk")?.clone();
        let unit = mandatory(params, "unit", "bulk")?.as_str().unwrap_or("docs").to_string();
        let body = mandatory(params, "body", "bulk")?.clone();
        let detailed_results = params.get_bool_or("detailed-results", false);

        let mut query: HashMap<String, String> = HashMap::new();
        if let Some(pipeline) = params.get_str("pipeline") {
            query.insert("pipeline".to_string(), pipeline.to_string());
        }
        let path = if with_action_metadata {
            "/_bulk".to_string()
        } else {
            let index = params.get_str("index").unwrap_or("_all");
            format!("/{index}/_bulk")
        };

        let client = default(clients)?;
        let request_params = Params::from(query.into_iter().map(|(k, v)| (k, Value::String(v))).collect()::<serde_json::Map<_, _>>);
        let response = client.perform_request("POST", &path, &request_params, Some(body.clone()), None).await?;

        let stats = if detailed_results {
            detailed_stats(&response.body)
        } else {
            simple_stats(&response.body)
        };

        let mut meta = Meta::new();
        meta.insert("index", params.get("index").cloned().unwrap_or(Value::Null));
        meta.insert("weight", bulk_size);
        meta.insert("unit", unit);
        for (key, value) in stats {
            meta.insert(key, value);
        }
        if !meta.success() {
            meta.insert("error-type", "bulk");
        }
        Ok(RunnerOutcome::Dict(meta))
    }

    fn op_type(&self) -> &str {
        "bulk"
    }
}

fn simple_stats(response: &Value) -> Vec<(String, Value)> {
    let errors = response.get("errors").and_then(Value::as_bool).unwrap_or(false);
    let took = response.get("took").cloned().unwrap_or(Value::Null);
    let mut error_count = 0u64;
    if errors {
        if let Some(items) = response.get("items").and_then(Value::as_array) {
            for item in items {
                if let Some((_, data)) = item.as_object().and_then(|o| o.iter().next()) {
                    if is_item_error(data) {
                        error_count += 1;
                    }
                }
            }
        }
    }
    vec![
        ("took".to_string(), took),
        ("success".to_string(), Value::Bool(error_count == 0)),
        ("error-count".to_string(), Value::from(error_count)),
    ]
}

fn detailed_stats(response: &Value) -> Vec<(String, Value)> {
    let took = response.get("took").cloned().unwrap_or(Value::Null);
    let mut success_count = 0u64;
    let mut error_count = 0u64;
    if let Some(items) = response.get("items").and_then(Value::as_array) {
        for item in items {
            if let Some((_, data)) = item.as_object().and_then(|o| o.iter().next()) {
                if is_item_error(data) {
                    error_count += 1;
                } else {
                    success_count += 1;
                }
            }
        }
    }
    let mut fields = vec![
        ("took".to_string(), took),
        ("success".to_string(), Value::Bool(error_count == 0)),
        ("success-count".to_string(), Value::from(success_count)),
        ("error-count".to_string(), Value::from(error_count)),
    ];
    if let Some(ingest_took) = response.get("ingest_took") {
        fields.push(("ingest_took".to_string(), ingest_took.clone()));
    }
    fields
}

fn is_item_error(data: &serde_json::Map<String, Value>) -> bool {
    let status = data.get("status").and_then(Value::as_i64).unwrap_or(0);
    let shards_failed = data
    .get("_shards")
    .and_then(|s| s.get("failed"))
    .and_then(Value::as_i64)
    .unwrap_or(0);
    status > 299 || shards_failed > 0
}
