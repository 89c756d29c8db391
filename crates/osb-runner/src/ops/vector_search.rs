//! `vector-search`: a `search` request additionally scored against a
//! ground-truth neighbor list, grounded on the original's
//! `VectorSearchQueryRunnerTests` (the runner itself is `Query`, invoked
//! with `operation-type = vector-search`; scoring is inlined here as a
//! recognizable shift of its contract into its own built-in op).

use super::{default, mandatory, mandatory_str};
use osb_core::cluster_client::ClientMap;
use osb_core::error::BenchResult;
use osb_core::meta::Meta;
use osb_core::params::Params;
use osb_core::runner::{Runner, RunnerOutcome};
use serde_json::Value;
use std::collections::HashSet;
use std::time::Instant;

pub struct VectorSearch;

#[async_trait::async_trait]
impl Runner for VectorSearch {
    async fn call(&self, clients: &ClientMap, params: &Params) -> BenchResult<RunnerOutcome> {
        let index = mandatory_str(params, "index", "vector-search")?;
        let body = mandatory(params, "body", "vector-search")?.clone();
        let client = default(clients)?;
        let request_params = Params::new();
        let response = client
        .perform_request("GET", &format!("/{index}/_search"), &request_params, Some(body), None)
        .await?;

        let mut meta = Meta::with_success(true);
        meta.insert("weight", 1.0);
        meta.insert("unit", "ops");
        let total = response
        .body
        .get("hits")
        .and_then(|h| h.get("total"))
        .and_then(|t| t.get("value"))
        .cloned()
        .unwrap_or(Value::from(0));
        let relation = response
        .body
        .get("hits")
        .and_then(|h| h.get("total"))
        .and_then(|t| t.get("relation"))
        .cloned()
        .unwrap_or(Value::from("eq"));
        meta.insert("hits", total);
        meta.insert("hits_relation", relation);
        meta.insert("timed_out", response.body.get("timed_out").cloned().unwrap_or(Value::Bool(false)));
        meta.insert("took", response.body.get("took").cloned().unwrap_or(Value::from(0)));

        let started = Instant::now();
        let retrieved: Vec<Value> = response
        .body
        .get("hits")
        .and_then(|h| h.get("hits"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
        let retrieved_ids: Vec<Value> = retrieved.iter().filter_map(|hit| hit.get("_id").cloned()).collect();

        if let Some(neighbors) = params.get("neighbors").and_then(Value::as_array) {
            // a radial query (distance/score threshold rather than top-k)
            // has already had its predicate applied server-side by the
            // search body; `neighbors` here is the full ground-truth set
            // within that threshold, not a top-k list, so recall compares
            // the full retrieved set against the full ground truth instead
            // of truncating both to `k`.
            let radial_key = if params.get("max-distance").is_some() {
                Some("recall@max_distance")
            } else if params.get("min-score").is_some() {
                Some("recall@min_score")
            } else {
                None
            };

            if let Some(key) = radial_key {
                let ground_truth: HashSet<String> = neighbors.iter().map(value_key).collect();
                let retrieved_set: HashSet<String> = retrieved_ids.iter().map(value_key).collect();
                let intersection = ground_truth.intersection(&retrieved_set).count();
                let recall = if ground_truth.is_empty() {
                    1.0
                } else {
                    intersection as f64 / ground_truth.len() as f64
                };
                meta.insert(key, recall);
            } else {
                let k = params.get_u64("k").unwrap_or(retrieved_ids.len() as u64) as usize;
                let ground_truth: HashSet<String> = neighbors.iter().take(k).map(value_key).collect();
                let retrieved_set: HashSet<String> = retrieved_ids.iter().take(k).map(value_key).collect();
                let intersection = ground_truth.intersection(&retrieved_set).count();
                let recall_at_k = if k == 0 { 0.0 } else { intersection as f64 / k as f64 };
                meta.insert("recall@k", recall_at_k);

                let top1_ground_truth = neighbors.first().map(value_key);
                let top1_retrieved = retrieved_ids.first().map(value_key);
                let recall_at_1 = match (top1_ground_truth, top1_retrieved) {
                    (Some(expected), Some(actual)) if expected == actual => 1.0,
                    _ => 0.0,
                };
                meta.insert("recall@1", recall_at_1);
            }
        }
        meta.insert("recall_time_ms", started.elapsed().as_secs_f64() * 1000.0);

        Ok(RunnerOutcome::Dict(meta))
    }

    fn op_type(&self) -> &str {
        "vector-search"
    }
}

fn value_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
