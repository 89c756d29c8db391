//! `search` / `paginated-search` / `scroll-search`: grounded on the
//! original's `Query` runner and its three inner strategies.

use super::{default, mandatory, mandatory_str};
use crate::composite_context;
use osb_core::cluster_client::ClientMap;
use osb_core::error::BenchResult;
use osb_core::meta::Meta;
use osb_core::params::Params;
use osb_core::runner::{Runner, RunnerOutcome};
use serde_json::Value;

pub struct Search;

#[async_trait::async_trait]
impl Runner for Search {
    async fn call(&self, clients: &ClientMap, params: &Params) -> BenchResult<RunnerOutcome> {
        match params.get_str("operation-type") {
            Some("paginated-search") => paginated_search(clients, params).await,
            Some("scroll-search") => scroll_search(clients, params).await,
            _ if params.get("pages").is_some() => scroll_search(clients, params).await,
            _ => request_body_search(clients, params).await,
        }
    }

    fn op_type(&self) -> &str {
        "search"
    }
}

fn search_path(index: Option<&str>) -> String {
    match index {
        Some(index) => format!("/{index}/_search"),
        None => "/_search".to_string(),
    }
}

async fn request_body_search(clients: &ClientMap, params: &Params) -> BenchResult<RunnerOutcome> {
    let index = mandatory_str(params, "index", "search")?;
    let mut body = mandatory(params, "body", "search")?.clone();
    if let Some(size) = params.get_u64("results-per-page") {
        if let Some(object) = body.as_object_mut() {
            object.insert("size".to_string(), Value::from(size));
        }
    }
    let client = default(clients)?;
    let request_params = Params::new();
    let response = client
    .perform_request("GET", &search_path(Some(index)), &request_params, Some(body), None)
    .await?;

    let mut meta = Meta::with_success(true);
    meta.insert("weight", 1.0);
    meta.insert("unit", "ops");
    if params.get_bool_or("detailed-results", false) {
        meta.insert("hits", hits_total(&response.body));
        meta.insert("hits_relation", hits_relation(&response.body));
        meta.insert("timed_out", response.body.get("timed_out").cloned().unwrap_or(Value::Bool(false)));
        meta.insert("took", response.body.get("took").cloned().unwrap_or(Value::from(0)));
    }
    Ok(RunnerOutcome::Dict(meta))
}

async fn scroll_search(clients: &ClientMap, params: &Params) -> BenchResult<RunnerOutcome> {
    let index = mandatory_str(params, "index", "scroll-search")?;
    let body = mandatory(params, "body", "scroll-search")?.clone();
    let size = params.get_u64("results-per-page").unwrap_or(10);
    let total_pages = match params.get_str("pages") {
        Some("all") => u64::MAX,
        _ => mandatory(params, "pages", "scroll-search")?.as_u64().unwrap_or(1),
    };
    let client = default(clients)?;

    let mut scroll_id: Option<String> = None;
    let mut hits = 0u64;
    let mut hits_relation_value = "eq".to_string();
    let mut timed_out = false;
    let mut took = 0u64;
    let mut retrieved_pages = 0u64;

    for page in 0..total_pages {
        let request_params = Params::new();
        if page == 0 {
            let mut first_body = body.clone();
            if let Some(object) = first_body.as_object_mut() {
                object.insert("sort".to_string(), Value::from("_doc"));
                object.insert("scroll".to_string(), Value::from("10s"));
                object.insert("size".to_string(), Value::from(size));
            }
            let response = client
            .perform_request("GET", &search_path(Some(index)), &request_params, Some(first_body), None)
            .await?;
            scroll_id = response.body.get("_scroll_id").and_then(Value::as_str).map(str::to_string);
            hits = hits_total(&response.body).as_u64().unwrap_or(0);
            hits_relation_value = hits_relation(&response.body).as_str().unwrap_or("eq").to_string();
            timed_out = response.body.get("timed_out").and_then(Value::as_bool).unwrap_or(false);
            took += response.body.get("took").and_then(Value::as_u64).unwrap_or(0);
            retrieved_pages += 1;
            if hits == 0 {
                break;
            }
        } else {
            let scroll_body = serde_json::json!({"scroll_id": scroll_id, "scroll": "10s"});
            let response = client
            .perform_request("GET", "/_search/scroll", &request_params, Some(scroll_body), None)
            .await?;
            timed_out = timed_out || response.body.get("timed_out").and_then(Value::as_bool).unwrap_or(false);
            took += response.body.get("took").and_then(Value::as_u64).unwrap_or(0);
            retrieved_pages += 1;
            let has_hits = response
            .body
            .get("hits")
            .and_then(|h| h.get("hits"))
            .and_then(Value::as_array)
            .map(|a| !a.is_empty())
            .unwrap_or(false);
            if !has_hits {
                break;
            }
        }
    }

    if let Some(id) = scroll_id {
        let request_params = Params::new();
        let _ = client
        .perform_request(
            "DELETE",
            "/_search/scroll",
            &request_params,
            Some(serde_json::json!({"scroll_id": [id]})),
            None)
        .await;
    }

    let mut meta = Meta::new();
    meta.insert("weight", retrieved_pages);
    meta.insert("pages", retrieved_pages);
    meta.insert("hits", hits);
    meta.insert("hits_relation", hits_relation_value);
    meta.insert("unit", "pages");
    meta.insert("timed_out", timed_out);
    meta.insert("took", took);
    meta.insert("success", true);
    Ok(RunnerOutcome::Dict(meta))
}

async fn paginated_search(clients: &ClientMap, params: &Params) -> BenchResult<RunnerOutcome> {
    let mut body = mandatory(params, "body", "paginated-search")?.clone();
    let size = params.get_u64("results-per-page").unwrap_or(10);
    let pit_op = params.get_str("with-point-in-time-from");
    let mut index = params.get_str("index").map(str::to_string);
    if pit_op.is_some() {
        if let Some(object) = body.as_object_mut() {
            for key in ["index", "routing", "preference"] {
                object.remove(key);
            }
        }
        index = None;
    }
    let total_pages = match params.get_str("pages") {
        Some("all") => u64::MAX,
        _ => mandatory(params, "pages", "paginated-search")?.as_u64().unwrap_or(1),
    };
    let client = default(clients)?;

    let mut hits: Option<u64> = None;
    let mut hits_relation_value = "eq".to_string();
    let mut timed_out = false;
    let mut took = 0u64;
    let mut page_count = 0u64;

    for page in 1..=total_pages {
        if let Some(op_name) = pit_op {
            let pit_id = composite_context::get(op_name)?;
            if let Some(object) = body.as_object_mut() {
                object.insert("pit".to_string(), serde_json::json!({"id": pit_id, "keep_alive": "1m"}));
            }
        }
        let request_params = Params::new();
        let response = client
        .perform_request("GET", &search_path(index.as_deref()), &request_params, Some(body.clone()), None)
        .await?;
        page_count = page;
        if hits.is_none() {
            hits = Some(hits_total(&response.body).as_u64().unwrap_or(0));
            hits_relation_value = hits_relation(&response.body).as_str().unwrap_or("eq").to_string();
        }
        took += response.body.get("took").and_then(Value::as_u64).unwrap_or(0);
        if !timed_out {
            timed_out = response.body.get("timed_out").and_then(Value::as_bool).unwrap_or(false);
        }
        if let Some(op_name) = pit_op {
            if let Some(new_pit) = response.body.get("pit_id").and_then(Value::as_str) {
                composite_context::put(op_name, Value::from(new_pit))?;
            }
        }
        let last_sort = response.body.get("hits").and_then(|h| h.get("hits")).and_then(Value::as_array).and_then(|hs| hs.last()).and_then(|h| h.get("sort")).cloned();
        let total_hits = hits.unwrap_or(0);
        if total_hits as f64 / size as f64 > page as f64 {
            if let (Some(object), Some(sort)) = (body.as_object_mut(), last_sort) {
                object.insert("search_after".to_string(), sort);
            }
        } else {
            break;
        }
    }

    let mut meta = Meta::with_success(true);
    meta.insert("weight", page_count);
    meta.insert("pages", page_count);
    meta.insert("unit", "pages");
    meta.insert("hits", hits.unwrap_or(0));
    meta.insert("hits_relation", hits_relation_value);
    meta.insert("timed_out", timed_out);
    meta.insert("took", took);
    Ok(RunnerOutcome::Dict(meta))
}

fn hits_total(response: &Value) -> Value {
    response
    .get("hits")
    .and_then(|h| h.get("total"))
    .and_then(|t| t.get("value"))
    .cloned()
    .unwrap_or(Value::from(0))
}

fn hits_relation(response: &Value) -> Value {
    response
    .get("hits")
    .and_then(|h| h.get("total"))
    .and_then(|t| t.get("relation"))
    .cloned()
    .unwrap_or(Value::from("eq"))
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
    async fn request_body_search_reports_detailed_hits() {
        let mut clients = ClientMap::new();
        clients.insert(
            DEFAULT_CLUSTER.to_string(),
            Arc::new(FixedClient(serde_json::json!({
                            "took": 3, "timed_out": false,
                            "hits": {"total": {"value": 42, "relation": "eq"}}
                        }))));
        let mut params = Params::new();
        params.insert("index", "logs");
        params.insert("body", serde_json::json!({"query": {"match_all": {}}}));
        params.insert("detailed-results", true);

        let outcome = Search.call(&clients, &params).await.unwrap();
        match outcome {
            RunnerOutcome::Dict(meta) => assert_eq!(meta.get_path("hits").and_then(Value::as_u64), Some(42)),
            other => panic!("expected dict outcome, got {other:?}"),
        }
    }

    struct ScrollingClient {
        calls: parking_lot::Mutex<Vec<(String, String)>>,
    }

    #[async_trait::async_trait]
    impl ClusterClient for ScrollingClient {
        async fn perform_request(
            &self,
            method: &str,
            path: &str,
            _params: &Params,
            body: Option<Value>,
            _headers: Option<std::collections::HashMap<String, String>>) -> BenchResult<ClusterResponse> {
            let mut calls = self.calls.lock();
            calls.push((method.to_string(), path.to_string()));
            let call_index = calls.len();
            drop(calls);
            let body = if call_index == 1 {
                serde_json::json!({
                        "_scroll_id": "abc",
                        "took": 1,
                        "timed_out": false,
                        "hits": {"total": {"value": 2, "relation": "eq"}, "hits": [{}, {}]}
                    })
            } else if call_index == 2 {
                serde_json::json!({
                        "took": 1,
                        "timed_out": false,
                        "hits": {"total": {"value": 2, "relation": "eq"}, "hits": []}
                    })
            } else {
                let _ = body;
                serde_json::json!({})
            };
            Ok(ClusterResponse { status: 200, body })
        }

        fn new_request_context(&self) -> RequestContext {
            RequestContext::new()
        }
    }

    // seed scenario (c): one page with `_scroll_id="abc"` returns 2 hits
    // with `size=100`; the second page is empty. Expect pages=2, hits=2,
    // and exactly one `clear_scroll` call.
    #[tokio::test]
    async fn scroll_search_continues_past_a_page_shorter_than_size_until_empty() {
        let client = Arc::new(ScrollingClient {
                calls: parking_lot::Mutex::new(Vec::new()),
            });
        let mut clients = ClientMap::new();
        clients.insert(DEFAULT_CLUSTER.to_string(), client.clone() as Arc<dyn ClusterClient>);

        let mut params = Params::new();
        params.insert("index", "logs");
        params.insert("body", serde_json::json!({"query": {"match_all": {}}}));
        params.insert("results-per-page", 100u64);
        params.insert("pages", "all");

        let outcome = Search.call(&clients, &params).await.unwrap();
        match outcome {
            RunnerOutcome::Dict(meta) => {
                assert_eq!(meta.get_path("pages").and_then(Value::as_u64), Some(2));
                assert_eq!(meta.get_path("hits").and_then(Value::as_u64), Some(2));
            }
            other => panic!("expected dict outcome, got {other:?}"),
        }

        let calls = client.calls.lock();
        let clear_scroll_calls = calls.iter().filter(|(method, path)| method == "DELETE" && path == "/_search/scroll").count();
        assert_eq!(clear_scroll_calls, 1);
    }
}
