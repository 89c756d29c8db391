//! `raw-request`: passes method/path/body/headers straight through,
//! grounded on the original's `RawRequest`.

use super::{mandatory_str, transport_request_params};
use osb_core::cluster_client::ClientMap;
use osb_core::error::{BenchError, BenchResult};
use osb_core::meta::Meta;
use osb_core::params::Params;
use osb_core::runner::{Runner, RunnerOutcome};

pub struct RawRequest;

#[async_trait::async_trait]
impl Runner for RawRequest {
    fn multi_cluster(&self) -> bool {
        true
    }

    async fn call(&self, clients: &ClientMap, params: &Params) -> BenchResult<RunnerOutcome> {
        let path = mandatory_str(params, "path", "raw-request")?;
        if !path.starts_with('/') {
            return Err(BenchError::assertion(format!(
                        "RawRequest [{path}] failed. Path parameter must begin with a '/'."
                    )));
        }
        let (mut request_params, headers) = transport_request_params(params);
        if let Some(ignore) = params.get("ignore") {
            request_params.insert("ignore", ignore.clone());
        }
        let method = params.get_str("method").unwrap_or("GET");
        let body = params.get("body").cloned();

        let client = super::default(clients)?;
        client.perform_request(method, path, &request_params, body, headers).await?;

        Ok(RunnerOutcome::Dict(Meta::with_success(true)))
    }

    fn op_type(&self) -> &str {
        "raw-request"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use osb_core::cluster_client::{ClusterClient, ClusterResponse, DEFAULT_CLUSTER};
    use osb_core::request_context::RequestContext;
    use serde_json::Value;
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
    async fn path_without_leading_slash_is_rejected() {
        let mut params = Params::new();
        params.insert("path", "no-leading-slash");
        let error = RawRequest.call(&clients(), &params).await.unwrap_err();
        assert!(matches!(error, BenchError::Assertion(_)));
    }

    #[tokio::test]
    async fn valid_path_succeeds() {
        let mut params = Params::new();
        params.insert("path", "/_cat/indices");
        let outcome = RawRequest.call(&clients(), &params).await.unwrap();
        match outcome {
            RunnerOutcome::Dict(meta) => assert!(meta.success()),
            other => panic!("expected dict outcome, got {other:?}"),
        }
    }
}
