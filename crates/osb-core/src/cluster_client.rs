//! The cluster client contract ").
//!
//! The benchmark talks to OpenSearch (or a compatible cluster) through an
//! existing client library; this crate does not define that wire protocol
//! (Non-goal). Every higher-level API the spec lists
//! (`bulk`, `indices.*`, `cluster.*`, `snapshot.*`, `tasks.*`,
//! `transform.*`, `async_search.*`, `*_point_in_time`) bottoms out in one
//! transport primitive, so the trait models only that primitive plus the
//! request-context factory; built-in runners (osb-runner) are thin
//! builders over it.

use crate::error::BenchResult;
use crate::params::Params;
use crate::request_context::RequestContext;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// The response to one transport-level call.
#[derive(Debug, Clone)]
pub struct ClusterResponse {
    pub status: u16,
    pub body: Value,
}

impl ClusterResponse {
    pub fn is_success(&self) -> bool {
        self.status < 400
    }
}

/// One named cluster in a (potentially multi-cluster) benchmark run.
#[async_trait::async_trait]
pub trait ClusterClient: Send + Sync {
    /// `transport.perform_request(method, url, params, body, headers)`.
    async fn perform_request(
        &self,
        method: &str,
        path: &str,
        params: &Params,
        body: Option<Value>,
        headers: Option<HashMap<String, String>>) -> BenchResult<ClusterResponse>;

    /// Obtains per-request timing hooks.
    fn new_request_context(&self) -> RequestContext {
        RequestContext::new()
    }
}

/// The default-cluster-or-named-clusters map a runner receives. Most
/// runners only care about `"default"`; a runner that sets
/// `multi_cluster = true` receives the full map.
pub type ClientMap = HashMap<String, Arc<dyn ClusterClient>>;

pub const DEFAULT_CLUSTER: &str = "default";

pub fn default_client(clients: &ClientMap) -> BenchResult<&Arc<dyn ClusterClient>> {
    clients
    .get(DEFAULT_CLUSTER)
    .ok_or_else(|| crate::error::BenchError::data("no default cluster configured"))
}
