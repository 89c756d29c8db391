//! Built-in operations. Every one bottoms
//! out in [`osb_core::cluster_client::ClusterClient::perform_request`], the
//! single transport primitive the cluster client contract exposes.

pub mod async_search;
pub mod bulk;
pub mod cluster_health;
pub mod index_lifecycle;
pub mod point_in_time;
pub mod raw_request;
pub mod recovery;
pub mod search;
pub mod sleep;
pub mod snapshot;
pub mod transform;
pub mod vector_search;

use osb_core::cluster_client::{default_client, ClientMap};
use osb_core::error::{BenchError, BenchResult};
use osb_core::params::Params;
use serde_json::Value;

/// Mirrors the original's free function `mandatory`: a `DataError` naming
/// the operation and the missing key, not a fatal assertion.
pub fn mandatory<'a>(params: &'a Params, key: &str, op_type: &str) -> BenchResult<&'a Value> {
    params.get(key).ok_or_else(|| {
            BenchError::data(format!(
                    "Parameter source for operation '{op_type}' did not provide the mandatory parameter '{key}'. \
                    Add it to your parameter source and try again."
                ))
        })
}

pub fn mandatory_str<'a>(params: &'a Params, key: &str, op_type: &str) -> BenchResult<&'a str> {
    mandatory(params, key, op_type)?
    .as_str()
    .ok_or_else(|| BenchError::data(format!("parameter '{key}' for operation '{op_type}' must be a string")))
}

/// Resolves the single client a non-`multi_cluster` runner receives.
pub fn default<'a>(clients: &'a ClientMap) -> BenchResult<&'a std::sync::Arc<dyn osb_core::cluster_client::ClusterClient>> {
    default_client(clients)
}

/// `request-params`/`headers` passthrough, mirroring
/// `Runner._transport_request_params`.
pub fn transport_request_params(params: &Params) -> (Params, Option<std::collections::HashMap<String, String>>) {
    let request_params = params
    .get("request-params")
    .and_then(Value::as_object)
    .cloned()
    .map(Params::from)
    .unwrap_or_default();
    let headers = params.get("headers").and_then(Value::as_object).map(|map| {
            map.iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
            .collect()::<std::collections::HashMap<_, _>>
        });
    (request_params, headers.filter(|h| !h.is_empty()))
}
