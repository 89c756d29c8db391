//! Wires every built-in operation into a fresh [`Registry`], grounded on
//! the original's `register_default_runners`. Idempotent administrative
//! operations are wrapped in [`RetryWrapper`] the same way the original
//! wraps them in `Retry(...)`; operations that are not safe to repeat
//! (snapshot/restore creation, the composite envelope itself) are left
//! bare.

use crate::composite::Composite;
use crate::ops::{
    async_search::{DeleteAsyncSearch, GetAsyncSearch, SubmitAsyncSearch},
    bulk::Bulk,
    cluster_health::ClusterHealth,
    index_lifecycle::{
        CreateComponentTemplate, CreateComposableTemplate, CreateDataStream, CreateIndex, CreateIndexTemplate,
        DeleteComponentTemplate, DeleteComposableTemplate, DeleteDataStream, DeleteIndex, DeleteIndexTemplate, ForceMerge,
    },
    point_in_time::{ClosePointInTime, OpenPointInTime},
    raw_request::RawRequest,
    recovery::IndicesRecovery,
    search::Search,
    sleep::Sleep,
    snapshot::{CreateSnapshot, CreateSnapshotRepository, DeleteSnapshotRepository, RestoreSnapshot, WaitForSnapshotCreate},
    transform::{CreateTransform, DeleteTransform, StartTransform, WaitForTransform},
    vector_search::VectorSearch,
};
use crate::registry::Registry;
use crate::wrappers::retry::RetryWrapper;
use osb_core::runner::Runner;
use std::sync::Arc;

fn retrying(runner: impl Runner + 'static) -> Arc<dyn Runner> {
    Arc::new(RetryWrapper::new(Arc::new(runner)))
}

/// Installs every built-in operation type into `registry`, including
/// `composite` itself, which resolves its inner operations against this
/// same registry (so a composite stream can use any other built-in op).
pub fn install_builtin_runners(registry: &Arc<Registry>) {
    registry.register("bulk", Arc::new(Bulk));
    registry.register("force-merge", Arc::new(ForceMerge));
    registry.register("search", Arc::new(Search));
    registry.register("paginated-search", Arc::new(Search));
    registry.register("scroll-search", Arc::new(Search));
    registry.register("vector-search", Arc::new(VectorSearch));
    registry.register("raw-request", Arc::new(RawRequest));
    registry.register("composite", Arc::new(Composite::new(Arc::clone(registry))));
    registry.register("submit-async-search", Arc::new(SubmitAsyncSearch));
    registry.register("get-async-search", retrying(GetAsyncSearch));
    registry.register("delete-async-search", Arc::new(DeleteAsyncSearch));
    registry.register("open-point-in-time", Arc::new(OpenPointInTime));
    registry.register("close-point-in-time", Arc::new(ClosePointInTime));

    registry.register("sleep", Arc::new(Sleep));
    registry.register("create-snapshot", Arc::new(CreateSnapshot));
    registry.register("restore-snapshot", Arc::new(RestoreSnapshot));

    registry.register("cluster-health", retrying(ClusterHealth));
    registry.register("create-index", retrying(CreateIndex));
    registry.register("delete-index", retrying(DeleteIndex));
    registry.register("create-component-template", retrying(CreateComponentTemplate));
    registry.register("delete-component-template", retrying(DeleteComponentTemplate));
    registry.register("create-composable-template", retrying(CreateComposableTemplate));
    registry.register("delete-composable-template", retrying(DeleteComposableTemplate));
    registry.register("create-data-stream", retrying(CreateDataStream));
    registry.register("delete-data-stream", retrying(DeleteDataStream));
    registry.register("create-index-template", retrying(CreateIndexTemplate));
    registry.register("delete-index-template", retrying(DeleteIndexTemplate));
    registry.register("delete-snapshot-repository", retrying(DeleteSnapshotRepository));
    registry.register("create-snapshot-repository", retrying(CreateSnapshotRepository));
    registry.register("wait-for-snapshot-create", retrying(WaitForSnapshotCreate));
    registry.register("wait-for-recovery", retrying(IndicesRecovery));
    registry.register("create-transform", retrying(CreateTransform));
    registry.register("start-transform", retrying(StartTransform));
    registry.register("wait-for-transform", retrying(WaitForTransform::default()));
    registry.register("delete-transform", retrying(DeleteTransform));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_built_in_operation_type_is_reachable() {
        let registry = Registry::new();
        install_builtin_runners(&registry);
        for op_type in [
            "bulk",
            "force-merge",
            "search",
            "paginated-search",
            "scroll-search",
            "vector-search",
            "raw-request",
            "composite",
            "submit-async-search",
            "get-async-search",
            "delete-async-search",
            "open-point-in-time",
            "close-point-in-time",
            "sleep",
            "create-snapshot",
            "restore-snapshot",
            "cluster-health",
            "create-index",
            "delete-index",
            "create-component-template",
            "delete-component-template",
            "create-composable-template",
            "delete-composable-template",
            "create-data-stream",
            "delete-data-stream",
            "create-index-template",
            "delete-index-template",
            "delete-snapshot-repository",
            "create-snapshot-repository",
            "wait-for-snapshot-create",
            "wait-for-recovery",
            "create-transform",
            "start-transform",
            "wait-for-transform",
            "delete-transform",
        ] {
            assert!(registry.resolve(op_type).is_ok(), "missing runner for '{op_type}'");
        }
    }
}
