//! The Composite context: a per-invocation scoped
//! key→value map, active only inside a `composite` operation's call tree.
//! Used to thread `pit_id` / async-search ids between sibling streams.

use osb_core::error::{BenchError, BenchResult};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

#[derive(Default)]
struct Store {
    values: parking_lot::Mutex<HashMap<String, serde_json::Value>>,
}

tokio::task_local! {
    static CONTEXT: Arc<Store>;
}

/// Runs `fut` with a fresh composite context in scope. Only the top-level
/// `composite` runner calls this; nested streams join the same scope via
/// [`spawn_nested`].
pub async fn scope<F: Future>(fut: F) -> F::Output {
    CONTEXT.scope(Arc::new(Store::default()), fut).await
}

/// Spawns `fut` as a new task, carrying the current composite context into
/// it if one is active. Used for the concurrent `stream` branches of a
/// composite operation.
pub fn spawn_nested<F>(fut: F) -> tokio::task::JoinHandle<F::Output>
where
F: Future + Send + 'static,
F::Output: Send + 'static,
{
    match CONTEXT.try_with(|store| store.clone()) {
        Ok(store) => tokio::spawn(CONTEXT.scope(store, fut)),
        Err(_) => tokio::spawn(fut),
    }
}

fn outside_scope() -> BenchError {
    BenchError::benchmark("composite context accessed outside a composite scope")
}

pub fn put(key: impl Into<String>, value: serde_json::Value) -> BenchResult<()> {
    CONTEXT
    .try_with(|store| {
            store.values.lock().insert(key.into(), value);
        })
    .map_err(|_| outside_scope())
}

pub fn get(key: &str) -> BenchResult<serde_json::Value> {
    let found = CONTEXT
    .try_with(|store| store.values.lock().get(key).cloned())
    .map_err(|_| outside_scope())?;
    found.ok_or_else(|| BenchError::not_found(format!("composite context has no value for '{key}'")))
}

pub fn remove(key: &str) -> BenchResult<serde_json::Value> {
    let found = CONTEXT
    .try_with(|store| store.values.lock().remove(key))
    .map_err(|_| outside_scope())?;
    found.ok_or_else(|| BenchError::not_found(format!("composite context has no value for '{key}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_remove_round_trip_inside_scope() {
        scope(async {
                put("pit_id", serde_json::json!("abc")).unwrap();
                assert_eq!(get("pit_id").unwrap(), serde_json::json!("abc"));
                assert_eq!(remove("pit_id").unwrap(), serde_json::json!("abc"));
                assert!(get("pit_id").is_err());
            })
        .await;
    }

    #[tokio::test]
    async fn access_outside_scope_fails_fatally() {
        assert!(put("x", serde_json::json!(1)).is_err());
        assert!(get("x").is_err());
    }

    #[tokio::test]
    async fn nested_spawn_shares_the_parent_scope() {
        scope(async {
                put("shared", serde_json::json!(42)).unwrap();
                let handle = spawn_nested(async { get("shared").unwrap() });
                let value = handle.await.unwrap();
                assert_eq!(value, serde_json::json!(42));
            })
        .await;
    }
}
