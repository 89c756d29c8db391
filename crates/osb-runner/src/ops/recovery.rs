//! `wait-for-recovery`: polls `_recovery` until every shard reports
//! `DONE`, grounded on the original's `IndicesRecovery`.

use super::{default, mandatory_str};
use osb_core::cluster_client::ClientMap;
use osb_core::error::BenchResult;
use osb_core::meta::Meta;
use osb_core::params::Params;
use osb_core::runner::{Runner, RunnerOutcome};
use serde_json::Value;
use std::time::Duration;

pub struct IndicesRecovery;

#[async_trait::async_trait]
impl Runner for IndicesRecovery {
    async fn call(&self, clients: &ClientMap, params: &Params) -> BenchResult<RunnerOutcome> {
        let index = mandatory_str(params, "index", "wait-for-recovery")?;
        let wait_period = params.get_f64("completion-recheck-wait-period").unwrap_or(1.0);
        let client = default(clients)?;
        let empty_params = Params::new();

        let (total_recovered, total_start_millis, total_end_millis) = loop {
            let response = client
            .perform_request("GET", &format!("/{index}/_recovery"), &empty_params, None, None)
            .await?;

            let mut all_done = true;
            let mut recovered = 0u64;
            let mut start_millis = u64::MAX;
            let mut end_millis = 0u64;

            if let Some(indices) = response.body.as_object() {
                for idx_data in indices.values() {
                    let Some(shards) = idx_data.get("shards").and_then(Value::as_array) else {
                        continue;
                    };
                    for shard in shards {
                        let done = shard.get("stage").and_then(Value::as_str) == Some("DONE");
                        all_done = all_done && done;
                        if done {
                            if let Some(s) = shard.get("start_time_in_millis").and_then(Value::as_u64) {
                                start_millis = start_millis.min(s);
                            }
                            if let Some(e) = shard.get("stop_time_in_millis").and_then(Value::as_u64) {
                                end_millis = end_millis.max(e);
                            }
                            if let Some(recovered_in_bytes) = shard
                            .get("index")
                            .and_then(|i| i.get("size"))
                            .and_then(|s| s.get("recovered_in_bytes"))
                            .and_then(Value::as_u64)
                            {
                                recovered += recovered_in_bytes;
                            }
                        }
                    }
                }
            } else {
                all_done = false;
            }

            if all_done {
                break (recovered, start_millis, end_millis);
            }
            tokio::time::sleep(Duration::from_secs_f64(wait_period)).await;
        };

        let elapsed_seconds = (total_end_millis.saturating_sub(total_start_millis)) as f64 / 1000.0;
        let mut meta = Meta::with_success(true);
        meta.insert("weight", total_recovered as f64);
        meta.insert("unit", "byte");
        meta.insert(
            "throughput",
            if elapsed_seconds > 0.0 {
                total_recovered as f64 / elapsed_seconds
            } else {
                0.0
            });
        meta.insert("start_time_millis", total_start_millis);
        meta.insert("stop_time_millis", total_end_millis);
        Ok(RunnerOutcome::Dict(meta))
    }

    fn op_type(&self) -> &str {
        "wait-for-recovery"
    }
}
