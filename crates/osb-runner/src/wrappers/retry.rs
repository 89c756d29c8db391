//! Retry wrapper: not part of the fixed
//! registry chain, applied selectively by the executor around a task's
//! runner when the task configures retries. Grounded on the original's
//! `Retry` class.

use osb_core::cluster_client::ClientMap;
use osb_core::error::BenchResult;
use osb_core::meta::Meta;
use osb_core::params::Params;
use osb_core::runner::{Runner, RunnerOutcome};
use std::sync::Arc;
use std::time::Duration;

pub struct RetryWrapper {
    delegate: Arc<dyn Runner>,
    retry_until_success_default: bool,
}

impl RetryWrapper {
    pub fn new(delegate: Arc<dyn Runner>) -> Self {
        Self {
            delegate,
            retry_until_success_default: false,
        }
    }

    pub fn with_retry_until_success_default(delegate: Arc<dyn Runner>, default: bool) -> Self {
        Self {
            delegate,
            retry_until_success_default: default,
        }
    }
}

#[async_trait::async_trait]
impl Runner for RetryWrapper {
    async fn call(&self, clients: &ClientMap, params: &Params) -> BenchResult<RunnerOutcome> {
        let retry_until_success = params.get_bool_or("retry-until-success", self.retry_until_success_default);
        let (max_attempts, retry_on_error) = if retry_until_success {
            (u64::MAX, true)
        } else {
            (params.retries() + 1, params.retry_on_error())
        };
        let sleep_time = Duration::from_secs_f64(params.retry_wait_period());
        let retry_on_timeout = params.retry_on_timeout();

        let mut attempt: u64 = 0;
        loop {
            attempt += 1;
            let last_attempt = attempt == max_attempts;
            let result = self.delegate.call(clients, params).await;
            match result {
                Ok(outcome) => {
                    if last_attempt || !retry_on_error {
                        return Ok(outcome);
                    }
                    match &outcome {
                        RunnerOutcome::Dict(meta) if !meta.success() => {
                            tracing::info!(
                                op_type = self.delegate.op_type(),
                                wait_seconds = sleep_time.as_secs_f64(),
                                "delegate returned an error, retrying"
                            );
                            tokio::time::sleep(sleep_time).await;
                        }
                        _ => return Ok(outcome),
                    }
                }
                Err(err) => {
                    let retriable = retry_on_timeout && is_timeout(&err);
                    if last_attempt || !retriable {
                        return Err(err);
                    }
                    tracing::info!(
                        op_type = self.delegate.op_type(),
                        wait_seconds = sleep_time.as_secs_f64(),
                        "delegate timed out, retrying"
                    );
                    tokio::time::sleep(sleep_time).await;
                }
            }
        }
    }

    fn multi_cluster(&self) -> bool {
        self.delegate.multi_cluster()
    }

    fn completed(&self) -> Option<bool> {
        self.delegate.completed()
    }

    fn percent_completed(&self) -> Option<f64> {
        self.delegate.percent_completed()
    }

    fn op_type(&self) -> &str {
        self.delegate.op_type()
    }
}

/// HTTP 408 is treated as a retriable timeout, as is any connection-level
/// transport failure (refused, DNS, socket) — the retry wrapper gets first
/// crack at these before a connection error reaches the executor, where it
/// is unconditionally fatal.
fn is_timeout(err: &osb_core::error::BenchError) -> bool {
    match err.http_status_code() {
        Some(408) => true,
        Some(_) => false,
        None => matches!(err, osb_core::error::BenchError::Transport {.. }),
    }
}
