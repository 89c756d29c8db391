//! The Feedback Actor (component L): redline control that
//! gates which clients are active based on cluster error signals and,
//! optionally, node CPU telemetry.

use crate::messages::{ErrorReceiver, ErrorSender, FeedbackEvent, SharedClientStates};
use osb_core::config::RedlineConfig;
use osb_core::ids::ClientId;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackState {
    Neutral,
    ScalingUp,
    ScalingDown,
    Sleep,
}

/// Queried by the CPU watchdog. A real implementation would read
/// `nodes.stats` through the cluster client; not modeled here (Non-goal:
/// this crate does not define the wire protocol to OpenSearch).
#[async_trait::async_trait]
pub trait CpuMonitor: Send + Sync {
    /// Average CPU usage percent per node over the trailing `window`.
    async fn average_cpu_per_node(&self, window: Duration) -> Vec<(String, f64)>;
}

/// Redline controller. Owns both ends of the worker-facing
/// error channel: workers and the CPU watchdog enqueue through clones of
/// the same sender, the actor is the sole consumer.
pub struct FeedbackActor {
    config: RedlineConfig,
    shared_states: SharedClientStates,
    error_rx: ErrorReceiver,
    error_tx: ErrorSender,
    cpu_monitor: Option<Arc<dyn CpuMonitor>>,
    state: FeedbackState,
    last_error_at: Option<Instant>,
    last_scaleup_at: Option<Instant>,
    sleep_until: Option<Instant>,
}

impl FeedbackActor {
    /// Populates `shared_states` with every client in `[0, total_clients)`
    /// marked active, so `scale_down`/`scale_up` see the whole universe of
    /// clients rather than only the ones an executor has already touched.
    pub fn new(
        config: RedlineConfig,
        shared_states: SharedClientStates,
        total_clients: usize,
        error_rx: ErrorReceiver,
        error_tx: ErrorSender,
        cpu_monitor: Option<Arc<dyn CpuMonitor>>) -> Self {
        for id in 0..total_clients {
            shared_states.set_active(ClientId(id), true);
        }
        Self {
            config,
            shared_states,
            error_rx,
            error_tx,
            cpu_monitor,
            state: FeedbackState::Neutral,
            last_error_at: None,
            last_scaleup_at: None,
            sleep_until: None,
        }
    }

    pub fn state(&self) -> FeedbackState {
        self.state
    }

    pub fn error_sender(&self) -> ErrorSender {
        self.error_tx.clone()
    }

    /// Runs `handle_state` on a fixed `period`, forever. Intended to be
    /// spawned as its own tokio task by the Coordinator.
    pub async fn run(mut self, period: Duration) {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            self.handle_state(Instant::now()).await;
        }
    }

    /// One periodic tick.
    pub async fn handle_state(&mut self, now: Instant) {
        self.check_cpu_usage(now).await;
        self.drain_errors(now);

        if self.state == FeedbackState::Sleep {
            if now >= self.sleep_until.unwrap_or(now) {
                self.state = FeedbackState::Neutral;
            }
            return;
        }

        let errored_recently = self
        .last_error_at
        .map_or(false, |t| now.duration_since(t) < Duration::from_secs_f64(self.config.error_debounce_seconds));
        if errored_recently {
            self.enter_sleep(now);
            return;
        }

        let quiet_enough = self
        .last_error_at
        .map_or(true, |t| now.duration_since(t).as_secs_f64() >= self.config.error_quiet_seconds);
        let cooldown_elapsed = self
        .last_scaleup_at
        .map_or(true, |t| now.duration_since(t).as_secs_f64() >= self.config.scaleup_interval_seconds);

        if quiet_enough && cooldown_elapsed {
            match self.state {
                FeedbackState::ScalingUp => {
                    self.scale_up(self.scale_step());
                    self.last_scaleup_at = Some(now);
                    self.state = FeedbackState::Neutral;
                }
                _ => self.state = FeedbackState::ScalingUp,
            }
        } else {
            self.state = FeedbackState::Neutral;
        }
    }

    fn enter_sleep(&mut self, now: Instant) {
        self.scale_down(self.config.scaledown_percentage);
        self.sleep_until = Some(now + Duration::from_secs_f64(self.config.sleep_seconds));
        self.state = FeedbackState::Sleep;
    }

    fn drain_errors(&mut self, now: Instant) {
        while let Ok(_event) = self.error_rx.try_recv() {
            self.last_error_at = Some(now);
        }
    }

    async fn check_cpu_usage(&self, _now: Instant) {
        let Some(monitor) = &self.cpu_monitor else {
            return;
        };
        let Some(threshold) = self.config.max_cpu_usage else {
            return;
        };
        let window = Duration::from_secs_f64(self.config.cpu_window_seconds);
        let readings = monitor.average_cpu_per_node(window).await;
        if readings.iter().any(|(_, cpu)| *cpu > threshold) {
            let _ = self.error_tx.try_send(FeedbackEvent::CpuThresholdExceeded);
        }
    }

    /// `⌈percentage · active⌉` clients are marked inactive, highest client
    /// id first — the mirror image of `scale_up`'s lowest-id-first policy,
    /// so the two operations cycle the same boundary back and forth
    /// instead of hunting across the whole id space.
    fn scale_down(&self, percentage: f64) {
        let mut active = self.shared_states.active_client_ids();
        active.sort_by(|a, b| b.cmp(a));
        let count = ((percentage * active.len() as f64).ceil() as usize).min(active.len());
        for client in active.into_iter().take(count) {
            self.shared_states.set_active(client, false);
        }
    }

    /// Flips up to `n` inactive clients back to active, lowest id first.
    fn scale_up(&self, n: usize) {
        let inactive = self.shared_states.inactive_client_ids();
        for client in inactive.into_iter().take(n) {
            self.shared_states.set_active(client, true);
        }
    }

    /// The scale-down step is configured directly (`scaledown_percentage`);
    /// scale-up has no equivalent knob, so this mirrors the same
    /// percentage against the currently inactive pool (at least one
    /// client), so ramp-up and ramp-down move at comparable speed.
    fn scale_step(&self) -> usize {
        let inactive_count = self.shared_states.inactive_client_ids().len();
        ((self.config.scaledown_percentage * inactive_count as f64).ceil() as usize).max(1)
    }
}
