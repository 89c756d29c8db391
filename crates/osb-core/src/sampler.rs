//! The Sampler (component G): a thread-safe, append-only
//! buffer of raw per-request samples, created once per task and drained by
//! the postprocessor when the task ends.

use crate::sample::Sample;
use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Append-only sample buffer for one task.
///
/// Appending never blocks on draining: a `Mutex<Vec<_>>` is adequate here
/// because samples are pushed one at a time per client (no contention
/// beyond the lock itself) and drained in bulk only once, at task end.
pub struct Sampler {
    start: Instant,
    samples: Mutex<Vec<Sample>>,
}

impl Sampler {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            samples: Mutex::new(Vec::new()),
        }
    }

    pub fn start_timestamp(&self) -> Instant {
        self.start
    }

    pub fn relative_time(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.start)
    }

    pub fn add(&self, sample: Sample) {
        self.samples.lock().push(sample);
    }

    /// Drains every buffered sample, leaving the sampler empty. Called by
    /// the postprocessor at task completion.
    pub fn drain(&self) -> Vec<Sample> {
        std::mem::take(&mut *self.samples.lock())
    }

    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Sampler {
    fn default() -> Self {
        Self::new()
    }
}

/// Structurally identical to [`Sampler`], gated by a profile flag and used
/// to capture detailed per-request timing when profiling is enabled. Kept
/// as a distinct type (rather than a bool flag on `Sampler`) so callers
/// can't accidentally mix the two buffers.
pub type ProfileMetricsSampler = Sampler;
