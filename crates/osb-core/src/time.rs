//! Time abstraction used by the scheduler and executor.
//!
//! Production code drives off the wall clock; tests drive off a `SimTime`
//! that can be advanced deterministically without sleeping, so
//! schedule/throttle math can be asserted exactly.
use std::time::{Duration, Instant};

/// A source of "now", abstracted so tests can inject a simulated clock.
pub trait ClockTime: Send + Sync {
    fn now(&self) -> Duration;
}

/// Wall-clock time, relative to process start. Used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunTime {
    epoch: Option<Instant>,
}

impl RunTime {
    pub fn new() -> Self {
        Self {
            epoch: Some(Instant::now()),
        }
    }
}

impl ClockTime for RunTime {
    fn now(&self) -> Duration {
        match self.epoch {
            Some(epoch) => Instant::now().saturating_duration_since(epoch),
            None => Duration::ZERO,
        }
    }
}

/// A simulated clock that only advances when told to. Used in deterministic
/// tests of the scheduler and executor throttling math.
#[derive(Debug, Clone, Default)]
pub struct SimTime {
    elapsed: parking_lot::Mutex<Duration>,
}

impl SimTime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        let mut elapsed = self.elapsed.lock();
        *elapsed += by;
    }
}

impl ClockTime for SimTime {
    fn now(&self) -> Duration {
        *self.elapsed.lock()
    }
}
