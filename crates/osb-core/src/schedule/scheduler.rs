//! The Scheduler (component B): decides *when* the next
//! request for a client fires.

use std::time::Duration;

/// Polymorphic pacing contract. `before_request`/`after_request` are hooks
/// a feedback-driven scheduler can use to react to observed latency or
/// weight; the built-in schedulers below ignore them.
pub trait Scheduler: Send {
    /// Called immediately before a request is issued.
    fn before_request(&mut self, _now: Duration) {}

    /// Called after a request completes, with its reported weight/unit.
    fn after_request(&mut self, _now: Duration, _weight: f64, _unit: &str) {}

    /// Given the current expected-scheduled-time, returns the next one.
    fn next(&mut self, current: Duration) -> Duration;
}

/// Back-to-back requests: `next = current` (no pacing at all).
#[derive(Debug, Clone, Copy, Default)]
pub struct Unthrottled;

impl Scheduler for Unthrottled {
    fn next(&mut self, current: Duration) -> Duration {
        current
    }
}

/// `inter-arrival = clients / target-throughput`; strictly periodic.
#[derive(Debug, Clone, Copy)]
pub struct Deterministic {
    inter_arrival: Duration,
}

impl Deterministic {
    pub fn new(target_throughput: f64, clients: usize) -> Self {
        assert!(target_throughput > 0.0, "target-throughput must be positive");
        let inter_arrival = Duration::from_secs_f64(clients as f64 / target_throughput);
        Self { inter_arrival }
    }
}

impl Scheduler for Deterministic {
    fn next(&mut self, current: Duration) -> Duration {
        current + self.inter_arrival
    }
}

/// Inter-arrivals drawn from `Exp(lambda = target-throughput / clients)`,
/// using inverse-transform sampling (`-ln(1 - u) / lambda`) so no extra
/// distribution crate is needed beyond `rand`.
pub struct Poisson {
    lambda: f64,
    rng: rand::rngs::StdRng,
}

impl Poisson {
    pub fn new(target_throughput: f64, clients: usize) -> Self {
        assert!(target_throughput > 0.0, "target-throughput must be positive");
        Self::from_rng(target_throughput, clients, rand::SeedableRng::from_entropy)
    }

    /// Constructs with an explicit RNG, for deterministic tests.
    pub fn from_rng(target_throughput: f64, clients: usize, rng: rand::rngs::StdRng) -> Self {
        let lambda = target_throughput / clients as f64;
        Self { lambda, rng }
    }
}

impl Scheduler for Poisson {
    fn next(&mut self, current: Duration) -> Duration {
        use rand::Rng;
        let u: f64 = self.rng.gen_range(0.0..1.0_f64);
        // avoid ln(0) when u samples exactly 0.
        let u = u.max(f64::MIN_POSITIVE);
        let inter_arrival = -u.ln() / self.lambda;
        current + Duration::from_secs_f64(inter_arrival.max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_spaces_requests_evenly() {
        // seed scenario (a): target-throughput=10 ops/s, clients=1 -> 0.1s
        let mut scheduler = Deterministic::new(10.0, 1);
        let mut t = Duration::ZERO;
        let mut times = vec![t];
        for _ in 0..3 {
            t = scheduler.next(t);
            times.push(t);
        }
        assert_eq!(
            times,
            vec![
                Duration::ZERO,
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(300),
            ]
        );
    }

    #[test]
    fn unthrottled_never_advances_time() {
        let mut scheduler = Unthrottled;
        let t = Duration::from_secs(5);
        assert_eq!(scheduler.next(t), t);
    }

    #[test]
    fn poisson_inter_arrivals_average_to_target_rate() {
        use rand::SeedableRng;
        let mut scheduler = Poisson::from_rng(100.0, 1, rand::rngs::StdRng::seed_from_u64(7));
        let mut t = Duration::ZERO;
        let n = 20_000;
        for _ in 0..n {
            t = scheduler.next(t);
        }
        let observed_rate = n as f64 / t.as_secs_f64();
        assert!((observed_rate - 100.0).abs() < 5.0, "observed {observed_rate}");
    }
}
