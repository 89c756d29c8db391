//! Parameter sources (component A in): produce the next request
//! parameter record for a task, finite or infinite, and can be partitioned
//! across the clients of a task.

use crate::params::Params;

/// Polymorphic contract over `{partition(i, n), params, percent_completed}`.
///
/// A finite source raises end-of-stream (returns `None` from `next_params`)
/// after a fixed number of records; an infinite source never does.
pub trait ParamSource: Send {
    /// Splits this source into the slice owned by client `index` of `total`
    /// clients. Called once per client before the schedule starts.
    fn partition(&self, index: usize, total: usize) -> Box<dyn ParamSource>;

    /// Produces the next parameter record, or `None` if the source is
    /// exhausted (finite sources only).
    fn next_params(&mut self) -> Option<Params>;

    /// Fraction of this partition's records already produced, or `None` for
    /// an infinite source.
    fn percent_completed(&self) -> Option<f64>;

    /// Number of records already produced by this partition.
    fn issued(&self) -> usize;
}

/// A finite source backed by a fixed record count, generating records via a
/// closure. Used by tasks with `iterations`/`warmup-iterations` and no
/// custom parameter file.
pub struct CountingParamSource<F> {
    total: usize,
    issued: usize,
    generate: F,
}

impl<F> CountingParamSource<F>
where
F: FnMut(usize) -> Params + Clone + Send + 'static,
{
    pub fn new(total: usize, generate: F) -> Self {
        Self {
            total,
            issued: 0,
            generate,
        }
    }
}

impl<F> ParamSource for CountingParamSource<F>
where
F: FnMut(usize) -> Params + Clone + Send + 'static,
{
    fn partition(&self, index: usize, total: usize) -> Box<dyn ParamSource> {
        // a fixed total divided as evenly as possible across clients, the
        // last client absorbing the remainder.
        let per_client = self.total / total;
        let remainder = self.total % total;
        let share = per_client + usize::from(index < remainder);
        Box::new(CountingParamSource {
                total: share,
                issued: 0,
                generate: self.generate.clone(),
            })
    }

    fn next_params(&mut self) -> Option<Params> {
        if self.issued >= self.total {
            return None;
        }
        let params = (self.generate)(self.issued);
        self.issued += 1;
        Some(params)
    }

    fn percent_completed(&self) -> Option<f64> {
        if self.total == 0 {
            Some(1.0)
        } else {
            Some(self.issued as f64 / self.total as f64)
        }
    }

    fn issued(&self) -> usize {
        self.issued
    }
}

/// An infinite source, for tasks with no `iterations`/`time-period` bound.
/// Never signals end-of-stream; `percent_completed` is always `None`.
pub struct InfiniteParamSource<F> {
    issued: usize,
    generate: F,
}

impl<F> InfiniteParamSource<F>
where
F: FnMut(usize) -> Params + Clone + Send + 'static,
{
    pub fn new(generate: F) -> Self {
        Self { issued: 0, generate }
    }
}

impl<F> ParamSource for InfiniteParamSource<F>
where
F: FnMut(usize) -> Params + Clone + Send + 'static,
{
    fn partition(&self, _index: usize, _total: usize) -> Box<dyn ParamSource> {
        Box::new(InfiniteParamSource {
                issued: 0,
                generate: self.generate.clone(),
            })
    }

    fn next_params(&mut self) -> Option<Params> {
        let params = (self.generate)(self.issued);
        self.issued += 1;
        Some(params)
    }

    fn percent_completed(&self) -> Option<f64> {
        None
    }

    fn issued(&self) -> usize {
        self.issued
    }
}
