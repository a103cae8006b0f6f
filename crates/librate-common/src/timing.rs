//! Per-cycle timing of an alternation run.
//!
//! A cycle spans a freq1 write, an interval, a freq2 write and a second
//! interval, so its nominal period is twice the interval. Write latency in
//! the cpufreq driver shows up as cycles that run past that period.

use serde::Serialize;
use std::time::Duration;

/// Cycle durations collected while a run is in progress.
///
/// The first `sample_limit` cycles are kept for percentiles; later cycles
/// still update the extremes, the mean and the late count. Sample storage is
/// reserved up front so recording never allocates inside the loop.
#[derive(Debug)]
pub struct CycleStats {
    period_ns: u64,
    late_after_ns: u64,
    sample_limit: usize,
    samples: Vec<u64>,
    cycles: u64,
    shortest_ns: u64,
    longest_ns: u64,
    total_ns: u128,
    late: u64,
}

impl CycleStats {
    /// Stats for cycles of nominal length `period`. A cycle is late once it
    /// exceeds `period + tolerance`.
    #[must_use]
    pub fn new(period: Duration, tolerance: Duration, sample_limit: usize) -> Self {
        let period_ns = nanos(period);
        Self {
            period_ns,
            late_after_ns: period_ns.saturating_add(nanos(tolerance)),
            sample_limit,
            samples: Vec::with_capacity(sample_limit),
            cycles: 0,
            shortest_ns: u64::MAX,
            longest_ns: 0,
            total_ns: 0,
            late: 0,
        }
    }

    /// Forget every recorded cycle. The sample storage is kept.
    pub fn clear(&mut self) {
        self.samples.clear();
        self.cycles = 0;
        self.shortest_ns = u64::MAX;
        self.longest_ns = 0;
        self.total_ns = 0;
        self.late = 0;
    }

    /// Record one completed cycle.
    pub fn record(&mut self, cycle: Duration) {
        let ns = nanos(cycle);
        if self.samples.len() < self.sample_limit {
            self.samples.push(ns);
        }

        self.cycles += 1;
        self.shortest_ns = self.shortest_ns.min(ns);
        self.longest_ns = self.longest_ns.max(ns);
        self.total_ns += u128::from(ns);
        if ns > self.late_after_ns {
            self.late += 1;
        }
    }

    /// Summary of everything recorded so far.
    ///
    /// `percentiles` use the nearest-rank method over the kept samples;
    /// values outside `(0, 100]` are skipped.
    #[must_use]
    pub fn summary(&self, percentiles: &[f64]) -> CycleSummary {
        let mut sorted = self.samples.clone();
        sorted.sort_unstable();

        let recorded = self.cycles > 0;
        CycleSummary {
            period_ns: self.period_ns,
            min_ns: recorded.then_some(self.shortest_ns),
            max_ns: recorded.then_some(self.longest_ns),
            mean_ns: recorded.then(|| {
                u64::try_from(self.total_ns / u128::from(self.cycles)).unwrap_or(u64::MAX)
            }),
            late_cycles: self.late,
            sampled: sorted.len(),
            percentiles: percentiles
                .iter()
                .filter_map(|&percentile| {
                    nearest_rank(&sorted, percentile).map(|cycle_ns| CyclePercentile {
                        percentile,
                        cycle_ns,
                    })
                })
                .collect(),
        }
    }
}

fn nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

fn nearest_rank(sorted: &[u64], percentile: f64) -> Option<u64> {
    if sorted.is_empty() || percentile.is_nan() || percentile <= 0.0 || percentile > 100.0 {
        return None;
    }
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let rank = (percentile / 100.0 * sorted.len() as f64).ceil() as usize;
    sorted.get(rank.clamp(1, sorted.len()) - 1).copied()
}

/// Cycle timing as it appears in the run report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleSummary {
    /// Nominal cycle length, `2 * interval_us`.
    pub period_ns: u64,
    /// Shortest cycle.
    pub min_ns: Option<u64>,
    /// Longest cycle.
    pub max_ns: Option<u64>,
    /// Mean over all cycles.
    pub mean_ns: Option<u64>,
    /// Cycles past the period plus tolerance.
    pub late_cycles: u64,
    /// Cycles kept for percentiles.
    pub sampled: usize,
    /// Requested percentiles of the cycle length.
    pub percentiles: Vec<CyclePercentile>,
}

impl CycleSummary {
    /// Spread between the longest and shortest cycle.
    #[must_use]
    pub fn jitter_ns(&self) -> Option<u64> {
        Some(self.max_ns? - self.min_ns?)
    }

    /// How far the longest cycle ran past the nominal period.
    #[must_use]
    pub fn worst_overshoot_ns(&self) -> Option<u64> {
        self.max_ns.map(|max| max.saturating_sub(self.period_ns))
    }
}

/// One percentile of the cycle length.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CyclePercentile {
    /// Percentile in `(0, 100]`.
    pub percentile: f64,
    /// Cycle length at that percentile.
    pub cycle_ns: u64,
}
