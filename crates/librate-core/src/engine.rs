//! Timed frequency alternation.
//!
//! Each cycle is:
//! 1. Write `freq1` to the sink
//! 2. Busy-wait `interval_us`
//! 3. Write `freq2` to the sink
//! 4. Busy-wait `interval_us`
//!
//! The first write or clock fault aborts the run. Nothing is retried: a
//! disturbed run is worthless as a measurement.

use crate::clock::{delay, Clock, MonotonicClock};
use librate_common::config::TimingConfig;
use librate_common::error::{LibrateError, LibrateResult};
use librate_common::plan::{AlternationPlan, FrequencyToken};
use librate_common::time::MonoTime;
use librate_common::timing::{CycleStats, CycleSummary};
use serde::Serialize;
use std::io::Write;
use std::time::Duration;
use tracing::{debug, error, info};

/// Outcome of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Full cycles completed.
    pub cycles: u64,
    /// Frequency writes issued.
    pub writes: u64,
    /// Monotonic time from the first write to the end of the last interval.
    pub elapsed: Duration,
    /// Nominal run length, `2 * num_loops * interval_us`.
    pub expected: Duration,
    /// Per-cycle timing.
    pub timing: CycleSummary,
}

/// Drives the write/delay cycle for one plan.
pub struct Alternator<C: Clock> {
    clock: C,
    plan: AlternationPlan,
    stats: CycleStats,
    percentiles: Vec<f64>,
    writes: u64,
}

impl<C: Clock> Alternator<C> {
    /// Create an alternator for `plan` reading time from `clock`.
    pub fn new(clock: C, plan: AlternationPlan, timing: &TimingConfig) -> Self {
        let stats = CycleStats::new(
            plan.cycle_period(),
            timing.late_tolerance,
            timing.sample_limit,
        );
        Self {
            clock,
            plan,
            stats,
            percentiles: timing.percentiles.clone(),
            writes: 0,
        }
    }

    /// Writes issued by the latest run, including a failed one.
    pub fn writes(&self) -> u64 {
        self.writes
    }

    /// Run all `num_loops` cycles against `sink`.
    ///
    /// Each call starts from zero writes and empty cycle timing.
    ///
    /// The sink must be unbuffered: every frequency has to reach the control
    /// interface in exactly one `write` call. It is borrowed for the duration
    /// of the run and never flushed or closed here.
    ///
    /// # Errors
    ///
    /// Returns [`LibrateError::WriteFault`] on a failed or short write and
    /// [`LibrateError::ClockFault`] if the clock cannot be read. The run is
    /// abandoned at that point.
    pub fn run<W: Write + ?Sized>(&mut self, sink: &mut W) -> LibrateResult<RunReport> {
        self.writes = 0;
        self.stats.clear();

        if self.plan.num_loops == 0 {
            debug!("Zero loops requested, nothing to do");
            return Ok(self.report(0, Duration::ZERO));
        }

        info!(
            freq1 = %self.plan.freq1,
            freq2 = %self.plan.freq2,
            interval_us = self.plan.interval_us,
            num_loops = self.plan.num_loops,
            "Starting frequency alternation"
        );

        let started = self.clock.now()?;
        let mut cycle_start = started;

        for cycle in 0..self.plan.num_loops {
            let cycle_end = match self.run_cycle(sink) {
                Ok(end) => end,
                Err(e) => {
                    error!(
                        cycle,
                        writes = self.writes,
                        error = %e,
                        "Alternation aborted"
                    );
                    return Err(e);
                }
            };
            self.stats
                .record(cycle_end.saturating_duration_since(cycle_start));
            cycle_start = cycle_end;
        }

        let elapsed = cycle_start.saturating_duration_since(started);
        let report = self.report(self.plan.num_loops, elapsed);
        info!(
            cycles = report.cycles,
            writes = report.writes,
            elapsed_us = report.elapsed.as_micros(),
            expected_us = report.expected.as_micros(),
            late_cycles = report.timing.late_cycles,
            "Frequency alternation complete"
        );
        Ok(report)
    }

    /// One freq1/delay/freq2/delay cycle. Returns the clock reading that
    /// ended the second delay.
    #[inline]
    fn run_cycle<W: Write + ?Sized>(&mut self, sink: &mut W) -> LibrateResult<MonoTime> {
        self.writes += 1;
        write_token(sink, &self.plan.freq1)?;
        delay(&self.clock, self.plan.interval_us)?;

        self.writes += 1;
        write_token(sink, &self.plan.freq2)?;
        delay(&self.clock, self.plan.interval_us)
    }

    fn report(&self, cycles: u64, elapsed: Duration) -> RunReport {
        RunReport {
            cycles,
            writes: self.writes,
            elapsed,
            expected: self.plan.expected_duration(),
            timing: self.stats.summary(&self.percentiles),
        }
    }
}

/// Write the whole token in a single `write` call.
///
/// A short write is as fatal as an I/O error; a partial frequency value
/// means nothing to the control interface.
///
/// # Errors
///
/// Returns [`LibrateError::WriteFault`] if the write fails or is short.
#[inline]
pub fn write_token<W: Write + ?Sized>(sink: &mut W, token: &FrequencyToken) -> LibrateResult<()> {
    let bytes = token.as_bytes();
    match sink.write(bytes) {
        Ok(n) if n == bytes.len() => Ok(()),
        Ok(n) => Err(LibrateError::short_write(token, n, bytes.len())),
        Err(source) => Err(LibrateError::WriteFault {
            token: token.to_string(),
            source,
        }),
    }
}

/// Alternate `plan` against `sink` using the system monotonic clock and
/// default timing settings.
///
/// # Errors
///
/// See [`Alternator::run`].
pub fn run<W: Write + ?Sized>(sink: &mut W, plan: &AlternationPlan) -> LibrateResult<RunReport> {
    Alternator::new(MonotonicClock, plan.clone(), &TimingConfig::default()).run(sink)
}
