//! Human and machine readable output for a run.

use librate_common::plan::AlternationPlan;
use librate_core::engine::RunReport;
use std::time::Duration;
use tracing::info;

/// Line printed right before the loop starts. The estimate is in whole
/// seconds, rounded down.
pub fn status_line(plan: &AlternationPlan) -> String {
    format!(
        "Switching from {} to {} {} times with {}us interval (Should take about {} seconds)",
        plan.freq1,
        plan.freq2,
        plan.num_loops,
        plan.interval_us,
        plan.expected_duration().as_secs(),
    )
}

/// Log the outcome of a successful run.
pub fn log_summary(report: &RunReport) {
    let timing = &report.timing;
    info!(
        cycles = report.cycles,
        writes = report.writes,
        elapsed = %humantime::format_duration(report.elapsed),
        expected = %humantime::format_duration(report.expected),
        drift_us = drift_us(report),
        min_cycle_ns = timing.min_ns.unwrap_or(0),
        mean_cycle_ns = timing.mean_ns.unwrap_or(0),
        max_cycle_ns = timing.max_ns.unwrap_or(0),
        jitter_ns = timing.jitter_ns().unwrap_or(0),
        worst_overshoot_ns = timing.worst_overshoot_ns().unwrap_or(0),
        late_cycles = timing.late_cycles,
        "Run summary"
    );

    for p in &timing.percentiles {
        info!(
            percentile = p.percentile,
            cycle_ns = p.cycle_ns,
            sampled = timing.sampled,
            "Cycle time percentile"
        );
    }
}

/// Report as pretty-printed JSON.
pub fn to_json(report: &RunReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

/// How much longer the run took than nominal, in microseconds.
fn drift_us(report: &RunReport) -> u128 {
    report
        .elapsed
        .checked_sub(report.expected)
        .unwrap_or(Duration::ZERO)
        .as_micros()
}
