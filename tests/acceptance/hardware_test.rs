//! Tests against real cpufreq hardware.
//!
//! # Requirements
//!
//! - Root privileges
//! - A cpufreq driver offering the `userspace` governor on CPU 0
//!
//! Running these changes CPU 0's governor to `userspace` and leaves it there.

use super::common::{
    check_hw_prerequisites, frequency_extremes, plan, short_timing, SYSFS_CPU_ROOT,
};
use librate_core::clock::MonotonicClock;
use librate_core::cpufreq::CpufreqControl;
use librate_core::engine::Alternator;
use std::time::Duration;

#[test]
#[ignore = "Requires root and the cpufreq userspace governor"]
fn test_alternate_real_cpu() {
    if let Err(e) = check_hw_prerequisites(0) {
        eprintln!("Skipping test: {e}");
        return;
    }
    let Some((low, high)) = frequency_extremes(0) else {
        eprintln!("Skipping test: scaling_available_frequencies not listed");
        return;
    };

    let control = CpufreqControl::new(SYSFS_CPU_ROOT, 0);
    control
        .set_governor("userspace")
        .expect("failed to set governor");
    let mut sink = control.open_setspeed().expect("failed to open setspeed");

    let mut alternator = Alternator::new(
        MonotonicClock,
        plan(&high, &low, 1_000, 100),
        &short_timing(),
    );
    let report = alternator.run(&mut sink).expect("alternation failed");

    println!("Results ({high} <-> {low}, 100 x 2 x 1000us):");
    println!("  Elapsed: {:?}", report.elapsed);
    println!("  Min cycle: {:?} ns", report.timing.min_ns);
    println!("  Max cycle: {:?} ns", report.timing.max_ns);
    println!("  Late cycles: {}", report.timing.late_cycles);

    assert_eq!(report.writes, 200);
    assert!(report.elapsed >= Duration::from_millis(200));
}

#[test]
#[ignore = "Requires root and the cpufreq userspace governor"]
fn test_write_rejected_after_governor_change() {
    if let Err(e) = check_hw_prerequisites(0) {
        eprintln!("Skipping test: {e}");
        return;
    }

    let control = CpufreqControl::new(SYSFS_CPU_ROOT, 0);
    control
        .set_governor("userspace")
        .expect("failed to set governor");
    let mut sink = control.open_setspeed().expect("failed to open setspeed");

    // scaling_setspeed only accepts writes under the userspace governor, so
    // switching away makes the next write fail with EINVAL.
    let other = control
        .available_governors()
        .expect("failed to list governors")
        .into_iter()
        .find(|g| g != "userspace")
        .expect("no governor besides userspace");
    control.set_governor(&other).expect("failed to switch governor");

    let mut alternator = Alternator::new(
        MonotonicClock,
        plan("1000000", "2000000", 10, 10),
        &short_timing(),
    );
    let err = alternator.run(&mut sink).unwrap_err();
    assert_ne!(err.exit_code(), 0);
    assert_eq!(alternator.writes(), 1);
}
