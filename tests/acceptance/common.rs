//! Common utilities for integration tests.
//!
//! Provides helpers for:
//! - Building a fake cpufreq sysfs tree
//! - Recording or failing frequency writes
//! - Checking hardware prerequisites

use librate_common::config::TimingConfig;
use librate_common::plan::AlternationPlan;
use librate_core::cpufreq::{CpufreqControl, AVAILABLE_GOVERNORS_FILE, GOVERNOR_FILE, SETSPEED_FILE};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Real sysfs root for cpufreq.
pub const SYSFS_CPU_ROOT: &str = "/sys/devices/system/cpu";

/// A temp directory laid out like `/sys/devices/system/cpu`.
pub struct FakeSysfs {
    root: TempDir,
}

impl FakeSysfs {
    /// Create a tree with a cpufreq directory for each of `cpus`.
    pub fn with_cpus(cpus: &[usize]) -> Self {
        let root = tempfile::tempdir().expect("failed to create temp dir");
        for &cpu in cpus {
            let dir = root.path().join(format!("cpu{cpu}")).join("cpufreq");
            fs::create_dir_all(&dir).expect("failed to create cpufreq dir");
            fs::write(dir.join(GOVERNOR_FILE), "schedutil\n").unwrap();
            fs::write(dir.join(SETSPEED_FILE), "").unwrap();
            fs::write(
                dir.join(AVAILABLE_GOVERNORS_FILE),
                "conservative ondemand userspace powersave performance schedutil\n",
            )
            .unwrap();
        }
        Self { root }
    }

    /// Root path to pass as `sysfs_root`.
    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// Control handle for `cpu`.
    pub fn control(&self, cpu: usize) -> CpufreqControl {
        CpufreqControl::new(self.root(), cpu)
    }

    /// Path of a cpufreq file for `cpu`.
    pub fn file(&self, cpu: usize, name: &str) -> PathBuf {
        self.root()
            .join(format!("cpu{cpu}"))
            .join("cpufreq")
            .join(name)
    }

    /// Contents of a cpufreq file for `cpu`.
    pub fn read(&self, cpu: usize, name: &str) -> String {
        fs::read_to_string(self.file(cpu, name)).unwrap()
    }
}

/// Sink that records every write and fails the `fail_on`-th one (1-based).
#[derive(Debug, Default)]
pub struct ScriptedSink {
    pub writes: Vec<String>,
    pub attempts: usize,
    pub fail_on: Option<usize>,
    pub short_on: Option<(usize, usize)>,
}

impl Write for ScriptedSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.attempts += 1;
        if self.fail_on == Some(self.attempts) {
            return Err(io::Error::from_raw_os_error(libc::EINVAL));
        }
        if let Some((attempt, len)) = self.short_on {
            if attempt == self.attempts {
                self.writes
                    .push(String::from_utf8_lossy(&buf[..len]).into_owned());
                return Ok(len);
            }
        }
        self.writes.push(String::from_utf8_lossy(buf).into_owned());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Plan from string frequencies.
pub fn plan(freq1: &str, freq2: &str, interval_us: u64, num_loops: u64) -> AlternationPlan {
    AlternationPlan::new(
        freq1.parse().expect("valid freq1"),
        freq2.parse().expect("valid freq2"),
        interval_us,
        num_loops,
    )
}

/// Timing settings that keep only a few samples.
pub fn short_timing() -> TimingConfig {
    TimingConfig {
        sample_limit: 64,
        ..TimingConfig::default()
    }
}

/// Check if running as root.
pub fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

/// Check all prerequisites for hardware tests on `cpu`.
pub fn check_hw_prerequisites(cpu: usize) -> Result<(), String> {
    let mut errors = Vec::new();

    if !is_root() {
        errors.push("Not running as root - cpufreq writes will fail".to_string());
    }

    let control = CpufreqControl::new(SYSFS_CPU_ROOT, cpu);
    match control.available_governors() {
        Ok(governors) if governors.iter().any(|g| g == "userspace") => {}
        Ok(_) => errors.push("cpufreq driver does not offer the userspace governor".into()),
        Err(e) => errors.push(format!("cpufreq not available: {e}")),
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.join("; "))
    }
}

/// Lowest and highest entry of `scaling_available_frequencies`, if listed.
pub fn frequency_extremes(cpu: usize) -> Option<(String, String)> {
    let path = Path::new(SYSFS_CPU_ROOT)
        .join(format!("cpu{cpu}"))
        .join("cpufreq")
        .join("scaling_available_frequencies");
    let list = fs::read_to_string(path).ok()?;
    let mut freqs: Vec<u64> = list
        .split_whitespace()
        .filter_map(|f| f.parse().ok())
        .collect();
    freqs.sort_unstable();
    match (freqs.first(), freqs.last()) {
        (Some(lo), Some(hi)) if lo != hi => Some((lo.to_string(), hi.to_string())),
        _ => None,
    }
}
