//! Configuration structures for librate.
//!
//! Supports TOML deserialization with defaults matching a stock Linux
//! cpufreq layout. The alternation plan itself always comes from the
//! command line; the file only covers the environment around it.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LibrateConfig {
    /// cpufreq sysfs layout and governor handling.
    pub cpufreq: CpufreqConfig,

    /// Real-time setup applied before the loop starts.
    pub realtime: RealtimeConfig,

    /// Cycle timing collected during the run.
    pub timing: TimingConfig,
}

/// cpufreq sysfs configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CpufreqConfig {
    /// Directory containing the `cpuN` entries.
    pub sysfs_root: PathBuf,

    /// Governor that accepts `scaling_setspeed` writes.
    pub governor: String,

    /// Write `governor` before running. Disable when the control mode is
    /// already set up by someone else.
    pub set_governor: bool,
}

impl Default for CpufreqConfig {
    fn default() -> Self {
        Self {
            sysfs_root: PathBuf::from("/sys/devices/system/cpu"),
            governor: String::from("userspace"),
            set_governor: true,
        }
    }
}

/// Real-time scheduling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeConfig {
    /// Apply the scheduler policy and memory locking (requires privileges).
    pub enabled: bool,

    /// Scheduler policy: "fifo", "rr" or "other".
    pub policy: SchedPolicy,

    /// Scheduler priority (1-99 for RT policies).
    pub priority: u8,

    /// Pin the process to the CPU whose frequency is being switched.
    /// Applied whether or not `enabled` is set.
    pub pin_to_cpu: bool,

    /// Lock all memory pages (mlockall).
    pub lock_memory: bool,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            policy: SchedPolicy::Fifo,
            priority: 50,
            pin_to_cpu: false,
            lock_memory: true,
        }
    }
}

/// Scheduler policy for the alternation thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SchedPolicy {
    /// SCHED_FIFO: First-in-first-out real-time.
    #[default]
    Fifo,
    /// SCHED_RR: Round-robin real-time.
    Rr,
    /// SCHED_OTHER: Normal time-sharing (non-RT).
    Other,
}

/// Cycle timing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Cycles kept for percentiles, counted from the start of the run.
    pub sample_limit: usize,

    /// Percentiles of the cycle length reported after the run.
    pub percentiles: Vec<f64>,

    /// Slack over the nominal cycle period before a cycle counts as late.
    #[serde(with = "humantime_serde")]
    pub late_tolerance: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            sample_limit: 10_000,
            percentiles: vec![50.0, 99.0, 99.9],
            late_tolerance: Duration::from_micros(50),
        }
    }
}

impl LibrateConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = %path.display(), "Reading configuration file");
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::Parse)
    }

    /// Serialize configuration to TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File I/O error.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing error.
    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("failed to serialize TOML: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Serde helper module for `Duration` using humantime format.
mod humantime_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = humantime::format_duration(*duration).to_string();
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
