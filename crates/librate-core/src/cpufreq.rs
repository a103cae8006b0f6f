//! cpufreq sysfs control for a single CPU.
//!
//! Resolves `<sysfs_root>/cpu<N>/cpufreq/`, switches its governor and opens
//! `scaling_setspeed` as the sink for the alternation engine. The previous
//! governor is reported but never restored.

use librate_common::error::{LibrateError, LibrateResult};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Governor control file.
pub const GOVERNOR_FILE: &str = "scaling_governor";

/// Frequency control file accepted by the `userspace` governor.
pub const SETSPEED_FILE: &str = "scaling_setspeed";

/// Space-separated list of governors the driver offers.
pub const AVAILABLE_GOVERNORS_FILE: &str = "scaling_available_governors";

/// Handle on one CPU's cpufreq directory.
#[derive(Debug, Clone)]
pub struct CpufreqControl {
    cpu: usize,
    policy_dir: PathBuf,
}

impl CpufreqControl {
    /// Control for `cpu` under `sysfs_root` (normally
    /// `/sys/devices/system/cpu`).
    pub fn new(sysfs_root: impl AsRef<Path>, cpu: usize) -> Self {
        let policy_dir = sysfs_root
            .as_ref()
            .join(format!("cpu{cpu}"))
            .join("cpufreq");
        Self { cpu, policy_dir }
    }

    /// CPU index.
    pub fn cpu(&self) -> usize {
        self.cpu
    }

    /// Path of `scaling_governor`.
    pub fn governor_path(&self) -> PathBuf {
        self.policy_dir.join(GOVERNOR_FILE)
    }

    /// Path of `scaling_setspeed`.
    pub fn setspeed_path(&self) -> PathBuf {
        self.policy_dir.join(SETSPEED_FILE)
    }

    /// Currently active governor.
    ///
    /// # Errors
    ///
    /// Returns [`LibrateError::Control`] if the governor file is unreadable.
    pub fn current_governor(&self) -> LibrateResult<String> {
        read_trimmed(&self.governor_path())
    }

    /// Governors offered by the driver.
    ///
    /// # Errors
    ///
    /// Returns [`LibrateError::Control`] if the list is unreadable.
    pub fn available_governors(&self) -> LibrateResult<Vec<String>> {
        let list = read_trimmed(&self.policy_dir.join(AVAILABLE_GOVERNORS_FILE))?;
        Ok(list.split_whitespace().map(str::to_owned).collect())
    }

    /// Select `governor` by writing it, newline-terminated, to
    /// `scaling_governor`.
    ///
    /// # Errors
    ///
    /// Returns [`LibrateError::Control`] if the file cannot be opened or the
    /// kernel rejects the value.
    pub fn set_governor(&self, governor: &str) -> LibrateResult<()> {
        let path = self.governor_path();
        debug!(cpu = self.cpu, path = %path.display(), governor, "Setting governor");

        let mut file = open_write_only(&path)?;
        file.write_all(format!("{governor}\n").as_bytes())
            .map_err(|source| LibrateError::Control {
                path: path.clone(),
                source,
            })?;

        info!(cpu = self.cpu, governor, "Governor set");
        Ok(())
    }

    /// Open `scaling_setspeed` write-only. The returned file is the sink
    /// handed to the alternation engine; it is unbuffered, so each engine
    /// write is exactly one `write(2)`.
    ///
    /// # Errors
    ///
    /// Returns [`LibrateError::Control`] if the file cannot be opened.
    pub fn open_setspeed(&self) -> LibrateResult<File> {
        let path = self.setspeed_path();
        debug!(cpu = self.cpu, path = %path.display(), "Opening setspeed file");
        open_write_only(&path)
    }
}

fn open_write_only(path: &Path) -> LibrateResult<File> {
    OpenOptions::new()
        .write(true)
        .open(path)
        .map_err(|source| LibrateError::Control {
            path: path.to_path_buf(),
            source,
        })
}

fn read_trimmed(path: &Path) -> LibrateResult<String> {
    fs::read_to_string(path)
        .map(|s| s.trim().to_owned())
        .map_err(|source| LibrateError::Control {
            path: path.to_path_buf(),
            source,
        })
}
