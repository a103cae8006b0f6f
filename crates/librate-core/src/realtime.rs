//! Real-time setup applied before the alternation loop.
//!
//! - Memory locking (mlockall) so the loop never takes a page fault
//! - Real-time scheduling (SCHED_FIFO/SCHED_RR) so the spin is not preempted
//! - CPU affinity to run on the core whose frequency is being switched
//!
//! Missing privileges only produce warnings; the run still proceeds with
//! whatever could be applied.

use librate_common::config::{RealtimeConfig, SchedPolicy};
use librate_common::error::{LibrateError, LibrateResult};
use tracing::{debug, info, warn};

/// What real-time setup actually achieved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RealtimeStatus {
    /// Whether memory was locked successfully.
    pub memory_locked: bool,
    /// Applied scheduler policy.
    pub scheduler_policy: Option<SchedPolicy>,
    /// Applied scheduler priority.
    pub scheduler_priority: Option<u8>,
    /// CPU the process is pinned to.
    pub pinned_cpu: Option<usize>,
}

/// Apply `config` for a run targeting `cpu`.
///
/// Pinning follows `pin_to_cpu` alone; memory locking and the scheduler
/// policy are only touched when `enabled` is set.
///
/// # Errors
///
/// Returns [`LibrateError::Realtime`] for failures other than missing
/// privileges.
pub fn init_realtime(config: &RealtimeConfig, cpu: usize) -> LibrateResult<RealtimeStatus> {
    let pinned_cpu = if config.pin_to_cpu {
        pin_to_cpu(cpu)?
    } else {
        None
    };

    if !config.enabled {
        info!("Real-time scheduling and memory locking disabled in configuration");
        return Ok(RealtimeStatus {
            pinned_cpu,
            ..RealtimeStatus::default()
        });
    }

    info!(cpu, "Initializing real-time environment");

    let memory_locked = if config.lock_memory {
        lock_memory()?
    } else {
        false
    };

    let (scheduler_policy, scheduler_priority) = set_scheduler(config.policy, config.priority)?;

    let status = RealtimeStatus {
        memory_locked,
        scheduler_policy,
        scheduler_priority,
        pinned_cpu,
    };

    info!(?status, "Real-time initialization complete");
    Ok(status)
}

/// Lock all current and future memory pages.
#[cfg(target_os = "linux")]
fn lock_memory() -> LibrateResult<bool> {
    use nix::sys::mman::{mlockall, MlockAllFlags};

    debug!("Locking memory pages with mlockall");

    match mlockall(MlockAllFlags::MCL_CURRENT | MlockAllFlags::MCL_FUTURE) {
        Ok(()) => {
            info!("Memory locked successfully");
            Ok(true)
        }
        Err(nix::errno::Errno::EPERM) => {
            warn!("mlockall failed with EPERM - running without CAP_IPC_LOCK capability");
            Ok(false)
        }
        Err(e) => Err(LibrateError::Realtime(format!("mlockall failed: {e}"))),
    }
}

#[cfg(not(target_os = "linux"))]
fn lock_memory() -> LibrateResult<bool> {
    warn!("mlockall not available on this platform");
    Ok(false)
}

/// Set real-time scheduler policy and priority.
#[cfg(target_os = "linux")]
fn set_scheduler(
    policy: SchedPolicy,
    priority: u8,
) -> LibrateResult<(Option<SchedPolicy>, Option<u8>)> {
    let linux_policy = match policy {
        SchedPolicy::Fifo => libc::SCHED_FIFO,
        SchedPolicy::Rr => libc::SCHED_RR,
        SchedPolicy::Other => {
            debug!("Using SCHED_OTHER (non-RT) scheduling");
            return Ok((Some(SchedPolicy::Other), None));
        }
    };

    let clamped_priority = priority.clamp(1, 99);
    if clamped_priority != priority {
        warn!(
            original = priority,
            clamped = clamped_priority,
            "Scheduler priority clamped to valid range"
        );
    }

    let param = libc::sched_param {
        sched_priority: i32::from(clamped_priority),
    };

    // SAFETY: pid 0 targets the calling thread and `param` outlives the call.
    #[allow(unsafe_code)]
    let result = unsafe { libc::sched_setscheduler(0, linux_policy, &param) };

    if result == -1 {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::EPERM) {
            warn!(
                "sched_setscheduler failed with EPERM - running without RT privileges. \
                 Consider running with CAP_SYS_NICE capability or as root."
            );
            return Ok((None, None));
        }
        return Err(LibrateError::Realtime(format!(
            "sched_setscheduler failed: {err}"
        )));
    }

    info!(?policy, priority = clamped_priority, "Real-time scheduler configured");
    Ok((Some(policy), Some(clamped_priority)))
}

#[cfg(not(target_os = "linux"))]
fn set_scheduler(
    policy: SchedPolicy,
    priority: u8,
) -> LibrateResult<(Option<SchedPolicy>, Option<u8>)> {
    warn!(?policy, priority, "Real-time scheduling not available on this platform");
    Ok((None, None))
}

/// Pin the calling thread to `cpu`.
#[cfg(target_os = "linux")]
fn pin_to_cpu(cpu: usize) -> LibrateResult<Option<usize>> {
    use nix::sched::{sched_setaffinity, CpuSet};
    use nix::unistd::Pid;

    let mut cpu_set = CpuSet::new();
    cpu_set
        .set(cpu)
        .map_err(|e| LibrateError::Realtime(format!("invalid CPU index {cpu}: {e}")))?;

    match sched_setaffinity(Pid::from_raw(0), &cpu_set) {
        Ok(()) => {
            info!(cpu, "Pinned to target CPU");
            Ok(Some(cpu))
        }
        Err(nix::errno::Errno::EINVAL) => {
            warn!(cpu, "Cannot pin to CPU - it may be offline or outside the allowed set");
            Ok(None)
        }
        Err(e) => Err(LibrateError::Realtime(format!("sched_setaffinity failed: {e}"))),
    }
}

#[cfg(not(target_os = "linux"))]
fn pin_to_cpu(cpu: usize) -> LibrateResult<Option<usize>> {
    warn!(cpu, "CPU affinity not available on this platform");
    Ok(None)
}

/// Whether the process runs with root privileges, which cpufreq writes need.
#[cfg(unix)]
pub fn is_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    #[allow(unsafe_code)]
    let euid = unsafe { libc::geteuid() };
    euid == 0
}

#[cfg(not(unix))]
pub fn is_root() -> bool {
    false
}
