//! librate entry point.
//!
//! Puts one CPU's cpufreq policy into the `userspace` governor, opens its
//! `scaling_setspeed` file and hands it to the alternation engine. Any
//! fault ends the process with a diagnostic and a non-zero exit status.

mod report;

use anyhow::{Context, Result};
use clap::Parser;
use librate_common::config::LibrateConfig;
use librate_common::error::LibrateError;
use librate_common::plan::{AlternationPlan, FrequencyToken};
use librate_core::clock::MonotonicClock;
use librate_core::cpufreq::CpufreqControl;
use librate_core::engine::Alternator;
use librate_core::realtime::{init_realtime, is_root};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};

/// librate command-line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "librate",
    about = "Rapidly alternate a CPU between two cpufreq frequencies",
    version,
    long_about = None
)]
struct Args {
    /// CPU whose frequency is switched.
    cpu: usize,

    /// First frequency of each cycle (kHz, as accepted by scaling_setspeed).
    freq1: FrequencyToken,

    /// Second frequency of each cycle.
    freq2: FrequencyToken,

    /// Busy-wait after each write, in microseconds.
    interval_us: u64,

    /// Number of freq1/freq2 cycles.
    loops: u64,

    /// Path to a configuration file (TOML).
    #[arg(long, short = 'c', value_name = "FILE")]
    config: Option<PathBuf>,

    /// cpufreq sysfs root (overrides config file).
    #[arg(long, value_name = "DIR")]
    sysfs_root: Option<PathBuf>,

    /// Do not touch scaling_governor; it is already set up.
    #[arg(long)]
    keep_governor: bool,

    /// Pin to the target CPU before running. Scheduler policy and memory
    /// locking stay as configured in `[realtime]`.
    #[arg(long)]
    pin: bool,

    /// Print the run report as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, short = 'l', default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    let args = Args::parse();

    init_logging(&args.log_level);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting librate");

    match run(&args, &mut io::stdout().lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::from(exit_code(&e))
        }
    }
}

/// Initialize logging with the specified log level. Logs go to stderr so
/// stdout carries only the status line and the optional report.
fn init_logging(level: &str) {
    let filter = format!("librate={level},librate_core={level},librate_common={level}");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

/// Exit status for a failed run: the errno of a failed frequency write,
/// otherwise 1.
fn exit_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<LibrateError>()
        .map_or(1, LibrateError::exit_code)
}

/// Load configuration from file or use defaults.
///
/// Resolution priority (first existing file wins):
/// 1. Command-line `--config` argument
/// 2. `LIBRATE_CONFIG_PATH` environment variable
/// 3. `/etc/librate/config.toml` (system path)
/// 4. Built-in defaults
fn load_config(args: &Args) -> Result<LibrateConfig> {
    if let Some(config_path) = &args.config {
        info!(?config_path, "Loading config from command-line argument");
        return LibrateConfig::from_file(config_path)
            .with_context(|| format!("Failed to load config from {config_path:?}"));
    }

    if let Ok(env_path) = std::env::var("LIBRATE_CONFIG_PATH") {
        let config_path = PathBuf::from(&env_path);
        if config_path.exists() {
            info!(?config_path, "Loading config from LIBRATE_CONFIG_PATH");
            return LibrateConfig::from_file(&config_path).with_context(|| {
                format!("Failed to load config from LIBRATE_CONFIG_PATH={env_path:?}")
            });
        }
        warn!(
            path = %env_path,
            "LIBRATE_CONFIG_PATH set but file does not exist, checking other locations"
        );
    }

    let system_path = PathBuf::from("/etc/librate/config.toml");
    if system_path.exists() {
        info!(?system_path, "Loading config from system path");
        return LibrateConfig::from_file(&system_path)
            .with_context(|| format!("Failed to load config from {system_path:?}"));
    }

    info!("No config file found, using built-in defaults");
    Ok(LibrateConfig::default())
}

/// Apply command-line overrides on top of the loaded configuration.
fn apply_overrides(config: &mut LibrateConfig, args: &Args) {
    if let Some(root) = &args.sysfs_root {
        config.cpufreq.sysfs_root.clone_from(root);
    }
    if args.keep_governor {
        config.cpufreq.set_governor = false;
    }
    if args.pin {
        config.realtime.pin_to_cpu = true;
    }
}

/// Set up the target CPU and run the alternation. The status line and the
/// optional JSON report go to `out`.
fn run(args: &Args, out: &mut impl Write) -> Result<()> {
    let mut config = load_config(args)?;
    apply_overrides(&mut config, args);

    let plan = AlternationPlan::new(
        args.freq1.clone(),
        args.freq2.clone(),
        args.interval_us,
        args.loops,
    );

    if !is_root() {
        warn!("Not running as root - cpufreq writes will likely be rejected");
    }

    init_realtime(&config.realtime, args.cpu)
        .context("Failed to set up real-time environment")?;

    let control = CpufreqControl::new(&config.cpufreq.sysfs_root, args.cpu);
    prepare_governor(&control, &config)?;

    let mut sink = control
        .open_setspeed()
        .context("Failed to open scaling_setspeed file")?;

    writeln!(out, "{}", report::status_line(&plan))?;
    out.flush()?;

    let mut alternator = Alternator::new(MonotonicClock, plan, &config.timing);
    let run_report = alternator.run(&mut sink)?;

    report::log_summary(&run_report);
    if args.json {
        writeln!(out, "{}", report::to_json(&run_report)?)?;
    }

    Ok(())
}

/// Put the policy into the governor that accepts `scaling_setspeed` writes.
fn prepare_governor(control: &CpufreqControl, config: &LibrateConfig) -> Result<()> {
    let wanted = config.cpufreq.governor.as_str();

    match control.current_governor() {
        Ok(current) => info!(
            cpu = control.cpu(),
            governor = %current,
            "Current governor (not restored on exit)"
        ),
        Err(e) => warn!(error = %e, "Could not read current governor"),
    }

    if !config.cpufreq.set_governor {
        info!("Leaving governor unchanged");
        return Ok(());
    }

    if let Ok(available) = control.available_governors() {
        if !available.iter().any(|g| g == wanted) {
            warn!(
                governor = wanted,
                ?available,
                "Governor not offered by the cpufreq driver"
            );
        }
    }

    control
        .set_governor(wanted)
        .with_context(|| format!("Failed to set up governor {wanted:?}"))
}
