//! cpufreq setup acceptance tests against a fake sysfs tree.

use super::common::{plan, short_timing, FakeSysfs};
use librate_common::config::LibrateConfig;
use librate_common::error::LibrateError;
use librate_core::clock::MonotonicClock;
use librate_core::cpufreq::{GOVERNOR_FILE, SETSPEED_FILE};
use librate_core::engine::Alternator;

#[test]
fn test_full_setup_and_run() {
    let sysfs = FakeSysfs::with_cpus(&[0, 1, 2, 3]);
    let control = sysfs.control(2);

    assert_eq!(control.current_governor().unwrap(), "schedutil");
    control.set_governor("userspace").unwrap();
    let mut sink = control.open_setspeed().unwrap();

    let mut alternator = Alternator::new(
        MonotonicClock,
        plan("1800000", "900000", 20, 2),
        &short_timing(),
    );
    alternator.run(&mut sink).unwrap();
    drop(sink);

    assert_eq!(sysfs.read(2, GOVERNOR_FILE), "userspace\n");
    assert_eq!(sysfs.read(2, SETSPEED_FILE), "18000009000001800000900000");
    // Other CPUs are untouched.
    assert_eq!(sysfs.read(1, GOVERNOR_FILE), "schedutil\n");
    assert_eq!(sysfs.read(3, SETSPEED_FILE), "");
}

#[test]
fn test_default_config_targets_userspace() {
    let sysfs = FakeSysfs::with_cpus(&[0]);
    let config = LibrateConfig::default();
    let control = sysfs.control(0);

    let governors = control.available_governors().unwrap();
    assert!(governors.contains(&config.cpufreq.governor));
}

#[test]
fn test_missing_cpu() {
    let sysfs = FakeSysfs::with_cpus(&[0]);
    let control = sysfs.control(9);

    match control.open_setspeed() {
        Err(LibrateError::Control { path, .. }) => {
            assert!(path.starts_with(sysfs.root()));
            assert!(path.ends_with("cpu9/cpufreq/scaling_setspeed"));
        }
        other => panic!("expected control error, got {other:?}"),
    }
    assert!(control.current_governor().is_err());
}

#[test]
fn test_config_file_points_at_fake_tree() {
    let sysfs = FakeSysfs::with_cpus(&[0]);
    let config_dir = tempfile::tempdir().unwrap();
    let config_path = config_dir.path().join("librate.toml");
    std::fs::write(
        &config_path,
        format!(
            "[cpufreq]\nsysfs_root = {:?}\nset_governor = false\n",
            sysfs.root().display().to_string()
        ),
    )
    .unwrap();

    let config = LibrateConfig::from_file(&config_path).unwrap();
    assert_eq!(config.cpufreq.sysfs_root, sysfs.root());
    assert!(!config.cpufreq.set_governor);
    assert!(sysfs
        .file(0, SETSPEED_FILE)
        .starts_with(&config.cpufreq.sysfs_root));
}
