//! Integration tests for librate acceptance testing.
//!
//! Unprivileged tests run against a fake sysfs tree in a temp directory.
//! Hardware tests need root and a real cpufreq `userspace` governor.

mod common;
mod cpufreq_test;
mod hardware_test;
