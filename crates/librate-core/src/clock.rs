//! Monotonic clock service.
//!
//! Delays are implemented as an active poll of `CLOCK_MONOTONIC`: the
//! thread never sleeps or yields, so interval precision is bounded by the
//! cost of one `clock_gettime` call rather than by scheduler latency.

use librate_common::error::{LibrateError, LibrateResult};
use librate_common::time::MonoTime;

/// Source of monotonic time readings.
pub trait Clock {
    /// Read the current instant.
    ///
    /// # Errors
    ///
    /// Returns [`LibrateError::ClockFault`] if the time source is unavailable.
    fn now(&self) -> LibrateResult<MonoTime>;
}

impl<C: Clock + ?Sized> Clock for &C {
    #[inline]
    fn now(&self) -> LibrateResult<MonoTime> {
        (**self).now()
    }
}

/// `CLOCK_MONOTONIC` via `clock_gettime`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> LibrateResult<MonoTime> {
        use nix::time::{clock_gettime, ClockId};

        let ts = clock_gettime(ClockId::CLOCK_MONOTONIC)
            .map_err(|errno| LibrateError::ClockFault(errno.into()))?;

        // The kernel keeps tv_nsec in [0, 1e9).
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let nanos = ts.tv_nsec() as u32;
        #[allow(clippy::useless_conversion)]
        let secs = i64::from(ts.tv_sec());
        Ok(MonoTime::new(secs, nanos))
    }
}

/// Deadline `micros` microseconds after `base`, with the nanosecond
/// component normalized into `[0, 1e9)`.
#[inline]
#[must_use]
pub fn compute_deadline(base: MonoTime, micros: u64) -> MonoTime {
    base.add_micros(micros)
}

/// Spin on `clock` until it reads at or past `deadline`.
///
/// Always reads the clock at least once. Returns the first reading that
/// satisfied the deadline.
///
/// # Errors
///
/// Propagates the first clock fault.
#[inline]
pub fn wait_until<C: Clock + ?Sized>(clock: &C, deadline: MonoTime) -> LibrateResult<MonoTime> {
    loop {
        let now = clock.now()?;
        if now >= deadline {
            return Ok(now);
        }
    }
}

/// Busy-wait for `micros` microseconds measured from a fresh clock reading.
///
/// # Errors
///
/// Propagates the first clock fault.
#[inline]
pub fn delay<C: Clock + ?Sized>(clock: &C, micros: u64) -> LibrateResult<MonoTime> {
    let deadline = compute_deadline(clock.now()?, micros);
    wait_until(clock, deadline)
}
