//! Monotonic timestamps.
//!
//! [`MonoTime`] mirrors a `CLOCK_MONOTONIC` timespec: whole seconds plus a
//! nanosecond component that is always kept in `[0, NANOS_PER_SEC)`. All
//! arithmetic is exact integer math so repeated deadline computations never
//! accumulate rounding error.

use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Nanoseconds in one second.
pub const NANOS_PER_SEC: u32 = 1_000_000_000;

/// Nanoseconds in one microsecond.
pub const NANOS_PER_MICRO: u32 = 1_000;

/// Microseconds in one second.
pub const MICROS_PER_SEC: u64 = 1_000_000;

/// A point on the monotonic timeline.
///
/// Ordering compares seconds first, then nanoseconds, which is only correct
/// because the nanosecond component is normalized on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct MonoTime {
    secs: i64,
    nanos: u32,
}

impl MonoTime {
    /// The clock origin.
    pub const ZERO: MonoTime = MonoTime { secs: 0, nanos: 0 };

    /// Build a timestamp, carrying any whole seconds out of `nanos`.
    #[must_use]
    pub fn new(secs: i64, nanos: u32) -> Self {
        let carry = i64::from(nanos / NANOS_PER_SEC);
        Self {
            secs: secs.saturating_add(carry),
            nanos: nanos % NANOS_PER_SEC,
        }
    }

    /// Whole seconds component.
    #[must_use]
    pub fn secs(&self) -> i64 {
        self.secs
    }

    /// Nanosecond component, always below [`NANOS_PER_SEC`].
    #[must_use]
    pub fn subsec_nanos(&self) -> u32 {
        self.nanos
    }

    /// Total nanoseconds since the clock origin.
    #[must_use]
    pub fn as_nanos(&self) -> i128 {
        i128::from(self.secs) * i128::from(NANOS_PER_SEC) + i128::from(self.nanos)
    }

    /// Return `self + micros` microseconds.
    ///
    /// The whole-second part of the interval is added to the seconds
    /// component directly and the remainder (converted to nanoseconds) to the
    /// nanosecond component, followed by a single carry step. The seconds
    /// component saturates rather than wrapping.
    #[must_use]
    pub fn add_micros(self, micros: u64) -> Self {
        let whole_secs = i64::try_from(micros / MICROS_PER_SEC).unwrap_or(i64::MAX);
        // < 1e6 µs, so the product stays below 1e9 and fits u32.
        #[allow(clippy::cast_possible_truncation)]
        let extra_nanos = (micros % MICROS_PER_SEC) as u32 * NANOS_PER_MICRO;

        let mut secs = self.secs.saturating_add(whole_secs);
        let mut nanos = self.nanos + extra_nanos;
        if nanos >= NANOS_PER_SEC {
            secs = secs.saturating_add(1);
            nanos -= NANOS_PER_SEC;
        }

        Self { secs, nanos }
    }

    /// Time elapsed from `earlier` to `self`, or zero if `earlier` is later.
    #[must_use]
    pub fn saturating_duration_since(self, earlier: MonoTime) -> Duration {
        let delta = self.as_nanos() - earlier.as_nanos();
        if delta <= 0 {
            return Duration::ZERO;
        }

        let nanos_per_sec = i128::from(NANOS_PER_SEC);
        let secs = u64::try_from(delta / nanos_per_sec).unwrap_or(u64::MAX);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let nanos = (delta % nanos_per_sec) as u32;
        Duration::new(secs, nanos)
    }
}

impl fmt::Display for MonoTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}s", self.secs, self.nanos)
    }
}
