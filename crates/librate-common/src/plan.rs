//! Frequency tokens and the alternation plan handed to the engine.

use crate::error::LibrateError;
use crate::time::MICROS_PER_SEC;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// A frequency value in the textual encoding `scaling_setspeed` expects.
///
/// Decimal digits only, no trailing newline. The value is never checked
/// against the frequencies the hardware actually supports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct FrequencyToken(Box<str>);

impl FrequencyToken {
    /// Raw bytes written to the control sink.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for FrequencyToken {
    type Err = LibrateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(LibrateError::Config("frequency must not be empty".into()));
        }
        if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(LibrateError::Config(format!(
                "invalid frequency {s:?}: expected decimal digits"
            )));
        }
        Ok(Self(trimmed.into()))
    }
}

impl fmt::Display for FrequencyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything the alternation engine needs besides the sink and the clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlternationPlan {
    /// First frequency of each cycle.
    pub freq1: FrequencyToken,
    /// Second frequency of each cycle.
    pub freq2: FrequencyToken,
    /// Busy-wait after each write, in microseconds.
    pub interval_us: u64,
    /// Number of full freq1/freq2 cycles.
    pub num_loops: u64,
}

impl AlternationPlan {
    /// Create a plan.
    #[must_use]
    pub fn new(
        freq1: FrequencyToken,
        freq2: FrequencyToken,
        interval_us: u64,
        num_loops: u64,
    ) -> Self {
        Self {
            freq1,
            freq2,
            interval_us,
            num_loops,
        }
    }

    /// Nominal length of one cycle (two intervals).
    #[must_use]
    pub fn cycle_period(&self) -> Duration {
        Duration::from_micros(self.interval_us.saturating_mul(2))
    }

    /// Nominal length of the whole run, ignoring write latency.
    #[must_use]
    pub fn expected_duration(&self) -> Duration {
        let total_us = u128::from(self.interval_us) * 2 * u128::from(self.num_loops);
        let secs = u64::try_from(total_us / u128::from(MICROS_PER_SEC)).unwrap_or(u64::MAX);
        // Remainder is below 1e6, so the cast is lossless.
        #[allow(clippy::cast_possible_truncation)]
        let micros = (total_us % u128::from(MICROS_PER_SEC)) as u32;
        Duration::new(secs, micros * 1_000)
    }
}
