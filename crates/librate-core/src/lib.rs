#![doc = "Timed cpufreq alternation engine for librate."]

pub mod clock;
pub mod cpufreq;
pub mod engine;
pub mod realtime;


pub use clock::*;
pub use cpufreq::*;
pub use engine::*;
pub use realtime::*;
