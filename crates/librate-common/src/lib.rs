#![doc = "Common types shared across the librate workspace."]

pub mod config;
pub mod error;
pub mod plan;
pub mod time;
pub mod timing;

pub use config::*;
pub use error::*;
pub use plan::*;
pub use time::*;
pub use timing::*;
