use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while preparing or running a frequency alternation.
///
/// `ClockFault` and `WriteFault` abort a run in progress; there is no retry
/// path for either.
#[derive(Debug, Error)]
pub enum LibrateError {
    /// Invalid configuration or command-line input.
    #[error("configuration error: {0}")]
    Config(String),

    /// The monotonic clock could not be read.
    #[error("clock_gettime failed")]
    ClockFault(#[source] io::Error),

    /// Writing a frequency to the control sink failed or was short.
    #[error("couldn't set freq {token}")]
    WriteFault {
        /// Frequency token being written.
        token: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A cpufreq control file could not be opened, read or written.
    #[error("cpufreq control {}", path.display())]
    Control {
        /// Control file involved.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Real-time setup failed for a reason other than missing privileges.
    #[error("real-time setup failed: {0}")]
    Realtime(String),
}

impl LibrateError {
    /// Build the fault reported when the sink accepts fewer bytes than a
    /// full frequency token.
    #[must_use]
    pub fn short_write(token: impl ToString, written: usize, expected: usize) -> Self {
        Self::WriteFault {
            token: token.to_string(),
            source: io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short write: {written} of {expected} bytes"),
            ),
        }
    }

    /// Process exit status for this error.
    ///
    /// Write faults carrying an OS error exit with that errno; everything
    /// else exits with 1.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::WriteFault { source, .. } => source
                .raw_os_error()
                .and_then(|errno| u8::try_from(errno).ok())
                .filter(|&code| code != 0)
                .unwrap_or(1),
            _ => 1,
        }
    }
}

/// Convenience type alias for librate operations.
pub type LibrateResult<T> = Result<T, LibrateError>;
