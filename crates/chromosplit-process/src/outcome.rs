//! Terminal outcome of an external program.

use std::fmt;
use std::io;
use std::process::ExitStatus;

/// Signal number delivered to a writer whose pipe reader has gone away.
pub const SIGPIPE: i32 = 13;

/// How a supervised external program finished.
///
/// Anything other than [`ExitOutcome::Succeeded`] aborts the stage that owns the
/// program. The outcome is data rather than an error so that one region's failure
/// can be recorded and reported without unwinding sibling work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitOutcome {
    /// The program exited with status zero.
    Succeeded,
    /// The program exited with a non-zero status code.
    Exited(i32),
    /// The program was terminated by a signal.
    Signaled(i32),
    /// The program could not be started (missing binary, unreadable input, ...).
    SpawnFailed(String),
}

impl ExitOutcome {
    /// Classifies a collected [`ExitStatus`].
    #[must_use]
    pub fn from_status(status: ExitStatus) -> Self {
        if status.success() {
            return Self::Succeeded;
        }
        if let Some(code) = status.code() {
            return Self::Exited(code);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return Self::Signaled(signal);
            }
        }
        Self::Exited(-1)
    }

    /// Builds a spawn failure naming the program (or file) that could not be opened.
    #[must_use]
    pub fn spawn_failed(what: &str, error: &io::Error) -> Self {
        Self::SpawnFailed(format!("{what}: {error}"))
    }

    /// Returns true if the program exited with status zero.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// Returns true if the program died writing into a closed pipe.
    ///
    /// In a streaming chain this is usually a consequence of a downstream stage
    /// exiting early, not a fault of the writer itself.
    #[must_use]
    pub fn is_broken_pipe(&self) -> bool {
        matches!(self, Self::Signaled(SIGPIPE))
    }
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => write!(f, "succeeded"),
            Self::Exited(code) => write!(f, "exited with status {code}"),
            Self::Signaled(signal) => write!(f, "terminated by signal {signal}"),
            Self::SpawnFailed(cause) => write!(f, "failed to start ({cause})"),
        }
    }
}
