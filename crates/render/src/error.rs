//! Render Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// A render error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for render operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("chrome/chromium not detected on your system")]
    ChromeNotFound,
    /// The binary failed its `--version` self-check. Cached for the lifetime
    /// of the generator, so every later call fails the same way.
    #[display("the chrome binary is invalid")]
    InvalidBinary(ProcessFailure),
    /// Chrome exited unsuccessfully (or never started) while rendering.
    #[display("some error occurred while generating PDF")]
    RenderFailed(ProcessFailure),
    #[display("chrome did not finish within {}ms", _0.as_millis())]
    ChromeTimeout(#[error(not(source))] Duration),
    /// Staging file could not be written or removed.
    #[display("I/O error: {}", _0.display())]
    Io(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ChromeTimeout(_))
    }

    /// Returns `true` for failures reported by the external binary itself.
    pub fn is_render_error(&self) -> bool {
        matches!(self, Self::InvalidBinary(_) | Self::RenderFailed(_))
    }

    /// Captured detail of the failed process, if this error came from one.
    pub fn process_failure(&self) -> Option<&ProcessFailure> {
        match self {
            Self::InvalidBinary(failure) | Self::RenderFailed(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Diagnostics captured from an unsuccessful subprocess.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub struct ProcessFailure {
    /// Lossy rendering of the full command line.
    pub command: String,
    /// `None` when the process never started or was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}
impl ProcessFailure {
    pub(crate) fn not_started(command: String, err: &std::io::Error) -> Self {
        Self { command, exit_code: None, stdout: String::new(), stderr: err.to_string() }
    }
}
impl fmt::Display for ProcessFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.exit_code {
            Some(code) => write!(f, "`{}` exited with code {}", self.command, code)?,
            None => write!(f, "`{}` did not exit normally", self.command)?,
        }
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            write!(f, ": {stderr}")?;
        }
        Ok(())
    }
}
