//! Render Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
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
    /// Neither a URL/path nor inline HTML was given.
    #[display("No input source specified.")]
    MissingSource,
    /// File-mode generation was requested without somewhere to put the PDF.
    #[display("No output destination specified.")]
    MissingDestination,
    /// The renderer exited with a non-zero exit code (or was killed by a
    /// signal, in which case `status` is `None`).
    #[display("The PDF generation from {input} to {} failed. [{command}: {stderr}]", output.display())]
    GenerationFailed {
        input: String,
        output: PathBuf,
        command: String,
        stderr: String,
        status: Option<i32>,
    },
    /// The renderer did not finish in time and was killed.
    #[display("renderer did not finish within {}s: {command}", timeout.as_secs_f32())]
    Timeout { command: String, timeout: Duration },
    /// The renderer (or its wrappers) could not be started at all.
    #[display("could not start renderer: {_0}")]
    Spawn(#[error(not(source))] String),
    /// A virtual display could not be provided. Generation only logs this.
    #[display("virtual display unavailable: {_0}")]
    DisplayUnavailable(#[error(not(source))] String),
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Io)
    }
}
