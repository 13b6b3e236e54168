//! Recorder error types.

use derive_more::{Display, Error};
use tracing::instrument;

/// Recorder error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("Recorder error: {} at {}:{}", message, file, line)]
pub struct RecorderError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl RecorderError {
    /// Creates a new recorder error with caller location tracking.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

impl From<std::io::Error> for RecorderError {
    #[track_caller]
    fn from(err: std::io::Error) -> Self {
        Self::new(format!("I/O error: {}", err))
    }
}
