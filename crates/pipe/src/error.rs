//! Error types for pipe operations.

use std::io;

use thiserror::Error;

/// Result type for pipe operations.
pub type PipeResult<T> = Result<T, PipeError>;

/// Errors that can occur while appending to or draining a pipe.
///
/// Drains never fail just because the producer went away: once the write
/// end closes, reads return end-of-stream values instead of
/// [`WriteEndClosed`](Self::WriteEndClosed). The closed-end variants are
/// reserved for operations that can no longer make progress at all.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum PipeError {
    /// A parameter was out of range for the requested operation.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// The operation was invoked on a closed write half or a disposed
    /// pipe.
    #[error("pipe has been disposed")]
    Disposed,
    /// A blocking operation exceeded its configured timeout.
    #[error("pipe operation timed out")]
    TimedOut,
    /// The read end is closed; neither appends nor further drains can
    /// make progress.
    #[error("read end of the pipe is closed")]
    ReadEndClosed,
    /// The write end closed while an append was waiting for buffer space.
    #[error("write end of the pipe is closed")]
    WriteEndClosed,
}

impl From<PipeError> for io::Error {
    fn from(err: PipeError) -> Self {
        let kind = match err {
            PipeError::InvalidArgument(_) => io::ErrorKind::InvalidInput,
            PipeError::TimedOut => io::ErrorKind::TimedOut,
            PipeError::Disposed | PipeError::ReadEndClosed | PipeError::WriteEndClosed => {
                io::ErrorKind::BrokenPipe
            }
        };
        io::Error::new(kind, err)
    }
}
