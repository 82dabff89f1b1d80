//! Wait budgets for blocking pipe operations.

use std::time::{Duration, Instant};

/// How long a blocking pipe operation may wait for its precondition.
///
/// Each direction of a pipe carries its own timeout: the write timeout
/// governs waits for buffer space (and flushes), the read timeout
/// governs waits for data. The budget is measured from the start of the
/// operation and the remaining share is recomputed on every spurious
/// wake.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Timeout {
    /// Wait until the precondition holds or the pipe closes.
    #[default]
    Infinite,
    /// Check the precondition once; fail with
    /// [`PipeError::TimedOut`](crate::PipeError::TimedOut) when it does
    /// not hold. Applies to both directions.
    NonBlocking,
    /// Wait at most this long.
    Finite(Duration),
}

impl Timeout {
    /// Builds a timeout from signed milliseconds: negative values wait
    /// forever, zero never waits, positive values bound the wait.
    #[must_use]
    pub fn from_millis(millis: i64) -> Self {
        match millis {
            m if m < 0 => Self::Infinite,
            0 => Self::NonBlocking,
            m => Self::Finite(Duration::from_millis(m as u64)),
        }
    }

    /// Builds a timeout from signed microseconds, rounded down to whole
    /// milliseconds as select-style callers expect.
    #[must_use]
    pub fn from_micros(micros: i64) -> Self {
        if micros < 0 {
            Self::Infinite
        } else {
            Self::from_millis(micros / 1000)
        }
    }

    /// Returns `true` for a wait with no deadline.
    #[must_use]
    pub const fn is_infinite(self) -> bool {
        matches!(self, Self::Infinite)
    }

    /// Fixes the absolute expiry for one wait.
    pub(crate) fn deadline(self) -> Deadline {
        match self {
            Self::Infinite => Deadline::Never,
            Self::NonBlocking => Deadline::Immediate,
            Self::Finite(budget) => Deadline::At(Instant::now() + budget),
        }
    }
}

/// Absolute expiry computed once when a wait begins.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Deadline {
    Never,
    Immediate,
    At(Instant),
}
