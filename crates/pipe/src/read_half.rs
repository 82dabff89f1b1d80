//! Read-only facade over a pipe.

use std::io::{self, Read, Write};
use std::sync::Arc;

use crate::error::{PipeError, PipeResult};
use crate::flags::PipeFlags;
use crate::pipe::{Inner, Pipe};
use crate::timeout::Timeout;

/// Default chunk limit for [`PipeReader::read_available`] callers that
/// have no better number.
pub const DEFAULT_READ_AVAILABLE_LIMIT: usize = 64 * 1024;

/// Poll interests for select-style integration.
///
/// Only [`PollMode::Read`] is meaningful on a pipe reader; the other
/// interests exist so select loops can pass their mode through and get
/// a uniform argument error back.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PollMode {
    /// Wake when buffered data is available.
    Read,
    /// Unsupported on a pipe reader.
    Write,
    /// Unsupported on a pipe reader.
    Error,
}

/// The consumer half of a pipe.
///
/// A reader is a single-instance `Send` handle; it implements
/// [`std::io::Read`] and offers inherent drains with richer end-of-
/// stream signalling. Dropping the reader closes the read end, which
/// discards buffered bytes and fails blocked writers.
#[derive(Debug)]
pub struct PipeReader {
    inner: Arc<Inner>,
}

impl PipeReader {
    pub(crate) fn new(inner: Arc<Inner>) -> Self {
        Self { inner }
    }

    /// Blocks until data is available, then copies up to `dst.len()`
    /// bytes across as many segments as needed. Returns the number of
    /// bytes copied, or 0 at end of stream. Never waits a second time
    /// once data has been copied.
    pub fn read(&self, dst: &mut [u8]) -> PipeResult<usize> {
        self.inner.read(dst)
    }

    /// Blocks until data is available and consumes one byte, or returns
    /// `None` at end of stream.
    pub fn read_byte(&self) -> PipeResult<Option<u8>> {
        self.inner.read_byte()
    }

    /// Blocks until data is available, then drains up to `max` bytes
    /// into a fresh buffer sized to what was actually buffered. Returns
    /// `None` at end of stream. `max` must be positive.
    pub fn read_available(&self, max: usize) -> PipeResult<Option<Vec<u8>>> {
        self.inner.read_available(max)
    }

    /// Discards every buffered byte and wakes waiters (writers blocked
    /// on space see the freed room immediately).
    pub fn discard_buffered(&self) {
        self.inner.clear();
    }

    /// Reports whether data became available within `timeout_micros`
    /// (rounded down to whole milliseconds; negative waits forever).
    /// Returns `false` on timeout and at end of stream. Modes other
    /// than [`PollMode::Read`] fail with an argument error.
    pub fn poll(&self, timeout_micros: i64, mode: PollMode) -> PipeResult<bool> {
        if mode != PollMode::Read {
            return Err(PipeError::InvalidArgument(
                "only read polling is supported on a pipe reader",
            ));
        }
        self.inner.poll_data(Timeout::from_micros(timeout_micros))
    }

    /// Streams the pipe's contents into `sink` in 4096-byte chunks
    /// until end of stream. Returns the number of bytes forwarded.
    pub fn write_to<W: Write>(&self, sink: &mut W) -> io::Result<u64> {
        let mut scratch = [0u8; 4096];
        let mut total = 0u64;
        loop {
            let copied = self.read(&mut scratch)?;
            if copied == 0 {
                break;
            }
            sink.write_all(&scratch[..copied])?;
            total += copied as u64;
        }
        Ok(total)
    }

    /// Closes the read end: buffered bytes are discarded and blocked
    /// writers wake with an error. Idempotent.
    pub fn close(&self) {
        self.inner.close_read_end();
    }

    /// Number of buffered bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` when no bytes are buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` while this half is open and bytes are either
    /// buffered or still possible (write end open).
    #[must_use]
    pub fn can_read(&self) -> bool {
        self.inner.can_read()
    }

    /// Timeout applied to waits for data.
    #[must_use]
    pub fn read_timeout(&self) -> Timeout {
        self.inner.read_timeout()
    }

    /// Sets the timeout applied to waits for data.
    pub fn set_read_timeout(&self, timeout: Timeout) {
        self.inner.set_read_timeout(timeout);
    }

    /// Returns the owning pipe's control handle, or `None` when the
    /// read-direction flags carry [`PipeFlags::INVISIBLE`].
    #[must_use]
    pub fn pipe(&self) -> Option<Pipe> {
        if self.inner.out_flags().contains(PipeFlags::INVISIBLE) {
            None
        } else {
            Some(Pipe::new(Arc::clone(&self.inner)))
        }
    }
}

impl Read for PipeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        PipeReader::read(self, buf).map_err(io::Error::from)
    }
}

impl Drop for PipeReader {
    fn drop(&mut self) {
        self.inner.close_read_end();
    }
}
