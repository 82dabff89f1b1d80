//! Write-only facade over a pipe.

use std::io::{self, Write};
use std::ops::Range;
use std::sync::Arc;

use crate::error::{PipeError, PipeResult};
use crate::flags::PipeFlags;
use crate::pipe::{AppendSource, Inner, Pipe};
use crate::timeout::Timeout;

/// The producer half of a pipe.
///
/// A writer is a single-instance `Send` handle; it implements
/// [`std::io::Write`] for composition with generic I/O code and offers
/// inherent appends for the ownership-transferring paths. Dropping the
/// writer closes the write end, so readers observe end of stream once
/// the buffer drains.
#[derive(Debug)]
pub struct PipeWriter {
    inner: Arc<Inner>,
}

impl PipeWriter {
    pub(crate) fn new(inner: Arc<Inner>) -> Self {
        Self { inner }
    }

    /// Appends a copy of `data`, waiting for buffer space if necessary.
    ///
    /// Fails with [`PipeError::Disposed`] once this half is closed and
    /// with [`PipeError::ReadEndClosed`] when the consumer is gone.
    pub fn append(&self, data: &[u8]) -> PipeResult<()> {
        self.inner.append(AppendSource::Borrowed(data))
    }

    /// Appends an owned buffer, moving it into the pipe without a copy.
    pub fn append_owned(&self, data: Vec<u8>) -> PipeResult<()> {
        self.inner.append(AppendSource::Owned(data))
    }

    /// Appends `data[range]`. Under [`PipeFlags::NO_COPY`] the shared
    /// buffer is aliased rather than copied; without the flag the pipe
    /// copies so it never retains the caller's allocation.
    pub fn append_shared(&self, data: Arc<[u8]>, range: Range<usize>) -> PipeResult<()> {
        if range.start > range.end || range.end > data.len() {
            return Err(PipeError::InvalidArgument(
                "shared append range out of bounds",
            ));
        }
        self.inner.append(AppendSource::Shared {
            buf: data,
            start: range.start,
            end: range.end,
        })
    }

    /// Appends a single byte.
    pub fn append_byte(&self, byte: u8) -> PipeResult<()> {
        self.append(&[byte])
    }

    /// Blocks until every buffered byte drains or the read end goes
    /// away, honoring the write timeout. While the flush is pending,
    /// appends from any writer block.
    pub fn flush(&self) -> PipeResult<()> {
        let timeout = self.inner.write_timeout();
        self.inner.flush(timeout)
    }

    /// Closes the write end. Buffered bytes remain readable; pending
    /// reads wake and observe end of stream once the buffer empties.
    /// Idempotent.
    pub fn close(&self) {
        self.inner.close_write_end();
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

    /// Returns `true` while both this half and the read end are open.
    #[must_use]
    pub fn can_write(&self) -> bool {
        self.inner.can_write()
    }

    /// Timeout applied to waits for buffer space and to flushes.
    #[must_use]
    pub fn write_timeout(&self) -> Timeout {
        self.inner.write_timeout()
    }

    /// Sets the timeout applied to waits for buffer space and flushes.
    pub fn set_write_timeout(&self, timeout: Timeout) {
        self.inner.set_write_timeout(timeout);
    }

    /// Returns the owning pipe's control handle, or `None` when the
    /// write-direction flags carry [`PipeFlags::INVISIBLE`].
    #[must_use]
    pub fn pipe(&self) -> Option<Pipe> {
        if self.inner.in_flags().contains(PipeFlags::INVISIBLE) {
            None
        } else {
            Some(Pipe::new(Arc::clone(&self.inner)))
        }
    }
}

impl Write for PipeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.append(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        PipeWriter::flush(self).map_err(io::Error::from)
    }
}

impl Drop for PipeWriter {
    fn drop(&mut self) {
        self.inner.close_write_end();
    }
}
