//! The pipe core: shared state, blocking wait loops, and the control
//! handle.
//!
//! All buffered state lives in one [`Mutex`]; a single [`Condvar`] is
//! broadcast on every state transition so that each class of waiter
//! (space, data, flush-drained) re-evaluates its own precondition.

use std::num::NonZeroUsize;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Instant;

use crate::error::{PipeError, PipeResult};
use crate::flags::PipeFlags;
use crate::read_half::PipeReader;
use crate::segment::{Segment, SegmentQueue};
use crate::timeout::{Deadline, Timeout};
use crate::write_half::PipeWriter;

/// Default buffered-byte budget: 256 MiB.
pub const DEFAULT_CAPACITY: usize = 256 * 1024 * 1024;

/// Construction-time settings for a pipe.
///
/// The defaults are an unbounded-in-practice 256 MiB capacity, empty
/// flag sets, and infinite timeouts in both directions.
///
/// ```
/// use pipe::{PipeFlags, PipeOptions, Timeout};
/// use std::num::NonZeroUsize;
///
/// let options = PipeOptions::new()
///     .capacity(NonZeroUsize::new(4096).expect("non-zero"))
///     .in_flags(PipeFlags::SYNC)
///     .read_timeout(Timeout::from_millis(500));
/// ```
#[derive(Clone, Debug)]
pub struct PipeOptions {
    capacity: NonZeroUsize,
    in_flags: PipeFlags,
    out_flags: PipeFlags,
    read_timeout: Timeout,
    write_timeout: Timeout,
}

impl Default for PipeOptions {
    fn default() -> Self {
        Self {
            capacity: NonZeroUsize::new(DEFAULT_CAPACITY).expect("default capacity is non-zero"),
            in_flags: PipeFlags::EMPTY,
            out_flags: PipeFlags::EMPTY,
            read_timeout: Timeout::Infinite,
            write_timeout: Timeout::Infinite,
        }
    }
}

impl PipeOptions {
    /// Creates options with the defaults described above.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of buffered bytes.
    #[must_use]
    pub fn capacity(mut self, capacity: NonZeroUsize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the write-direction flags.
    #[must_use]
    pub fn in_flags(mut self, flags: PipeFlags) -> Self {
        self.in_flags = flags;
        self
    }

    /// Sets the read-direction flags.
    #[must_use]
    pub fn out_flags(mut self, flags: PipeFlags) -> Self {
        self.out_flags = flags;
        self
    }

    /// Sets the timeout applied to waits for data.
    #[must_use]
    pub fn read_timeout(mut self, timeout: Timeout) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Sets the timeout applied to waits for space and to flushes.
    #[must_use]
    pub fn write_timeout(mut self, timeout: Timeout) -> Self {
        self.write_timeout = timeout;
        self
    }
}

/// Creates a bounded in-process byte pipe, returning its two halves.
///
/// The writer and reader are independent `Send` values; the usual
/// arrangement hands one to a producer thread and the other to a
/// consumer. Dropping a half closes its end.
#[must_use]
pub fn pipe(options: PipeOptions) -> (PipeWriter, PipeReader) {
    let inner = Arc::new(Inner {
        state: Mutex::new(State {
            queue: SegmentQueue::default(),
            capacity: options.capacity.get(),
            in_flags: options.in_flags,
            out_flags: options.out_flags,
            in_closed: false,
            out_closed: false,
            disposed: false,
            flushing: false,
            read_timeout: options.read_timeout,
            write_timeout: options.write_timeout,
        }),
        cond: Condvar::new(),
    });
    (
        PipeWriter::new(Arc::clone(&inner)),
        PipeReader::new(inner),
    )
}

#[derive(Debug)]
struct State {
    queue: SegmentQueue,
    capacity: usize,
    in_flags: PipeFlags,
    out_flags: PipeFlags,
    in_closed: bool,
    out_closed: bool,
    disposed: bool,
    flushing: bool,
    read_timeout: Timeout,
    write_timeout: Timeout,
}

/// Bytes handed to an append, in one of the three ownership renditions.
pub(crate) enum AppendSource<'a> {
    /// Borrowed bytes; always copied into the segment.
    Borrowed(&'a [u8]),
    /// An owned buffer; moved into the segment without copying.
    Owned(Vec<u8>),
    /// A shared buffer plus range; aliased only under `NO_COPY`.
    Shared {
        buf: Arc<[u8]>,
        start: usize,
        end: usize,
    },
}

impl AppendSource<'_> {
    fn len(&self) -> usize {
        match self {
            Self::Borrowed(data) => data.len(),
            Self::Owned(data) => data.len(),
            Self::Shared { start, end, .. } => end - start,
        }
    }

    fn into_segment(self, no_copy: bool) -> Segment {
        match self {
            Self::Borrowed(data) => Segment::copied(data),
            Self::Owned(data) => Segment::owned(data),
            Self::Shared { buf, start, end } => {
                if no_copy {
                    Segment::shared(buf, start, end)
                } else {
                    Segment::copied(&buf[start..end])
                }
            }
        }
    }
}

/// Outcome of a successful wait-for-data.
pub(crate) enum DataState {
    /// Buffered bytes are available and the read end is open.
    Ready,
    /// The write end closed and the buffer is empty.
    Eof,
}

/// Shared pipe state plus its condition variable.
#[derive(Debug)]
pub(crate) struct Inner {
    state: Mutex<State>,
    cond: Condvar,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("pipe mutex poisoned")
    }

    /// Blocks on the condition variable until notified or the deadline
    /// passes. `Deadline::Immediate` fails without releasing the CPU:
    /// callers check their precondition before waiting, so reaching this
    /// point already means the non-blocking check failed.
    fn wait<'a>(
        &'a self,
        guard: MutexGuard<'a, State>,
        deadline: Deadline,
    ) -> PipeResult<MutexGuard<'a, State>> {
        match deadline {
            Deadline::Never => Ok(self.cond.wait(guard).expect("pipe mutex poisoned")),
            Deadline::Immediate => Err(PipeError::TimedOut),
            Deadline::At(when) => {
                let now = Instant::now();
                if now >= when {
                    return Err(PipeError::TimedOut);
                }
                let (guard, _) = self
                    .cond
                    .wait_timeout(guard, when - now)
                    .expect("pipe mutex poisoned");
                Ok(guard)
            }
        }
    }

    /// Enqueues one segment, waiting for space first.
    pub(crate) fn append(&self, source: AppendSource<'_>) -> PipeResult<()> {
        let len = source.len();
        if len == 0 {
            return Ok(());
        }

        let mut state = self.lock();
        if len > state.capacity {
            return Err(PipeError::InvalidArgument(
                "append larger than the pipe capacity",
            ));
        }
        if state.disposed || state.in_closed {
            return Err(PipeError::Disposed);
        }
        if state.out_closed {
            return Err(PipeError::ReadEndClosed);
        }

        let deadline = state.write_timeout.deadline();
        while state.queue.total() + len > state.capacity || state.flushing {
            state = self.wait(state, deadline)?;
            if state.disposed {
                return Err(PipeError::Disposed);
            }
            if state.out_closed {
                return Err(PipeError::ReadEndClosed);
            }
            if state.in_closed {
                return Err(PipeError::WriteEndClosed);
            }
        }

        let no_copy = state.in_flags.contains(PipeFlags::NO_COPY);
        let sync = state.in_flags.contains(PipeFlags::SYNC);
        let write_timeout = state.write_timeout;
        state.queue.push(source.into_segment(no_copy));
        self.cond.notify_all();
        drop(state);

        if sync {
            self.flush(write_timeout)
        } else {
            Ok(())
        }
    }

    /// Waits until every buffered byte drains or the read end goes away.
    ///
    /// While the flush is pending, new appends block. The pending bit is
    /// cleared on every exit path, including timeouts.
    pub(crate) fn flush(&self, timeout: Timeout) -> PipeResult<()> {
        let deadline = timeout.deadline();
        let mut state = self.lock();
        if state.disposed {
            return Err(PipeError::Disposed);
        }
        state.flushing = true;
        self.cond.notify_all();

        let result = loop {
            if state.disposed {
                break Err(PipeError::Disposed);
            }
            if state.queue.is_empty() || state.out_closed {
                break Ok(());
            }
            match self.wait(state, deadline) {
                Ok(guard) => state = guard,
                Err(err) => {
                    state = self.lock();
                    break Err(err);
                }
            }
        };

        state.flushing = false;
        self.cond.notify_all();
        result
    }

    /// Common drain precondition: blocks until data is available, the
    /// stream ends, or the wait budget runs out.
    fn await_data<'a>(
        &'a self,
        mut state: MutexGuard<'a, State>,
        timeout: Timeout,
    ) -> PipeResult<(MutexGuard<'a, State>, DataState)> {
        if state.disposed {
            return Err(PipeError::Disposed);
        }
        if state.out_closed {
            return Err(PipeError::ReadEndClosed);
        }
        let deadline = timeout.deadline();
        loop {
            if state.queue.total() > 0 {
                return Ok((state, DataState::Ready));
            }
            if state.in_closed {
                return Ok((state, DataState::Eof));
            }
            state = self.wait(state, deadline)?;
            if state.disposed {
                return Err(PipeError::Disposed);
            }
            if state.out_closed {
                return Err(PipeError::ReadEndClosed);
            }
        }
    }

    /// Copies buffered bytes into `dst`. Returns 0 at end of stream.
    pub(crate) fn read(&self, dst: &mut [u8]) -> PipeResult<usize> {
        if dst.is_empty() {
            return Ok(0);
        }
        let state = self.lock();
        let timeout = state.read_timeout;
        let (mut state, data) = self.await_data(state, timeout)?;
        if matches!(data, DataState::Eof) {
            return Ok(0);
        }
        let copied = state.queue.drain_into(dst);
        self.cond.notify_all();
        Ok(copied)
    }

    /// Consumes a single byte. Returns `None` at end of stream.
    pub(crate) fn read_byte(&self) -> PipeResult<Option<u8>> {
        let state = self.lock();
        let timeout = state.read_timeout;
        let (mut state, data) = self.await_data(state, timeout)?;
        if matches!(data, DataState::Eof) {
            return Ok(None);
        }
        let byte = state.queue.drain_byte();
        debug_assert!(byte.is_some());
        self.cond.notify_all();
        Ok(byte)
    }

    /// Drains up to `max` buffered bytes into a fresh buffer. Returns
    /// `None` at end of stream.
    pub(crate) fn read_available(&self, max: usize) -> PipeResult<Option<Vec<u8>>> {
        if max == 0 {
            return Err(PipeError::InvalidArgument(
                "read_available requires a positive chunk limit",
            ));
        }
        let state = self.lock();
        let timeout = state.read_timeout;
        let (mut state, data) = self.await_data(state, timeout)?;
        if matches!(data, DataState::Eof) {
            return Ok(None);
        }
        let mut buf = vec![0u8; max.min(state.queue.total())];
        let copied = state.queue.drain_into(&mut buf);
        debug_assert_eq!(copied, buf.len());
        self.cond.notify_all();
        Ok(Some(buf))
    }

    /// Reports whether data became available within `timeout`.
    pub(crate) fn poll_data(&self, timeout: Timeout) -> PipeResult<bool> {
        let state = self.lock();
        match self.await_data(state, timeout) {
            Ok((_, DataState::Ready)) => Ok(true),
            Ok((_, DataState::Eof)) => Ok(false),
            Err(PipeError::TimedOut) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Discards all buffered bytes and wakes every waiter.
    pub(crate) fn clear(&self) {
        let mut state = self.lock();
        state.queue.clear();
        self.cond.notify_all();
    }

    /// Closes the write end. Buffered bytes stay readable; drains
    /// return end-of-stream once the buffer empties. Idempotent.
    pub(crate) fn close_write_end(&self) {
        let mut state = self.lock();
        if state.in_closed {
            return;
        }
        state.in_closed = true;
        self.cond.notify_all();
    }

    /// Closes the read end, discarding buffered bytes. Blocked writers
    /// wake and fail. Idempotent.
    pub(crate) fn close_read_end(&self) {
        let mut state = self.lock();
        if state.out_closed {
            return;
        }
        state.out_closed = true;
        state.queue.clear();
        self.cond.notify_all();
    }

    /// Closes both ends and marks the pipe disposed. Idempotent.
    pub(crate) fn dispose(&self) {
        let mut state = self.lock();
        if state.disposed {
            return;
        }
        state.disposed = true;
        state.in_closed = true;
        state.out_closed = true;
        state.queue.clear();
        self.cond.notify_all();
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().queue.total()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.lock().capacity
    }

    /// Applies a new capacity. Buffered bytes are never dropped: a value
    /// below the current fill level leaves writers waiting until drains
    /// catch up.
    pub(crate) fn set_capacity(&self, capacity: usize) -> PipeResult<()> {
        if capacity == 0 {
            return Err(PipeError::InvalidArgument("capacity must be positive"));
        }
        let mut state = self.lock();
        state.capacity = capacity;
        self.cond.notify_all();
        Ok(())
    }

    pub(crate) fn in_flags(&self) -> PipeFlags {
        self.lock().in_flags
    }

    pub(crate) fn out_flags(&self) -> PipeFlags {
        self.lock().out_flags
    }

    /// Assigns the write-direction flags. A previously-set `INVISIBLE`
    /// bit survives the assignment.
    pub(crate) fn set_in_flags(&self, flags: PipeFlags) {
        let mut state = self.lock();
        state.in_flags = sticky(flags, state.in_flags);
        self.cond.notify_all();
    }

    /// Assigns the read-direction flags, with the same stickiness.
    pub(crate) fn set_out_flags(&self, flags: PipeFlags) {
        let mut state = self.lock();
        state.out_flags = sticky(flags, state.out_flags);
        self.cond.notify_all();
    }

    pub(crate) fn read_timeout(&self) -> Timeout {
        self.lock().read_timeout
    }

    pub(crate) fn write_timeout(&self) -> Timeout {
        self.lock().write_timeout
    }

    pub(crate) fn set_read_timeout(&self, timeout: Timeout) {
        let mut state = self.lock();
        state.read_timeout = timeout;
        self.cond.notify_all();
    }

    pub(crate) fn set_write_timeout(&self, timeout: Timeout) {
        let mut state = self.lock();
        state.write_timeout = timeout;
        self.cond.notify_all();
    }

    pub(crate) fn is_write_closed(&self) -> bool {
        self.lock().in_closed
    }

    pub(crate) fn is_read_closed(&self) -> bool {
        self.lock().out_closed
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.lock().disposed
    }

    pub(crate) fn can_write(&self) -> bool {
        let state = self.lock();
        !state.in_closed && !state.out_closed
    }

    pub(crate) fn can_read(&self) -> bool {
        let state = self.lock();
        !state.out_closed && (state.queue.total() > 0 || !state.in_closed)
    }
}

fn sticky(flags: PipeFlags, previous: PipeFlags) -> PipeFlags {
    if previous.contains(PipeFlags::INVISIBLE) {
        flags | PipeFlags::INVISIBLE
    } else {
        flags
    }
}

/// Cloneable control handle over a pipe.
///
/// The handle carries no stream position of its own; it mutates the
/// shared capacity, flags, and timeouts, inspects the fill level, and
/// disposes the pipe. It is obtained from either half's
/// [`pipe()`](crate::PipeWriter::pipe) accessor unless that direction
/// carries [`PipeFlags::INVISIBLE`].
#[derive(Clone, Debug)]
pub struct Pipe {
    inner: Arc<Inner>,
}

impl Pipe {
    pub(crate) fn new(inner: Arc<Inner>) -> Self {
        Self { inner }
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

    /// Maximum number of buffered bytes before appends block.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    /// Changes the capacity. Fails when `capacity` is zero. A value
    /// below the current fill level is accepted; buffered bytes are
    /// kept and writers wait until drains bring the level back down.
    pub fn set_capacity(&self, capacity: usize) -> PipeResult<()> {
        self.inner.set_capacity(capacity)
    }

    /// Write-direction flags.
    #[must_use]
    pub fn in_flags(&self) -> PipeFlags {
        self.inner.in_flags()
    }

    /// Read-direction flags.
    #[must_use]
    pub fn out_flags(&self) -> PipeFlags {
        self.inner.out_flags()
    }

    /// Assigns the write-direction flags. A previously-set
    /// [`PipeFlags::INVISIBLE`] bit is preserved.
    pub fn set_in_flags(&self, flags: PipeFlags) {
        self.inner.set_in_flags(flags);
    }

    /// Assigns the read-direction flags, with the same stickiness.
    pub fn set_out_flags(&self, flags: PipeFlags) {
        self.inner.set_out_flags(flags);
    }

    /// Timeout applied to waits for data.
    #[must_use]
    pub fn read_timeout(&self) -> Timeout {
        self.inner.read_timeout()
    }

    /// Timeout applied to waits for space and to flushes.
    #[must_use]
    pub fn write_timeout(&self) -> Timeout {
        self.inner.write_timeout()
    }

    /// Sets the timeout applied to waits for data.
    pub fn set_read_timeout(&self, timeout: Timeout) {
        self.inner.set_read_timeout(timeout);
    }

    /// Sets the timeout applied to waits for space and to flushes.
    pub fn set_write_timeout(&self, timeout: Timeout) {
        self.inner.set_write_timeout(timeout);
    }

    /// Returns `true` once the write end has closed.
    #[must_use]
    pub fn is_write_closed(&self) -> bool {
        self.inner.is_write_closed()
    }

    /// Returns `true` once the read end has closed.
    #[must_use]
    pub fn is_read_closed(&self) -> bool {
        self.inner.is_read_closed()
    }

    /// Returns `true` once the pipe has been disposed.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }

    /// Disposes the pipe: closes both ends, discards buffered bytes,
    /// and wakes every blocked operation with a disposal error.
    /// Idempotent.
    pub fn close(&self) {
        self.inner.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nz(value: usize) -> NonZeroUsize {
        NonZeroUsize::new(value).expect("non-zero value required")
    }

    #[test]
    fn options_default_to_spec_values() {
        let options = PipeOptions::default();
        assert_eq!(options.capacity.get(), DEFAULT_CAPACITY);
        assert!(options.in_flags.is_empty());
        assert!(options.out_flags.is_empty());
        assert!(options.read_timeout.is_infinite());
        assert!(options.write_timeout.is_infinite());
    }

    #[test]
    fn append_then_read_roundtrips() {
        let (writer, reader) = pipe(PipeOptions::new());
        writer.append(b"abc").expect("append succeeds");
        let mut out = [0u8; 3];
        assert_eq!(reader.read(&mut out).expect("read succeeds"), 3);
        assert_eq!(&out, b"abc");
    }

    #[test]
    fn empty_append_is_a_no_op() {
        let (writer, reader) = pipe(PipeOptions::new());
        writer.append(b"").expect("empty append succeeds");
        assert_eq!(reader.len(), 0);
    }

    #[test]
    fn oversized_append_is_rejected() {
        let (writer, _reader) = pipe(PipeOptions::new().capacity(nz(4)));
        assert!(matches!(
            writer.append(b"too large"),
            Err(PipeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn argument_errors_win_over_lifecycle_state() {
        let (writer, _reader) = pipe(PipeOptions::new().capacity(nz(4)));
        writer.pipe().expect("pipe is visible").close();
        assert!(matches!(
            writer.append(b"too large"),
            Err(PipeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn non_blocking_write_times_out_when_full() {
        let (writer, _reader) = pipe(
            PipeOptions::new()
                .capacity(nz(2))
                .write_timeout(Timeout::NonBlocking),
        );
        writer.append(b"ab").expect("fits exactly");
        assert_eq!(writer.append_byte(9), Err(PipeError::TimedOut));
    }

    #[test]
    fn non_blocking_read_times_out_when_empty() {
        let (_writer, reader) = pipe(PipeOptions::new().read_timeout(Timeout::NonBlocking));
        let mut out = [0u8; 1];
        assert_eq!(reader.read(&mut out), Err(PipeError::TimedOut));
    }

    #[test]
    fn capacity_change_is_visible_and_validated() {
        let (writer, _reader) = pipe(PipeOptions::new());
        let handle = writer.pipe().expect("pipe is visible by default");
        handle.set_capacity(16).expect("positive capacity accepted");
        assert_eq!(handle.capacity(), 16);
        assert!(matches!(
            handle.set_capacity(0),
            Err(PipeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn capacity_below_fill_level_keeps_bytes() {
        let (writer, reader) = pipe(PipeOptions::new());
        writer.append(b"hello").expect("append succeeds");
        let handle = reader.pipe().expect("visible");
        handle.set_capacity(2).expect("shrink accepted");
        assert_eq!(handle.len(), 5);
        let mut out = [0u8; 5];
        assert_eq!(reader.read(&mut out).expect("read succeeds"), 5);
    }

    #[test]
    fn invisible_bit_is_sticky_across_assignment() {
        let (writer, _reader) = pipe(PipeOptions::new());
        let handle = writer.pipe().expect("visible");
        handle.set_in_flags(PipeFlags::INVISIBLE);
        assert!(writer.pipe().is_none());
        handle.set_in_flags(PipeFlags::EMPTY);
        assert!(handle.in_flags().contains(PipeFlags::INVISIBLE));
        assert!(writer.pipe().is_none());
    }

    #[test]
    fn dispose_fails_later_operations() {
        let (writer, reader) = pipe(PipeOptions::new());
        let handle = writer.pipe().expect("visible");
        writer.append(b"data").expect("append succeeds");
        handle.close();
        assert!(handle.is_disposed());
        assert_eq!(handle.len(), 0);
        assert_eq!(writer.append(b"x"), Err(PipeError::Disposed));
        let mut out = [0u8; 1];
        assert_eq!(reader.read(&mut out), Err(PipeError::Disposed));
    }

    #[test]
    fn write_close_drains_remaining_then_eof() {
        let (writer, reader) = pipe(PipeOptions::new());
        writer.append(b"tail").expect("append succeeds");
        writer.close();
        let mut out = [0u8; 8];
        assert_eq!(reader.read(&mut out).expect("drains remaining"), 4);
        assert_eq!(reader.read(&mut out).expect("end of stream"), 0);
    }

    #[test]
    fn read_close_discards_and_fails_writers() {
        let (writer, reader) = pipe(PipeOptions::new());
        writer.append(b"pending").expect("append succeeds");
        reader.close();
        assert_eq!(writer.append(b"more"), Err(PipeError::ReadEndClosed));
        assert_eq!(writer.len(), 0);
    }

    #[test]
    fn flush_on_empty_buffer_returns_immediately() {
        let (writer, _reader) = pipe(PipeOptions::new());
        writer.flush().expect("nothing to flush");
    }

    #[test]
    fn poll_reports_buffered_data() {
        let (writer, reader) = pipe(PipeOptions::new());
        assert!(!reader
            .poll(0, crate::PollMode::Read)
            .expect("poll succeeds"));
        writer.append(b"x").expect("append succeeds");
        assert!(reader.poll(0, crate::PollMode::Read).expect("poll succeeds"));
    }
}
