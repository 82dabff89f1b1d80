//! Pipe wiring for a remote command's stdio streams.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use pipe::{pipe, PipeFlags, PipeOptions, PipeReader, PipeWriter};
use tracing::{debug, trace};

use crate::channel::Channel;

/// Largest chunk the stdin pump drains and forwards in one call.
pub const STDIN_PUMP_CHUNK_LIMIT: usize = 5_000_000;

/// The three stdio pipes backing one remote command.
///
/// The transport side pushes received payloads into stdout/stderr and
/// calls [`finish`](Self::finish) when the channel closes; the
/// application side takes the matching halves exactly once. The stdin
/// pipe runs in synchronous mode so application writes block until the
/// pump has handed the bytes to the channel, and all three pipes are
/// constructed opaque: their halves do not reveal the owning pipe.
#[derive(Debug)]
pub struct CommandStreams {
    stdout_writer: PipeWriter,
    stderr_writer: PipeWriter,
    stdout_reader: Option<PipeReader>,
    stderr_reader: Option<PipeReader>,
    stdin_writer: Option<PipeWriter>,
    stdin_reader: Option<PipeReader>,
}

impl CommandStreams {
    /// Builds the stdout, stderr, and stdin pipes with their stream
    /// roles baked into the flag sets.
    #[must_use]
    pub fn new() -> Self {
        let data_flags = PipeFlags::NO_COPY | PipeFlags::INVISIBLE;
        let (stdout_writer, stdout_reader) =
            pipe(PipeOptions::new().in_flags(data_flags).out_flags(data_flags));
        let (stderr_writer, stderr_reader) =
            pipe(PipeOptions::new().in_flags(data_flags).out_flags(data_flags));
        let (stdin_writer, stdin_reader) =
            pipe(PipeOptions::new().in_flags(PipeFlags::SYNC | PipeFlags::INVISIBLE));
        Self {
            stdout_writer,
            stderr_writer,
            stdout_reader: Some(stdout_reader),
            stderr_reader: Some(stderr_reader),
            stdin_writer: Some(stdin_writer),
            stdin_reader: Some(stdin_reader),
        }
    }

    /// Feeds a payload received on the channel's data stream into the
    /// stdout pipe. The buffer moves into the pipe without copying.
    pub fn push_stdout(&self, data: Vec<u8>) -> io::Result<()> {
        self.stdout_writer.append_owned(data)?;
        Ok(())
    }

    /// Feeds a payload received on the channel's extended-data stream
    /// into the stderr pipe.
    pub fn push_stderr(&self, data: Vec<u8>) -> io::Result<()> {
        self.stderr_writer.append_owned(data)?;
        Ok(())
    }

    /// Marks the remote output finished: closes the stdout and stderr
    /// write ends so application readers observe end of stream once
    /// they drain. Idempotent.
    pub fn finish(&self) {
        debug!("remote channel closed; finishing stdout and stderr");
        self.stdout_writer.close();
        self.stderr_writer.close();
    }

    /// Transfers the application-visible stdout reader to the caller.
    /// Subsequent calls return `None`.
    #[must_use]
    pub fn take_stdout(&mut self) -> Option<PipeReader> {
        self.stdout_reader.take()
    }

    /// Transfers the application-visible stderr reader to the caller.
    #[must_use]
    pub fn take_stderr(&mut self) -> Option<PipeReader> {
        self.stderr_reader.take()
    }

    /// Transfers the application-visible stdin writer to the caller.
    #[must_use]
    pub fn take_stdin(&mut self) -> Option<PipeWriter> {
        self.stdin_writer.take()
    }

    /// Transfers the channel-side stdin reader, normally straight into
    /// [`spawn_stdin_pump`].
    #[must_use]
    pub fn take_stdin_reader(&mut self) -> Option<PipeReader> {
        self.stdin_reader.take()
    }
}

impl Default for CommandStreams {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawns the worker that drains the stdin pipe and forwards each chunk
/// to the channel, ending with an EOF notification.
///
/// The handle resolves to the number of bytes forwarded. When the
/// channel rejects a chunk, the worker closes the stdin read end so any
/// blocked application writer wakes with an error, and the channel's
/// error surfaces from the handle.
pub fn spawn_stdin_pump<C: Channel + 'static>(
    reader: PipeReader,
    channel: Arc<C>,
) -> io::Result<JoinHandle<io::Result<u64>>> {
    thread::Builder::new()
        .name("stdin-pump".into())
        .spawn(move || run_stdin_pump(&reader, channel.as_ref()))
}

fn run_stdin_pump(reader: &PipeReader, channel: &dyn Channel) -> io::Result<u64> {
    let mut total = 0u64;
    loop {
        match reader.read_available(STDIN_PUMP_CHUNK_LIMIT) {
            Ok(Some(chunk)) => {
                trace!(len = chunk.len(), "forwarding stdin chunk");
                if let Err(err) = channel.send_data(&chunk) {
                    debug!(error = %err, "channel rejected stdin data; closing stdin pipe");
                    reader.close();
                    return Err(err);
                }
                total += chunk.len() as u64;
            }
            Ok(None) => {
                debug!(total, "stdin pipe reached end of stream");
                channel.send_eof()?;
                return Ok(total);
            }
            Err(err) => {
                debug!(error = %err, "stdin pipe failed");
                return Err(io::Error::from(err));
            }
        }
    }
}
