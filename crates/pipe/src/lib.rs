#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `pipe` implements the bounded, thread-safe byte pipe that carries a
//! remote command's streams between the transport thread and the
//! application: one end accepts writes, the other yields reads, and the
//! pipe enforces a maximum buffered size with back-pressure. The
//! transport thread copies channel payloads into the write end while an
//! application thread drains the read end; stdin uploads run the same
//! machinery in the opposite direction.
//!
//! # Design
//!
//! The crate is organised around one concurrency core and two facades:
//!
//! - [`pipe()`] builds the shared state (a segment queue under a single
//!   mutex, paired with a single condition variable) and returns the
//!   [`PipeWriter`] / [`PipeReader`] halves.
//! - The writer waits for buffer space, the reader waits for data, and
//!   a flush waits for the buffer to empty; every state transition
//!   broadcasts so each class of waiter re-evaluates its own
//!   precondition.
//! - [`Pipe`] is a cloneable control handle for capacity, flag, and
//!   timeout mutation; the halves expose it through their `pipe()`
//!   accessors unless [`PipeFlags::INVISIBLE`] hides it.
//!
//! Appends come in three ownership renditions: borrowed (copied),
//! owned (`Vec<u8>`, moved), and shared (`Arc<[u8]>`, aliased only
//! under [`PipeFlags::NO_COPY`]). [`PipeFlags::SYNC`] turns every
//! append into an append-then-flush, blocking the producer until the
//! consumer has drained everything.
//!
//! # Invariants
//!
//! - Bytes drain in append order; a completed append happens-before any
//!   drain that observes its bytes.
//! - The buffered total never exceeds the capacity immediately after an
//!   append returns. Reducing the capacity below the fill level never
//!   drops bytes; writers simply wait for drains to catch up.
//! - The buffered total is zero exactly when the segment queue is
//!   empty, at every point where the mutex is released.
//! - Closing either end wakes every waiter. Closing the read end
//!   discards buffered bytes; closing the write end leaves them
//!   readable and turns subsequent drains into end-of-stream.
//!
//! # Errors
//!
//! Fallible operations return [`PipeResult`]. Drains signal a closed
//! producer through their return values (`0`, `None`) rather than an
//! error; [`PipeError::ReadEndClosed`] and [`PipeError::Disposed`] are
//! reserved for operations that can never make progress. The halves'
//! [`std::io::Read`] / [`std::io::Write`] impls convert through
//! [`std::io::Error`] with faithful error kinds.
//!
//! # Examples
//!
//! ```
//! use pipe::{pipe, PipeOptions};
//! use std::io::Read;
//!
//! let (writer, mut reader) = pipe(PipeOptions::new());
//! writer.append(b"hello ").unwrap();
//! writer.append(b"world").unwrap();
//! writer.close();
//!
//! let mut out = String::new();
//! reader.read_to_string(&mut out).unwrap();
//! assert_eq!(out, "hello world");
//! ```
//!
//! Blocking hand-off between two threads:
//!
//! ```
//! use pipe::{pipe, PipeOptions};
//! use std::num::NonZeroUsize;
//! use std::thread;
//!
//! let options = PipeOptions::new().capacity(NonZeroUsize::new(8).unwrap());
//! let (writer, reader) = pipe(options);
//!
//! let producer = thread::spawn(move || {
//!     for chunk in [&b"0123"[..], &b"4567"[..], &b"89"[..]] {
//!         writer.append(chunk).unwrap();
//!     }
//!     // Dropping the writer closes the write end.
//! });
//!
//! let mut received = Vec::new();
//! while let Some(chunk) = reader.read_available(4).unwrap() {
//!     received.extend_from_slice(&chunk);
//! }
//! producer.join().unwrap();
//! assert_eq!(received, b"0123456789");
//! ```

mod error;
mod flags;
mod pipe;
mod read_half;
mod segment;
mod timeout;
mod write_half;

pub use crate::error::{PipeError, PipeResult};
pub use crate::flags::PipeFlags;
pub use crate::pipe::{pipe, Pipe, PipeOptions, DEFAULT_CAPACITY};
pub use crate::read_half::{PipeReader, PollMode, DEFAULT_READ_AVAILABLE_LIMIT};
pub use crate::timeout::Timeout;
pub use crate::write_half::PipeWriter;
