#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `exec` wires a remote command's stdio to the transport channel using
//! the bounded pipes from the [`pipe`] crate. The channel layer pushes
//! received payloads into the stdout/stderr pipes, the application
//! reads them at its own pace behind back-pressure, and a pump worker
//! drains the stdin pipe and forwards each chunk back to the channel.
//!
//! # Design
//!
//! - [`CommandStreams`] owns the three pipes and separates the two
//!   sides: channel-facing push methods and `take_*` accessors that
//!   hand each application half out exactly once.
//! - [`Channel`] is the only thing the pump needs from the transport;
//!   [`spawn_stdin_pump`] runs the drain-and-forward loop on a named
//!   worker thread and resolves to the forwarded byte total.
//! - stdout and stderr run in zero-copy mode (channel payloads move
//!   into the pipe), stdin runs in synchronous mode (application
//!   writes block until the pump has taken the bytes), and every half
//!   is opaque: the owning pipe is not reachable through it.
//!
//! # Errors
//!
//! Everything channel-facing surfaces [`std::io::Error`]. A channel
//! failure inside the pump closes the stdin pipe so blocked writers
//! wake, and the failure is returned through the pump's join handle.

mod channel;
mod streams;

pub use crate::channel::Channel;
pub use crate::streams::{spawn_stdin_pump, CommandStreams, STDIN_PUMP_CHUNK_LIMIT};
