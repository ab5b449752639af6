//! Byte-stream abstraction shared by every layer of the connection stack.
//!
//! A [`DataStream`] is a non-blocking, event-driven byte pipe.  Reads never
//! wait: they drain whatever the stream has buffered and return `0` when
//! nothing is available.  Availability is announced through the event queue
//! instead — the layer that owns the real socket posts `InputReady`,
//! `OutputError`, shutdown, and dial-outcome events at its
//! [`event_target`](DataStream::event_target), and wrapping layers share that
//! same target so a subscriber always watches the outermost layer.
//!
//! The connection stack composes streams innermost-first: raw transport,
//! optional filter, the [`Packetizer`], and an optional cipher layer.  Every
//! wrapper owns the layer beneath it and delegates
//! [`connect`](DataStream::connect) down to the raw transport.

mod packetizer;

pub use packetizer::{Packetizer, MAX_MESSAGE_LEN};

use thiserror::Error;

use crate::address::ServerAddress;
use crate::event::EventTarget;

/// Errors surfaced by streams and their factories.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Write or dial attempted on a stream with no live connection.
    #[error("stream is not connected")]
    NotConnected,

    /// An outbound message is larger than the framing layer allows.
    #[error("message of {size} bytes exceeds the {limit}-byte frame limit")]
    MessageTooLarge { size: usize, limit: usize },

    /// A collaborator factory could not build its layer.
    #[error("stream construction failed: {0}")]
    Construction(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A bidirectional, non-blocking byte stream with an event surface.
///
/// Implementations post their events at their
/// [`event_target`](DataStream::event_target):
///
/// | Event                  | Meaning                                        |
/// |------------------------|------------------------------------------------|
/// | `StreamConnected`      | the dial initiated by `connect` succeeded      |
/// | `StreamConnectFailed`  | the dial failed; payload carries the reason    |
/// | `StreamDisconnected`   | the remote end went away                       |
/// | `InputReady`           | buffered input is available to `read`          |
/// | `OutputError`          | a buffered write could not be delivered        |
/// | `InputShutdown`        | the read half closed (remote or local)         |
/// | `OutputShutdown`       | the write half closed                          |
pub trait DataStream: Send {
    /// Initiates an asynchronous dial toward `address`.
    ///
    /// Wrapping layers delegate to the raw transport.  The outcome arrives
    /// later as a `StreamConnected` or `StreamConnectFailed` event.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError`] only for immediate local failures (the dial
    /// could not even be started); asynchronous failures use the event.
    fn connect(&mut self, address: &ServerAddress) -> Result<(), StreamError>;

    /// Copies buffered input into `buf`, returning how many bytes were
    /// copied.  Returns `0` when nothing is buffered; never blocks.
    fn read(&mut self, buf: &mut [u8]) -> usize;

    /// Queues `data` for transmission.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError`] when the stream cannot accept the bytes.
    fn write(&mut self, data: &[u8]) -> Result<(), StreamError>;

    /// True when `read` would currently return bytes.
    fn is_ready(&mut self) -> bool;

    /// The routing target this stack posts its events at.
    fn event_target(&self) -> EventTarget;

    /// Closes the read half.  Implementations owning the real connection
    /// post `InputShutdown` so the session machinery observes the closure.
    fn shutdown_input(&mut self);

    /// Closes the write half, flushing queued output where possible.
    fn shutdown_output(&mut self);
}
