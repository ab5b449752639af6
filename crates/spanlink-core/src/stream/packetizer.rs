//! Length-prefix framing layer.
//!
//! The packetizer turns the raw byte pipe into a sequence of discrete
//! messages: every outbound write gains a 32-bit big-endian length prefix,
//! and inbound bytes are withheld until a whole frame has arrived.  Exactly
//! one inbound message is exposed at a time — readers consume the current
//! message to its end before the next frame's bytes become visible, so a
//! frame parser can never run past a message boundary.

use bytes::{Buf, BytesMut};
use tracing::warn;

use super::{DataStream, StreamError};
use crate::address::ServerAddress;
use crate::event::EventTarget;

/// Ceiling on a single frame, inbound or outbound.
///
/// A peer announcing more than this is treated as garbage on the wire, not as
/// a message worth buffering.
pub const MAX_MESSAGE_LEN: usize = 4 * 1024 * 1024;

const PREFIX_LEN: usize = 4;
const READ_CHUNK: usize = 4096;

/// Message-framing wrapper around an inner [`DataStream`].
pub struct Packetizer {
    inner: Box<dyn DataStream>,
    /// Wire bytes not yet assembled into a message.
    raw: BytesMut,
    /// Unread remainder of the message currently exposed to the reader.
    current: BytesMut,
    /// Set when the peer announced an impossible frame; the stream is dead.
    poisoned: bool,
}

impl Packetizer {
    /// Wraps `inner`, taking ownership of it.
    pub fn new(inner: Box<dyn DataStream>) -> Self {
        Self {
            inner,
            raw: BytesMut::new(),
            current: BytesMut::new(),
            poisoned: false,
        }
    }

    /// Pulls buffered bytes up from the inner stream and, if the reader has
    /// finished the previous message, assembles the next complete frame.
    fn poll(&mut self) {
        if self.poisoned {
            return;
        }

        let mut chunk = [0u8; READ_CHUNK];
        loop {
            let got = self.inner.read(&mut chunk);
            if got == 0 {
                break;
            }
            self.raw.extend_from_slice(&chunk[..got]);
        }

        // Only advance to a new frame once the current one is fully consumed;
        // this is what confines readers to one message at a time.
        while self.current.is_empty() && self.raw.len() >= PREFIX_LEN {
            let declared =
                u32::from_be_bytes(self.raw[..PREFIX_LEN].try_into().expect("checked length"))
                    as usize;
            if declared > MAX_MESSAGE_LEN {
                warn!(declared, limit = MAX_MESSAGE_LEN, "oversized frame from peer, shutting down input");
                self.poisoned = true;
                self.raw.clear();
                self.inner.shutdown_input();
                return;
            }
            if self.raw.len() < PREFIX_LEN + declared {
                break;
            }
            self.raw.advance(PREFIX_LEN);
            self.current = self.raw.split_to(declared);
            // Zero-length frames carry nothing; skip to the next prefix.
        }
    }
}

impl DataStream for Packetizer {
    fn connect(&mut self, address: &ServerAddress) -> Result<(), StreamError> {
        self.inner.connect(address)
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        self.poll();
        let take = buf.len().min(self.current.len());
        buf[..take].copy_from_slice(&self.current[..take]);
        self.current.advance(take);
        take
    }

    fn write(&mut self, data: &[u8]) -> Result<(), StreamError> {
        if data.len() > MAX_MESSAGE_LEN {
            return Err(StreamError::MessageTooLarge {
                size: data.len(),
                limit: MAX_MESSAGE_LEN,
            });
        }
        let mut framed = Vec::with_capacity(PREFIX_LEN + data.len());
        framed.extend_from_slice(&(data.len() as u32).to_be_bytes());
        framed.extend_from_slice(data);
        self.inner.write(&framed)
    }

    fn is_ready(&mut self) -> bool {
        self.poll();
        !self.current.is_empty()
    }

    fn event_target(&self) -> EventTarget {
        self.inner.event_target()
    }

    fn shutdown_input(&mut self) {
        self.inner.shutdown_input();
    }

    fn shutdown_output(&mut self) {
        self.inner.shutdown_output();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
