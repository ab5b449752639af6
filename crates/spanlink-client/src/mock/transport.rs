//! In-memory transport double.
//!
//! A [`MemoryTransport`] is the raw stream the client builds its stack on; a
//! cloneable [`TransportHandle`] is the test's side of the wire.  The handle
//! stages inbound bytes (posting `InputReady` like a socket reader would),
//! decides how a dial turns out, injects faults, and exposes everything the
//! client wrote, already split back into frames.

use std::sync::{Arc, Mutex, MutexGuard};

use bytes::{Buf, BytesMut};

use spanlink_core::address::ServerAddress;
use spanlink_core::event::{Event, EventData, EventKind, EventQueue, EventTarget, FailInfo};
use spanlink_core::stream::{DataStream, StreamError};

use crate::transport::TransportFactory;

#[derive(Default)]
struct TransportState {
    inbound: BytesMut,
    written: Vec<u8>,
    dialed: Option<ServerAddress>,
    connected: bool,
    input_open: bool,
    output_open: bool,
    fail_writes: bool,
    create_count: usize,
}

struct TransportInner {
    queue: Arc<EventQueue>,
    target: EventTarget,
    state: Mutex<TransportState>,
}

/// The test's end of a [`MemoryTransport`].  Clones share one wire.
#[derive(Clone)]
pub struct TransportHandle {
    inner: Arc<TransportInner>,
}

impl TransportHandle {
    pub fn new(queue: Arc<EventQueue>) -> Self {
        let target = queue.next_target();
        Self {
            inner: Arc::new(TransportInner {
                queue,
                target,
                state: Mutex::new(TransportState::default()),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, TransportState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn post(&self, kind: EventKind) {
        self.inner
            .queue
            .post(Event::new(kind, self.inner.target));
    }

    /// The target the transport posts its events at.
    pub fn target(&self) -> EventTarget {
        self.inner.target
    }

    // ── Dial outcomes ────────────────────────────────────────────────────────

    /// The server accepted the dial.
    pub fn accept(&self) {
        self.state().connected = true;
        self.post(EventKind::StreamConnected);
    }

    /// The dial failed with the given reason.
    pub fn refuse(&self, reason: &str) {
        self.inner.queue.post(Event::with_data(
            EventKind::StreamConnectFailed,
            self.inner.target,
            EventData::Failure(FailInfo::retryable(reason)),
        ));
    }

    // ── Server-side traffic ──────────────────────────────────────────────────

    /// Stages raw inbound bytes and announces them, as a socket reader would.
    pub fn push_bytes(&self, bytes: &[u8]) {
        self.state().inbound.extend_from_slice(bytes);
        self.post(EventKind::InputReady);
    }

    /// Stages one length-prefixed frame carrying `payload`.
    pub fn push_frame(&self, payload: &[u8]) {
        let mut framed = (payload.len() as u32).to_be_bytes().to_vec();
        framed.extend_from_slice(payload);
        self.push_bytes(&framed);
    }

    /// The remote end closed the connection.
    pub fn close(&self) {
        self.state().connected = false;
        self.post(EventKind::StreamDisconnected);
    }

    /// A buffered write failed to flush.
    pub fn fail_output(&self) {
        self.post(EventKind::OutputError);
    }

    /// The read half closed.
    pub fn close_input(&self) {
        self.state().input_open = false;
        self.post(EventKind::InputShutdown);
    }

    /// Makes every subsequent `write` on the transport fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.state().fail_writes = fail;
    }

    // ── Inspection ───────────────────────────────────────────────────────────

    /// Everything the client wrote, as raw wire bytes.
    pub fn written(&self) -> Vec<u8> {
        self.state().written.clone()
    }

    /// Everything the client wrote, split back into frame payloads.
    pub fn written_frames(&self) -> Vec<Vec<u8>> {
        let written = self.written();
        let mut frames = Vec::new();
        let mut rest = written.as_slice();
        while rest.len() >= 4 {
            let len = u32::from_be_bytes(rest[..4].try_into().expect("checked length")) as usize;
            if rest.len() < 4 + len {
                break;
            }
            frames.push(rest[4..4 + len].to_vec());
            rest = &rest[4 + len..];
        }
        frames
    }

    pub fn clear_written(&self) {
        self.state().written.clear();
    }

    /// The address the client dialed, if it dialed at all.
    pub fn dialed(&self) -> Option<ServerAddress> {
        self.state().dialed.clone()
    }

    /// How many raw streams the factory has built.
    pub fn create_count(&self) -> usize {
        self.state().create_count
    }
}

/// The client's end of the wire.
pub struct MemoryTransport {
    handle: TransportHandle,
}

impl DataStream for MemoryTransport {
    fn connect(&mut self, address: &ServerAddress) -> Result<(), StreamError> {
        self.handle.state().dialed = Some(address.clone());
        // The outcome arrives when the test calls accept() or refuse().
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        let mut state = self.handle.state();
        let take = buf.len().min(state.inbound.len());
        buf[..take].copy_from_slice(&state.inbound[..take]);
        state.inbound.advance(take);
        take
    }

    fn write(&mut self, data: &[u8]) -> Result<(), StreamError> {
        let mut state = self.handle.state();
        if state.fail_writes {
            return Err(StreamError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "write failure injected by test",
            )));
        }
        state.written.extend_from_slice(data);
        Ok(())
    }

    fn is_ready(&mut self) -> bool {
        !self.handle.state().inbound.is_empty()
    }

    fn event_target(&self) -> EventTarget {
        self.handle.inner.target
    }

    fn shutdown_input(&mut self) {
        let was_open = {
            let mut state = self.handle.state();
            std::mem::replace(&mut state.input_open, false)
        };
        if was_open {
            self.handle.post(EventKind::InputShutdown);
        }
    }

    fn shutdown_output(&mut self) {
        let was_open = {
            let mut state = self.handle.state();
            std::mem::replace(&mut state.output_open, false)
        };
        if was_open {
            self.handle.post(EventKind::OutputShutdown);
        }
    }
}

/// Builds [`MemoryTransport`]s bound to one shared [`TransportHandle`].
pub struct MemoryTransportFactory {
    handle: TransportHandle,
    fail_with: Option<String>,
}

impl MemoryTransportFactory {
    pub fn new(handle: TransportHandle) -> Self {
        Self {
            handle,
            fail_with: None,
        }
    }

    /// A factory whose `create` always fails, for construction-error paths.
    pub fn failing(handle: TransportHandle, reason: &str) -> Self {
        Self {
            handle,
            fail_with: Some(reason.to_string()),
        }
    }
}

impl TransportFactory for MemoryTransportFactory {
    fn create(&self) -> Result<Box<dyn DataStream>, StreamError> {
        let mut state = self.handle.state();
        state.create_count += 1;
        if let Some(reason) = &self.fail_with {
            return Err(StreamError::Construction(reason.clone()));
        }
        // Fresh socket, same wire: reset per-session state but keep the
        // written log and counters for the test to inspect.
        state.inbound.clear();
        state.dialed = None;
        state.connected = false;
        state.input_open = true;
        state.output_open = true;
        state.fail_writes = false;
        drop(state);
        Ok(Box::new(MemoryTransport {
            handle: self.handle.clone(),
        }))
    }
}
