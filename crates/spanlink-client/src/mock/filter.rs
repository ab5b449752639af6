//! Pass-through stream filter for exercising the optional filter layer.

use std::sync::{Arc, Mutex};

use spanlink_core::address::ServerAddress;
use spanlink_core::event::EventTarget;
use spanlink_core::stream::{DataStream, StreamError};

use crate::stack::StreamFilterFactory;

/// Builds filters that forward bytes unchanged while counting traffic.
#[derive(Default)]
pub struct PassthroughFilterFactory {
    created: Arc<Mutex<usize>>,
    bytes_written: Arc<Mutex<usize>>,
}

impl PassthroughFilterFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many filter layers this factory has built.
    pub fn layers_created(&self) -> usize {
        *self.created.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Total bytes that passed down through the filters.
    pub fn bytes_written(&self) -> usize {
        *self
            .bytes_written
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl StreamFilterFactory for PassthroughFilterFactory {
    fn create(&self, inner: Box<dyn DataStream>) -> Box<dyn DataStream> {
        *self.created.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) += 1;
        Box::new(PassthroughFilter {
            inner,
            bytes_written: Arc::clone(&self.bytes_written),
        })
    }
}

struct PassthroughFilter {
    inner: Box<dyn DataStream>,
    bytes_written: Arc<Mutex<usize>>,
}

impl DataStream for PassthroughFilter {
    fn connect(&mut self, address: &ServerAddress) -> Result<(), StreamError> {
        self.inner.connect(address)
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        self.inner.read(buf)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), StreamError> {
        *self
            .bytes_written
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) += data.len();
        self.inner.write(data)
    }

    fn is_ready(&mut self) -> bool {
        self.inner.is_ready()
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
