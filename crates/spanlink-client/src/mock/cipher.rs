//! Toy cipher layer for exercising the crypto path.
//!
//! XORs every payload byte with a fixed key — enough to prove the layer sits
//! in the right place, encrypts only frame payloads, and keeps its control
//! handle alive exactly as long as the stack.  Not cryptography.

use std::sync::{Arc, Mutex, Weak};

use spanlink_core::address::ServerAddress;
use spanlink_core::event::EventTarget;
use spanlink_core::stream::{DataStream, StreamError};

use crate::stack::{CipherControl, CipherStreamFactory, CryptoOptions};

/// Control surface of a built [`XorCipherFactory`] layer.
#[derive(Default)]
pub struct XorCipherControl {
    iv: Mutex<Option<Vec<u8>>>,
}

impl XorCipherControl {
    /// The last IV installed through [`CipherControl::set_decrypt_iv`].
    pub fn decrypt_iv(&self) -> Option<Vec<u8>> {
        self.iv
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl CipherControl for XorCipherControl {
    fn set_decrypt_iv(&self, iv: &[u8]) {
        *self
            .iv
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(iv.to_vec());
    }
}

/// Builds XOR "cipher" layers and remembers the latest control handle.
/// Clones share that memory, so tests can keep one while the client owns
/// the other.
///
/// Only a weak reference is kept: the layer's lifetime must stay governed
/// by the stack that owns it, exactly as for the client's own handle.
#[derive(Clone)]
pub struct XorCipherFactory {
    key: u8,
    latest: Arc<Mutex<Option<Weak<XorCipherControl>>>>,
}

impl XorCipherFactory {
    pub fn new(key: u8) -> Self {
        Self {
            key,
            latest: Arc::new(Mutex::new(None)),
        }
    }

    /// The control of the most recently built layer, while that layer's
    /// stack is still alive.
    pub fn last_control(&self) -> Option<Arc<XorCipherControl>> {
        self.latest
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .and_then(Weak::upgrade)
    }
}

impl CipherStreamFactory for XorCipherFactory {
    fn create(
        &self,
        inner: Box<dyn DataStream>,
        _options: &CryptoOptions,
    ) -> Result<(Box<dyn DataStream>, Arc<dyn CipherControl>), StreamError> {
        let control = Arc::new(XorCipherControl::default());
        *self
            .latest
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(Arc::downgrade(&control));
        let stream = Box::new(XorStream {
            inner,
            key: self.key,
            // The stream keeps the strong reference; the client only holds a
            // weak one.
            control: Arc::clone(&control),
        });
        Ok((stream, control))
    }
}

struct XorStream {
    inner: Box<dyn DataStream>,
    key: u8,
    #[allow(dead_code)]
    control: Arc<XorCipherControl>,
}

impl DataStream for XorStream {
    fn connect(&mut self, address: &ServerAddress) -> Result<(), StreamError> {
        self.inner.connect(address)
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        let got = self.inner.read(buf);
        for byte in &mut buf[..got] {
            *byte ^= self.key;
        }
        got
    }

    fn write(&mut self, data: &[u8]) -> Result<(), StreamError> {
        let transformed: Vec<u8> = data.iter().map(|byte| byte ^ self.key).collect();
        self.inner.write(&transformed)
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
