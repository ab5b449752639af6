//! Stream stack assembly.
//!
//! Each connection attempt builds the stack innermost-first:
//!
//! ```text
//! raw transport → [stream filter] → packetizer → [cipher]
//! ```
//!
//! The raw transport moves the bytes and posts the stack's events.  An
//! optional filter can transform the byte stream (compression, traffic
//! shaping).  The packetizer turns bytes into length-prefixed messages.
//! When crypto is enabled, a cipher layer encrypts everything the packetizer
//! emits and decrypts everything it is about to parse — so on the wire only
//! the frame lengths are visible.
//!
//! The cipher layer is owned by the stack like any other layer; the client
//! keeps only a [`Weak`] handle to its [`CipherControl`] so a decryption IV
//! can be installed later without a cyclic owning edge.

use std::sync::{Arc, Weak};

use serde::{Deserialize, Serialize};

use spanlink_core::stream::{DataStream, Packetizer, StreamError};

use crate::transport::TransportFactory;

// ── Crypto configuration ──────────────────────────────────────────────────────

/// Cipher operating mode for the session stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CryptoMode {
    /// No cipher layer is built.
    #[default]
    Disabled,
    Ofb,
    Cfb,
    Ctr,
    Gcm,
}

/// Crypto inputs handed to the cipher factory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CryptoOptions {
    pub mode: CryptoMode,
    /// Shared secret the cipher derives its keys from.
    pub pass: String,
}

impl CryptoOptions {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn enabled(&self) -> bool {
        self.mode != CryptoMode::Disabled
    }
}

// ── Factory seams ─────────────────────────────────────────────────────────────

/// Wraps a stream with a transforming filter layer, taking ownership of the
/// inner stream.
pub trait StreamFilterFactory: Send {
    fn create(&self, inner: Box<dyn DataStream>) -> Box<dyn DataStream>;
}

/// Control surface of a live cipher layer.
///
/// Kept alive by the cipher stream itself; the client reaches it through a
/// [`Weak`] and the handle dies with the stack.
pub trait CipherControl: Send + Sync {
    /// Installs the IV the peer chose for its encrypting direction.
    fn set_decrypt_iv(&self, iv: &[u8]);
}

/// Builds the cipher layer around the framed stream.
///
/// Implementations must keep a strong reference to the returned
/// [`CipherControl`] inside the stream they build — the client only retains
/// a [`Weak`] to it.
pub trait CipherStreamFactory: Send {
    /// Wraps `inner`, returning the encrypted stream and its control handle.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError`] when the options are unusable (bad mode for
    /// this cipher, key derivation failure).
    fn create(
        &self,
        inner: Box<dyn DataStream>,
        options: &CryptoOptions,
    ) -> Result<(Box<dyn DataStream>, Arc<dyn CipherControl>), StreamError>;
}

// ── Assembly ──────────────────────────────────────────────────────────────────

/// Builds the full stack for one connection attempt.
///
/// # Errors
///
/// Returns [`StreamError`] when any layer cannot be constructed; the caller
/// drops whatever was partially built and reports a connection failure.
pub(crate) fn build_stack(
    transport_factory: &dyn TransportFactory,
    filter_factory: Option<&dyn StreamFilterFactory>,
    cipher_factory: Option<&dyn CipherStreamFactory>,
    crypto: &CryptoOptions,
) -> Result<(Box<dyn DataStream>, Option<Weak<dyn CipherControl>>), StreamError> {
    let mut stream = transport_factory.create()?;

    if let Some(filter_factory) = filter_factory {
        stream = filter_factory.create(stream);
    }

    stream = Box::new(Packetizer::new(stream));

    let mut cipher = None;
    if crypto.enabled() {
        let cipher_factory = cipher_factory.ok_or_else(|| {
            StreamError::Construction(
                "crypto enabled but no cipher stream factory configured".to_string(),
            )
        })?;
        let (wrapped, control) = cipher_factory.create(stream, crypto)?;
        stream = wrapped;
        cipher = Some(Arc::downgrade(&control));
    }

    Ok((stream, cipher))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{
        MemoryTransportFactory, PassthroughFilterFactory, TransportHandle, XorCipherFactory,
    };
    use spanlink_core::event::EventQueue;

    #[test]
    fn test_stack_without_options_is_transport_plus_packetizer() {
        // Arrange
        let queue = EventQueue::new();
        let handle = TransportHandle::new(Arc::clone(&queue));
        let factory = MemoryTransportFactory::new(handle.clone());

        // Act
        let (mut stream, cipher) =
            build_stack(&factory, None, None, &CryptoOptions::disabled()).expect("build");

        // Assert — no cipher handle, and writes gain a length prefix
        assert!(cipher.is_none());
        stream.write(b"abc").expect("write");
        assert_eq!(handle.written_frames(), vec![b"abc".to_vec()]);
    }

    #[test]
    fn test_stack_threads_the_filter_between_transport_and_packetizer() {
        // Arrange
        let queue = EventQueue::new();
        let handle = TransportHandle::new(Arc::clone(&queue));
        let transport = MemoryTransportFactory::new(handle.clone());
        let filter = PassthroughFilterFactory::new();

        // Act
        let (mut stream, _) =
            build_stack(&transport, Some(&filter), None, &CryptoOptions::disabled())
                .expect("build");
        stream.write(b"xy").expect("write");

        // Assert — the filter saw the framed bytes on their way down
        assert_eq!(filter.layers_created(), 1);
        assert_eq!(filter.bytes_written(), 4 + 2);
    }

    #[test]
    fn test_stack_with_crypto_encrypts_frame_payloads_only() {
        // Arrange
        let queue = EventQueue::new();
        let handle = TransportHandle::new(Arc::clone(&queue));
        let transport = MemoryTransportFactory::new(handle.clone());
        let cipher_factory = XorCipherFactory::new(0x5A);
        let options = CryptoOptions {
            mode: CryptoMode::Ctr,
            pass: "secret".to_string(),
        };

        // Act
        let (mut stream, cipher) =
            build_stack(&transport, None, Some(&cipher_factory), &options).expect("build");
        stream.write(b"ab").expect("write");

        // Assert — length prefix is plaintext, payload is transformed
        let frames = handle.written_frames();
        assert_eq!(frames, vec![vec![b'a' ^ 0x5A, b'b' ^ 0x5A]]);
        let cipher = cipher.expect("cipher handle present");
        assert!(cipher.upgrade().is_some(), "stack keeps the control alive");

        // The handle dies with the stack.
        drop(stream);
        assert!(cipher.upgrade().is_none());
    }

    #[test]
    fn test_crypto_without_factory_is_a_construction_error() {
        let queue = EventQueue::new();
        let handle = TransportHandle::new(queue);
        let transport = MemoryTransportFactory::new(handle);
        let options = CryptoOptions {
            mode: CryptoMode::Gcm,
            pass: String::new(),
        };

        let result = build_stack(&transport, None, None, &options);
        assert!(matches!(result, Err(StreamError::Construction(_))));
    }

    #[test]
    fn test_transport_construction_failure_propagates() {
        let queue = EventQueue::new();
        let handle = TransportHandle::new(queue);
        let transport = MemoryTransportFactory::failing(handle, "no descriptors");

        let result = build_stack(&transport, None, None, &CryptoOptions::disabled());
        assert!(matches!(result, Err(StreamError::Construction(_))));
    }
}
