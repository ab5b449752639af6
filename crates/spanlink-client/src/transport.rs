//! Transport seam.
//!
//! The client never opens sockets itself; it asks an injected factory for a
//! fresh raw stream on every connection attempt.  Real factories (TCP, TLS)
//! live with the application that embeds the client; tests use
//! [`MemoryTransportFactory`](crate::mock::MemoryTransportFactory).

use spanlink_core::stream::{DataStream, StreamError};

/// Creates one raw [`DataStream`] per connection attempt.
///
/// The returned stream is unconnected; the client wraps it into the full
/// stack and then calls [`DataStream::connect`] on the outermost layer,
/// which delegates back down to the raw transport.
pub trait TransportFactory: Send {
    /// Builds a fresh, unconnected stream.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError`] when the transport cannot even be
    /// constructed (no network stack, exhausted descriptors); the client
    /// converts this into a `ConnectionFailed` lifecycle event.
    fn create(&self) -> Result<Box<dyn DataStream>, StreamError>;
}
