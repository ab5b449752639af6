//! Test doubles for every collaborator seam.
//!
//! The real screen, transport, cipher, and server proxy all need either an OS
//! desktop or a live peer; none of that is observable from test code.  These
//! doubles replace them with in-memory recording so tests can drive the whole
//! client through its public API and assert exactly what it did:
//!
//! - [`MockScreen`] records every screen call and lets tests stage clipboard
//!   contents and post screen events (suspend, grabs, shape changes).
//! - [`MemoryTransport`] is a loopback stream; its shared
//!   [`TransportHandle`] stages inbound bytes, decides dial outcomes, and
//!   captures everything the client wrote.
//! - [`MockServerProxy`] records upstream notifications and applies scripted
//!   [`ProxyCommand`]s when frames arrive, standing in for the session
//!   protocol.
//! - [`PassthroughFilterFactory`] and [`XorCipherFactory`] exercise the
//!   optional stack layers without real compression or cryptography.
//!
//! They ship in the crate (not behind `cfg(test)`) so integration tests and
//! downstream embedders can reuse them.

mod cipher;
mod filter;
mod proxy;
mod screen;
mod transport;

pub use cipher::{XorCipherControl, XorCipherFactory};
pub use filter::PassthroughFilterFactory;
pub use proxy::{MockServerProxyFactory, ProxyCommand, ProxyLog};
pub use screen::{MockScreen, ScreenCall};
pub use transport::{MemoryTransport, MemoryTransportFactory, TransportHandle};
