//! # spanlink-client
//!
//! The client side of the spanlink screen-sharing protocol: a long-lived
//! endpoint that dials the server, negotiates the `Hello`/`HelloBack`
//! handshake, and then relays keyboard, pointer, clipboard, and game-device
//! traffic between the server and the local screen.
//!
//! The crate is orchestration only.  The pieces that touch the outside world
//! — the platform screen, the transport, the cipher, and the session-protocol
//! proxy — are injected through traits, and in-memory doubles for all of them
//! ship in [`mock`] so the whole lifecycle can be driven in tests:
//!
//! - [`client`] — the [`Client`](client::Client) itself: connection state
//!   machine, clipboard coherence, screen adapter, lifecycle events.
//! - [`screen`] — the local screen contract.
//! - [`transport`] — the raw stream factory seam.
//! - [`stack`] — stream stack assembly (filter, packetizer, cipher).
//! - [`server_proxy`] — the session-protocol seam and the ops surface the
//!   proxy drives.
//! - [`clipboard`] — per-slot coherence bookkeeping.

pub mod client;
pub mod clipboard;
pub mod mock;
pub mod screen;
pub mod server_proxy;
pub mod stack;
pub mod transport;

pub use client::{Client, ClientConfig, ClientStatus, ClipboardSlotStatus};
pub use screen::{Screen, ScreenShape};
pub use server_proxy::{ClientOps, ServerProxy, ServerProxyFactory};
pub use stack::{
    CipherControl, CipherStreamFactory, CryptoMode, CryptoOptions, StreamFilterFactory,
};
pub use transport::TransportFactory;
