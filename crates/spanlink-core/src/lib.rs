//! # spanlink-core
//!
//! Shared foundation for spanlink, a software KVM / screen-sharing endpoint.
//! This crate holds everything the client orchestration and its collaborators
//! agree on, with no OS, UI, or socket dependencies:
//!
//! - **`event`** — the cooperative event queue: `(kind, target)`-keyed
//!   handlers, serial dispatch, one-shot timers.
//! - **`protocol`** — the `Hello`/`HelloBack` handshake frames and the
//!   version acceptance rule.
//! - **`stream`** — the non-blocking byte-stream trait every stack layer
//!   implements, plus the length-prefix packetizer.
//! - **`clipboard`** — clipboard slots, formats, and the marshalled
//!   interchange form.
//! - **`address`** — server address descriptors and name resolution.
//! - **`input`** — newtypes for relayed key, mouse, and game-device values.

pub mod address;
pub mod clipboard;
pub mod event;
pub mod input;
pub mod protocol;
pub mod stream;

pub use address::{NetworkAddress, ServerAddress};
pub use clipboard::{ClipboardData, ClipboardFormat, ClipboardId, CLIPBOARD_COUNT};
pub use event::{Event, EventData, EventKind, EventQueue, EventTarget, FailInfo};
pub use protocol::{Hello, HelloBack, WireError};
pub use stream::{DataStream, Packetizer, StreamError};
