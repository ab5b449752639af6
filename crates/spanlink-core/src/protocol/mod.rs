//! The handshake protocol owned by the client core.
//!
//! Only two frames are encoded and decoded here: the server's `Hello` and the
//! client's `HelloBack` reply.  Everything after the handshake is opaque to
//! the core and is handed, frame by frame, to the server-proxy collaborator.
//!
//! Frames travel inside the packetizer's length prefix (see
//! [`crate::stream::Packetizer`]), so the codec below deals only with frame
//! *payloads*.

pub mod wire;

pub use wire::{
    read_hello, Hello, HelloBack, WireError, PROTOCOL_MAJOR_VERSION, PROTOCOL_MINOR_VERSION,
};
