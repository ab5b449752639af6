//! Binary codec for the `Hello` / `HelloBack` handshake frames.
//!
//! Wire format, all integers big-endian:
//!
//! ```text
//! Hello     (server→client): [tag:8 = "SpanLink"][major:2][minor:2]
//! HelloBack (client→server): [tag:8 = "SpanLink"][major:2][minor:2][name_len:4][name:N]
//! ```
//!
//! The client always answers with its *own* protocol version, not the
//! server's: the server learns what the client speaks and downgrades itself
//! when it is newer.  The client only refuses when the server is older than
//! the client, because an older server cannot be expected to understand the
//! client's frames.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::stream::DataStream;

// ── Protocol constants ────────────────────────────────────────────────────────

/// Identifying tag opening every handshake frame.
pub const HANDSHAKE_TAG: &[u8; 8] = b"SpanLink";

/// Protocol version spoken by this build, sent in `HelloBack`.
pub const PROTOCOL_MAJOR_VERSION: u16 = 1;
/// Minor protocol version spoken by this build.
pub const PROTOCOL_MINOR_VERSION: u16 = 6;

const HELLO_LEN: usize = 8 + 2 + 2;

// ── Errors ────────────────────────────────────────────────────────────────────

/// Errors from encoding or decoding handshake frames.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    /// The frame is shorter than the fields it must contain.
    #[error("truncated frame: need {needed} bytes, got {available}")]
    Truncated { needed: usize, available: usize },

    /// The frame does not open with the handshake tag.
    #[error("bad handshake tag")]
    BadTag,

    /// A length-prefixed string is not valid UTF-8.
    #[error("invalid UTF-8 in frame: {0}")]
    InvalidUtf8(String),

    /// The server speaks an older protocol than this client.
    #[error("incompatible server version {major}.{minor}")]
    IncompatibleVersion { major: u16, minor: u16 },
}

// ── Messages ──────────────────────────────────────────────────────────────────

/// `Hello`: the server's opening frame announcing its protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hello {
    pub major: u16,
    pub minor: u16,
}

impl Hello {
    /// Applies the version acceptance rule.
    ///
    /// The server is rejected when its major version is older than ours, or
    /// the majors match and its minor version is older.  A newer server is
    /// accepted; it downgrades to our version on seeing the `HelloBack`.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::IncompatibleVersion`] carrying the server's
    /// version on rejection.
    pub fn check_compatibility(&self) -> Result<(), WireError> {
        let too_old = self.major < PROTOCOL_MAJOR_VERSION
            || (self.major == PROTOCOL_MAJOR_VERSION && self.minor < PROTOCOL_MINOR_VERSION);
        if too_old {
            Err(WireError::IncompatibleVersion {
                major: self.major,
                minor: self.minor,
            })
        } else {
            Ok(())
        }
    }

    /// Encodes the frame payload.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HELLO_LEN);
        buf.extend_from_slice(HANDSHAKE_TAG);
        buf.extend_from_slice(&self.major.to_be_bytes());
        buf.extend_from_slice(&self.minor.to_be_bytes());
        buf
    }

    /// Decodes a frame payload.
    ///
    /// # Errors
    ///
    /// Returns [`WireError`] when the payload is truncated or mis-tagged.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use spanlink_core::protocol::Hello;
    ///
    /// let hello = Hello { major: 1, minor: 6 };
    /// assert_eq!(Hello::decode(&hello.encode()).unwrap(), hello);
    /// ```
    pub fn decode(payload: &[u8]) -> Result<Self, WireError> {
        require(payload, HELLO_LEN)?;
        check_tag(payload)?;
        Ok(Self {
            major: read_u16(payload, 8),
            minor: read_u16(payload, 10),
        })
    }
}

/// `HelloBack`: the client's reply carrying its version and name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloBack {
    pub major: u16,
    pub minor: u16,
    pub name: String,
}

impl HelloBack {
    /// The reply this build sends: local version plus the configured name.
    pub fn local(name: impl Into<String>) -> Self {
        Self {
            major: PROTOCOL_MAJOR_VERSION,
            minor: PROTOCOL_MINOR_VERSION,
            name: name.into(),
        }
    }

    /// Encodes the frame payload.
    pub fn encode(&self) -> Vec<u8> {
        let name = self.name.as_bytes();
        let mut buf = Vec::with_capacity(HELLO_LEN + 4 + name.len());
        buf.extend_from_slice(HANDSHAKE_TAG);
        buf.extend_from_slice(&self.major.to_be_bytes());
        buf.extend_from_slice(&self.minor.to_be_bytes());
        buf.extend_from_slice(&(name.len() as u32).to_be_bytes());
        buf.extend_from_slice(name);
        buf
    }

    /// Decodes a frame payload.
    ///
    /// # Errors
    ///
    /// Returns [`WireError`] when the payload is truncated, mis-tagged, or
    /// the name is not UTF-8.
    pub fn decode(payload: &[u8]) -> Result<Self, WireError> {
        require(payload, HELLO_LEN + 4)?;
        check_tag(payload)?;
        let major = read_u16(payload, 8);
        let minor = read_u16(payload, 10);
        let name_len =
            u32::from_be_bytes(payload[12..16].try_into().expect("checked length")) as usize;
        require(payload, HELLO_LEN + 4 + name_len)?;
        let name = std::str::from_utf8(&payload[16..16 + name_len])
            .map_err(|e| WireError::InvalidUtf8(e.to_string()))?
            .to_string();
        Ok(Self { major, minor, name })
    }
}

// ── Stream-level read ─────────────────────────────────────────────────────────

/// Reads the server's `Hello` from the front of the stream's buffered input.
///
/// The packetizer only signals readiness once a whole frame is buffered, so a
/// short read here means the frame is malformed, not that more bytes are in
/// flight.
///
/// # Errors
///
/// Returns [`WireError`] when the buffered bytes do not form a `Hello`.
pub fn read_hello(stream: &mut dyn DataStream) -> Result<Hello, WireError> {
    let mut payload = [0u8; HELLO_LEN];
    let got = stream.read(&mut payload);
    Hello::decode(&payload[..got])
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn require(payload: &[u8], needed: usize) -> Result<(), WireError> {
    if payload.len() < needed {
        Err(WireError::Truncated {
            needed,
            available: payload.len(),
        })
    } else {
        Ok(())
    }
}

fn check_tag(payload: &[u8]) -> Result<(), WireError> {
    if &payload[..8] == HANDSHAKE_TAG {
        Ok(())
    } else {
        Err(WireError::BadTag)
    }
}

fn read_u16(payload: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes(
        payload[offset..offset + 2]
            .try_into()
            .expect("checked length"),
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────
