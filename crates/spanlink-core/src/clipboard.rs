//! Clipboard slots, formats, and the marshalled interchange form.
//!
//! The platform clipboard is modelled as a small fixed set of independent
//! *slots* (the common clipboard plus the primary-selection buffer found on
//! X11-style systems).  Each slot holds data in one or more *formats* and
//! carries the timestamp of its last change, which is what lets the owner
//! side skip reading an unchanged clipboard.
//!
//! [`ClipboardData::marshall`] flattens a snapshot into one byte string for
//! transmission; the byte string is also what the client compares to decide
//! whether the server already has the current contents.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ── Slots ─────────────────────────────────────────────────────────────────────

/// One of the fixed clipboard channels, each tracked independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ClipboardId {
    /// The ordinary copy/paste clipboard.
    Clipboard = 0,
    /// The middle-click primary selection.
    Selection = 1,
}

/// Number of clipboard slots; slot ids form the closed range `0..COUNT`.
pub const CLIPBOARD_COUNT: usize = 2;

impl ClipboardId {
    /// All slots, in id order.
    pub const ALL: [ClipboardId; CLIPBOARD_COUNT] = [ClipboardId::Clipboard, ClipboardId::Selection];

    /// Slot index for array-backed per-slot state.
    pub fn index(self) -> usize {
        self as usize
    }
}

// ── Formats ───────────────────────────────────────────────────────────────────

/// Data flavor stored in a clipboard slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ClipboardFormat {
    Text = 0,
    Html = 1,
    Bitmap = 2,
}

const FORMAT_COUNT: usize = 3;

impl ClipboardFormat {
    const ALL: [ClipboardFormat; FORMAT_COUNT] = [
        ClipboardFormat::Text,
        ClipboardFormat::Html,
        ClipboardFormat::Bitmap,
    ];

    fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }
}

// ── Snapshot ──────────────────────────────────────────────────────────────────

/// Errors from unmarshalling a clipboard byte string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClipboardError {
    #[error("clipboard data truncated: need {needed} bytes, got {available}")]
    Truncated { needed: usize, available: usize },

    #[error("unknown clipboard format id: {0}")]
    UnknownFormat(u8),
}

/// A snapshot of one clipboard slot: timestamp plus per-format payloads.
///
/// A timestamp of `0` means "never observed"; the owner-side send path uses
/// that as the always-send sentinel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClipboardData {
    time: u64,
    formats: [Option<Vec<u8>>; FORMAT_COUNT],
}

impl ClipboardData {
    /// An empty snapshot with timestamp `0`.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty snapshot pre-seeded with a timestamp.
    ///
    /// The send path seeds the last-seen time before asking the screen to
    /// fill the snapshot, so a screen that tracks change times can leave an
    /// unchanged clipboard untouched.
    pub fn with_time(time: u64) -> Self {
        Self {
            time,
            ..Self::default()
        }
    }

    pub fn time(&self) -> u64 {
        self.time
    }

    pub fn set_time(&mut self, time: u64) {
        self.time = time;
    }

    /// Stores `data` for `format`, replacing any previous payload.
    pub fn add(&mut self, format: ClipboardFormat, data: Vec<u8>) {
        self.formats[format as usize] = Some(data);
    }

    /// Payload for `format`, if present.
    pub fn get(&self, format: ClipboardFormat) -> Option<&[u8]> {
        self.formats[format as usize].as_deref()
    }

    /// True when no format holds data.
    pub fn is_empty(&self) -> bool {
        self.formats.iter().all(Option::is_none)
    }

    // ── Marshalling ──────────────────────────────────────────────────────────
    //
    // Layout, all integers big-endian:
    //
    //   [time:8][format_count:1] then per format [id:1][len:4][bytes:len]

    /// Flattens the snapshot into its interchange byte string.
    pub fn marshall(&self) -> Vec<u8> {
        let present: Vec<ClipboardFormat> = ClipboardFormat::ALL
            .into_iter()
            .filter(|format| self.formats[*format as usize].is_some())
            .collect();

        let mut buf = Vec::with_capacity(9 + present.len() * 5);
        buf.extend_from_slice(&self.time.to_be_bytes());
        buf.push(present.len() as u8);
        for format in present {
            let data = self.formats[format as usize]
                .as_deref()
                .unwrap_or_default();
            buf.push(format as u8);
            buf.extend_from_slice(&(data.len() as u32).to_be_bytes());
            buf.extend_from_slice(data);
        }
        buf
    }

    /// Rebuilds a snapshot from its interchange byte string.
    ///
    /// # Errors
    ///
    /// Returns [`ClipboardError`] when the bytes are truncated or name an
    /// unknown format.
    pub fn unmarshall(bytes: &[u8]) -> Result<Self, ClipboardError> {
        let mut snapshot = Self::new();
        require(bytes, 9)?;
        snapshot.time = u64::from_be_bytes(bytes[0..8].try_into().expect("checked length"));
        let count = bytes[8] as usize;

        let mut offset = 9;
        for _ in 0..count {
            require(bytes, offset + 5)?;
            let format = ClipboardFormat::from_u8(bytes[offset])
                .ok_or(ClipboardError::UnknownFormat(bytes[offset]))?;
            let len = u32::from_be_bytes(
                bytes[offset + 1..offset + 5]
                    .try_into()
                    .expect("checked length"),
            ) as usize;
            offset += 5;
            require(bytes, offset + len)?;
            snapshot.formats[format as usize] = Some(bytes[offset..offset + len].to_vec());
            offset += len;
        }
        Ok(snapshot)
    }
}

fn require(bytes: &[u8], needed: usize) -> Result<(), ClipboardError> {
    if bytes.len() < needed {
        Err(ClipboardError::Truncated {
            needed,
            available: bytes.len(),
        })
    } else {
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
