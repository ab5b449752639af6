//! Newtypes for the input values relayed between server and screen.
//!
//! The core never interprets these — they are produced by the server's
//! capture side and injected verbatim by the local screen driver — but giving
//! each one its own type keeps key ids, physical buttons, and mouse buttons
//! from being swapped at a call site.

use serde::{Deserialize, Serialize};

/// Layout-independent key symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyId(pub u32);

/// Physical key (scan) button code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyButton(pub u16);

/// Bitmask of held modifier keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KeyModifierMask(pub u16);

impl KeyModifierMask {
    pub const SHIFT: u16 = 1 << 0;
    pub const CONTROL: u16 = 1 << 1;
    pub const ALT: u16 = 1 << 2;
    pub const META: u16 = 1 << 3;
    pub const SUPER: u16 = 1 << 4;
}

/// Pointer button identifier (1 = left, 2 = middle, 3 = right, …).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ButtonId(pub u8);

/// Game controller identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameDeviceId(pub u8);

/// Bitmask of pressed game-device buttons.
pub type GameDeviceButtons = u16;

/// Screen option settings as `(option id, value)` pairs, applied in order.
pub type OptionsList = Vec<(u32, u32)>;
