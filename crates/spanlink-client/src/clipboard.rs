//! Per-slot clipboard coherence bookkeeping.
//!
//! For each clipboard slot the client tracks whether *this* endpoint owns the
//! contents, whether the current contents ever reached the server, the
//! timestamp of the last observed change, and the exact bytes last
//! transmitted.  The send path in the client uses these to transmit only
//! clipboards that actually changed, and only at the right moment.

use spanlink_core::clipboard::{ClipboardId, CLIPBOARD_COUNT};

/// Coherence state for one clipboard slot.
#[derive(Debug, Default, Clone)]
pub struct ClipboardSlot {
    /// This endpoint is the authoritative source of the slot's contents.
    pub own: bool,
    /// The current owned contents have reached the server at least once.
    pub sent: bool,
    /// Timestamp of the last contents observed; `0` means never observed
    /// and forces the next send attempt to look at the data.
    pub time: u64,
    /// Marshalled bytes of the last transmission, used to suppress resends
    /// of identical content.  `None` until something was marshalled.
    pub data: Option<Vec<u8>>,
}

/// All slots, indexed by [`ClipboardId`].
#[derive(Debug, Default)]
pub struct ClipboardTracker {
    slots: [ClipboardSlot; CLIPBOARD_COUNT],
}

impl ClipboardTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot(&self, id: ClipboardId) -> &ClipboardSlot {
        &self.slots[id.index()]
    }

    pub fn slot_mut(&mut self, id: ClipboardId) -> &mut ClipboardSlot {
        &mut self.slots[id.index()]
    }

    /// Forgets everything; run when a transport connects so a new session
    /// starts from a clean slate.
    pub fn reset_all(&mut self) {
        for slot in &mut self.slots {
            *slot = ClipboardSlot::default();
        }
    }

    /// The local screen grabbed the slot: we own contents the server has not
    /// seen, and the timestamp sentinel forces the next send to look.
    pub fn grab_local(&mut self, id: ClipboardId) {
        let slot = self.slot_mut(id);
        slot.own = true;
        slot.sent = false;
        slot.time = 0;
    }

    /// The server pushed contents (or announced a remote grab): any local
    /// ownership claim and transmission memory are void.
    pub fn surrender(&mut self, id: ClipboardId) {
        let slot = self.slot_mut(id);
        slot.own = false;
        slot.sent = false;
        slot.data = None;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
