//! The local screen contract.
//!
//! The screen is the platform half of the client: it injects the input the
//! server relays, owns the real clipboard, and reports local happenings
//! (shape changes, clipboard grabs, power transitions, game-device traffic)
//! as events at its [`event_target`](Screen::event_target).  Platform
//! implementations live outside this crate; tests use
//! [`MockScreen`](crate::mock::MockScreen).
//!
//! Methods take `&self`: the screen is shared between the client and the
//! rest of the application, and implementations guard their own interior
//! state.  All calls arrive on the event dispatch thread.

use spanlink_core::clipboard::{ClipboardData, ClipboardId};
use spanlink_core::event::EventTarget;
use spanlink_core::input::{
    ButtonId, GameDeviceButtons, GameDeviceId, KeyButton, KeyId, KeyModifierMask, OptionsList,
};

/// Position and size of the screen in the server's coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScreenShape {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Platform screen driven by the client.
///
/// Event surface, posted at [`event_target`](Screen::event_target):
/// `ShapeChanged`, `ClipboardGrabbed`, `Suspend`, `Resume`,
/// `GameDeviceTimingResp`, `GameDeviceFeedback`.
pub trait Screen: Send + Sync {
    /// The routing target this screen posts its events at.  Also reused as
    /// the client's own event target, so one subscription point covers both.
    fn event_target(&self) -> EventTarget;

    /// Starts delivering input to the platform for this session.
    fn enable(&self);

    /// Stops delivering input; the inverse of [`enable`](Screen::enable).
    fn disable(&self);

    /// The cursor has arrived on this screen with the given modifiers held.
    fn enter(&self, mask: KeyModifierMask);

    /// The cursor is leaving this screen.
    fn leave(&self);

    fn shape(&self) -> ScreenShape;
    fn cursor_pos(&self) -> (i32, i32);

    /// Copies the current contents of clipboard `id` into `data`.
    ///
    /// Callers seed `data` with the timestamp of the last contents they saw;
    /// a screen that tracks change times may leave `data` untouched when the
    /// clipboard has not changed since.  Returns `false` when the clipboard
    /// could not be read at all.
    fn get_clipboard(&self, id: ClipboardId, data: &mut ClipboardData) -> bool;

    /// Replaces the contents of clipboard `id`.
    fn set_clipboard(&self, id: ClipboardId, data: &ClipboardData);

    /// Takes ownership of clipboard `id` without providing contents yet.
    fn grab_clipboard(&self, id: ClipboardId);

    fn key_down(&self, key: KeyId, mask: KeyModifierMask, button: KeyButton);
    fn key_repeat(&self, key: KeyId, mask: KeyModifierMask, count: i32, button: KeyButton);
    fn key_up(&self, key: KeyId, mask: KeyModifierMask, button: KeyButton);

    fn mouse_down(&self, button: ButtonId);
    fn mouse_up(&self, button: ButtonId);
    fn mouse_move(&self, x: i32, y: i32);
    fn mouse_relative_move(&self, dx: i32, dy: i32);
    fn mouse_wheel(&self, dx: i32, dy: i32);

    fn screensaver(&self, activate: bool);

    fn reset_options(&self);
    fn set_options(&self, options: &OptionsList);

    fn game_device_buttons(&self, id: GameDeviceId, buttons: GameDeviceButtons);
    fn game_device_sticks(&self, id: GameDeviceId, x1: i16, y1: i16, x2: i16, y2: i16);
    fn game_device_triggers(&self, id: GameDeviceId, t1: u8, t2: u8);
    fn game_device_timing_req(&self);
}
