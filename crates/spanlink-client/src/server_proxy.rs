//! The server-proxy seam.
//!
//! After the handshake every inbound frame belongs to the server proxy: it
//! parses the session protocol and drives the client through [`ClientOps`].
//! In the other direction the client notifies the proxy of local happenings
//! (`on_info_changed`, `on_grab_clipboard`, …) and the proxy turns them into
//! outbound frames.
//!
//! Proxy methods receive the session stream explicitly rather than storing a
//! reference: the client owns the stream exclusively, so each call borrows it
//! for just that exchange.  During frame dispatch the proxy reborrows itself
//! and the stream into [`ClientOps::leave`], which must emit pending
//! clipboard frames before the leave completes.

use std::sync::Arc;

use spanlink_core::clipboard::{ClipboardData, ClipboardId};
use spanlink_core::event::EventQueue;
use spanlink_core::input::{
    ButtonId, GameDeviceButtons, GameDeviceId, KeyButton, KeyId, KeyModifierMask, OptionsList,
};
use spanlink_core::stream::DataStream;

use crate::screen::ScreenShape;

/// What the server (through its proxy) may do to the client.
///
/// Input, clipboard, and option calls map one-to-one onto the local screen;
/// `enter`/`leave` additionally maintain the active flag and the clipboard
/// coherence protocol.
pub trait ClientOps {
    /// The cursor jumped onto this screen at the given absolute position
    /// with the given modifiers held.
    fn enter(&mut self, x_abs: i32, y_abs: i32, mask: KeyModifierMask);

    /// The cursor is leaving this screen.  Emits every owned-and-changed
    /// clipboard through `server` before returning.
    fn leave(&mut self, server: &mut dyn ServerProxy, stream: &mut dyn DataStream) -> bool;

    /// The server pushed clipboard contents down to this screen.
    fn set_clipboard(&mut self, id: ClipboardId, data: &ClipboardData);

    /// Another screen took ownership of clipboard `id`.
    fn grab_clipboard(&mut self, id: ClipboardId);

    /// Not part of the client's role; calling it is a programming error in
    /// the proxy and panics.
    fn set_clipboard_dirty(&mut self, id: ClipboardId, dirty: bool);

    fn key_down(&mut self, key: KeyId, mask: KeyModifierMask, button: KeyButton);
    fn key_repeat(&mut self, key: KeyId, mask: KeyModifierMask, count: i32, button: KeyButton);
    fn key_up(&mut self, key: KeyId, mask: KeyModifierMask, button: KeyButton);

    fn mouse_down(&mut self, button: ButtonId);
    fn mouse_up(&mut self, button: ButtonId);
    fn mouse_move(&mut self, x: i32, y: i32);
    fn mouse_relative_move(&mut self, dx: i32, dy: i32);
    fn mouse_wheel(&mut self, dx: i32, dy: i32);

    fn screensaver(&mut self, activate: bool);

    fn reset_options(&mut self);
    fn set_options(&mut self, options: &OptionsList);

    fn game_device_buttons(&mut self, id: GameDeviceId, buttons: GameDeviceButtons);
    fn game_device_sticks(&mut self, id: GameDeviceId, x1: i16, y1: i16, x2: i16, y2: i16);
    fn game_device_triggers(&mut self, id: GameDeviceId, t1: u8, t2: u8);
    fn game_device_timing_req(&mut self);

    // Queries the proxy needs when reporting client state to the server.

    /// The name this client introduced itself with.
    fn name(&self) -> &str;
    fn shape(&self) -> ScreenShape;
    fn cursor_pos(&self) -> (i32, i32);
    /// Reads clipboard `id` from the local screen; see
    /// [`Screen::get_clipboard`](crate::screen::Screen::get_clipboard).
    fn clipboard(&self, id: ClipboardId, data: &mut ClipboardData) -> bool;
}

/// Session-protocol handler for one connection.
///
/// Created once the handshake succeeds and dropped on teardown.  Frame
/// schemas past the handshake belong entirely to implementations of this
/// trait.
pub trait ServerProxy: Send {
    /// Input is ready on the session stream: parse buffered frames and apply
    /// them through `ops`.
    fn handle_input(&mut self, stream: &mut dyn DataStream, ops: &mut dyn ClientOps);

    /// The local screen's geometry changed; report it to the server.
    fn on_info_changed(&mut self, stream: &mut dyn DataStream);

    /// The local screen took ownership of clipboard `id`; announce the grab.
    fn on_grab_clipboard(&mut self, stream: &mut dyn DataStream, id: ClipboardId);

    /// Owned clipboard contents changed; transmit them.
    fn on_clipboard_changed(
        &mut self,
        stream: &mut dyn DataStream,
        id: ClipboardId,
        data: &ClipboardData,
    );

    /// Forward a game-device timing response from the local screen.
    fn on_game_device_timing_resp(&mut self, stream: &mut dyn DataStream, freq: u32);

    /// Forward game-device force-feedback state from the local screen.
    fn on_game_device_feedback(
        &mut self,
        stream: &mut dyn DataStream,
        id: GameDeviceId,
        m1: u16,
        m2: u16,
    );
}

/// Builds one [`ServerProxy`] per successful handshake.
pub trait ServerProxyFactory: Send {
    fn create(&self, queue: &Arc<EventQueue>) -> Box<dyn ServerProxy>;
}
