//! Recording screen double.
//!
//! Records every call the client makes in one ordered list, serves staged
//! clipboard contents, and gives tests helpers to post the screen-originated
//! events (suspend/resume, clipboard grabs, shape changes, game-device
//! traffic) the platform would normally emit.

use std::sync::{Arc, Mutex, MutexGuard};

use spanlink_core::clipboard::{ClipboardData, ClipboardId, CLIPBOARD_COUNT};
use spanlink_core::event::{Event, EventData, EventKind, EventQueue, EventTarget};
use spanlink_core::input::{
    ButtonId, GameDeviceButtons, GameDeviceId, KeyButton, KeyId, KeyModifierMask, OptionsList,
};

use crate::screen::{Screen, ScreenShape};

/// One recorded screen call, in the order the client made them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenCall {
    Enable,
    Disable,
    Enter(KeyModifierMask),
    Leave,
    GetClipboard(ClipboardId),
    SetClipboard(ClipboardId),
    GrabClipboard(ClipboardId),
    KeyDown(KeyId, KeyModifierMask, KeyButton),
    KeyRepeat(KeyId, KeyModifierMask, i32, KeyButton),
    KeyUp(KeyId, KeyModifierMask, KeyButton),
    MouseDown(ButtonId),
    MouseUp(ButtonId),
    MouseMove(i32, i32),
    MouseRelativeMove(i32, i32),
    MouseWheel(i32, i32),
    Screensaver(bool),
    ResetOptions,
    SetOptions(OptionsList),
    GameDeviceButtons(GameDeviceId, GameDeviceButtons),
    GameDeviceSticks(GameDeviceId, i16, i16, i16, i16),
    GameDeviceTriggers(GameDeviceId, u8, u8),
    GameDeviceTimingReq,
}

/// A screen that records instead of touching the OS.
pub struct MockScreen {
    queue: Arc<EventQueue>,
    target: EventTarget,
    calls: Mutex<Vec<ScreenCall>>,
    clipboards: Mutex<[ClipboardData; CLIPBOARD_COUNT]>,
    shape: Mutex<ScreenShape>,
    cursor: Mutex<(i32, i32)>,
    enabled: Mutex<bool>,
}

impl MockScreen {
    pub fn new(queue: Arc<EventQueue>) -> Self {
        let target = queue.next_target();
        Self {
            queue,
            target,
            calls: Mutex::new(Vec::new()),
            clipboards: Mutex::new(Default::default()),
            shape: Mutex::new(ScreenShape {
                x: 0,
                y: 0,
                width: 1920,
                height: 1080,
            }),
            cursor: Mutex::new((0, 0)),
            enabled: Mutex::new(false),
        }
    }

    fn record(&self, call: ScreenCall) {
        self.lock(&self.calls).push(call);
    }

    fn lock<'a, T>(&self, mutex: &'a Mutex<T>) -> MutexGuard<'a, T> {
        mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ── Test staging ─────────────────────────────────────────────────────────

    /// Stages what `get_clipboard` will return for `id`.
    pub fn set_local_clipboard(&self, id: ClipboardId, data: ClipboardData) {
        self.lock(&self.clipboards)[id.index()] = data;
    }

    pub fn set_shape(&self, shape: ScreenShape) {
        *self.lock(&self.shape) = shape;
    }

    // ── Inspection ───────────────────────────────────────────────────────────

    /// Every call made so far, oldest first.
    pub fn calls(&self) -> Vec<ScreenCall> {
        self.lock(&self.calls).clone()
    }

    pub fn clear_calls(&self) {
        self.lock(&self.calls).clear();
    }

    /// How many times the client read clipboard `id` from the screen.
    pub fn clipboard_reads(&self, id: ClipboardId) -> usize {
        self.lock(&self.calls)
            .iter()
            .filter(|call| **call == ScreenCall::GetClipboard(id))
            .count()
    }

    pub fn is_enabled(&self) -> bool {
        *self.lock(&self.enabled)
    }

    /// Subscribes to the client's three lifecycle events (published at this
    /// screen's target) and returns the shared log they are recorded into.
    #[allow(clippy::type_complexity)]
    pub fn subscribe_lifecycle(&self) -> Arc<Mutex<Vec<(EventKind, Option<String>)>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        for kind in [
            EventKind::Connected,
            EventKind::ConnectionFailed,
            EventKind::Disconnected,
        ] {
            let log = Arc::clone(&log);
            self.queue.add_handler(kind, self.target, move |event| {
                let message = event.failure().map(|info| info.message.clone());
                log.lock().unwrap().push((event.kind, message));
            });
        }
        log
    }

    // ── Event injection ──────────────────────────────────────────────────────

    pub fn post_suspend(&self) {
        self.queue.post(Event::new(EventKind::Suspend, self.target));
    }

    pub fn post_resume(&self) {
        self.queue.post(Event::new(EventKind::Resume, self.target));
    }

    pub fn post_shape_changed(&self) {
        self.queue
            .post(Event::new(EventKind::ShapeChanged, self.target));
    }

    /// The local application took ownership of clipboard `id`.
    pub fn post_clipboard_grabbed(&self, id: ClipboardId) {
        self.queue.post(Event::with_data(
            EventKind::ClipboardGrabbed,
            self.target,
            EventData::Clipboard(id),
        ));
    }

    pub fn post_game_device_timing(&self, freq: u32) {
        self.queue.post(Event::with_data(
            EventKind::GameDeviceTimingResp,
            self.target,
            EventData::GameDeviceTiming(freq),
        ));
    }

    pub fn post_game_device_feedback(&self, id: GameDeviceId, m1: u16, m2: u16) {
        self.queue.post(Event::with_data(
            EventKind::GameDeviceFeedback,
            self.target,
            EventData::GameDeviceFeedback { id, m1, m2 },
        ));
    }
}

impl Screen for MockScreen {
    fn event_target(&self) -> EventTarget {
        self.target
    }

    fn enable(&self) {
        *self.lock(&self.enabled) = true;
        self.record(ScreenCall::Enable);
    }

    fn disable(&self) {
        *self.lock(&self.enabled) = false;
        self.record(ScreenCall::Disable);
    }

    fn enter(&self, mask: KeyModifierMask) {
        self.record(ScreenCall::Enter(mask));
    }

    fn leave(&self) {
        self.record(ScreenCall::Leave);
    }

    fn shape(&self) -> ScreenShape {
        *self.lock(&self.shape)
    }

    fn cursor_pos(&self) -> (i32, i32) {
        *self.lock(&self.cursor)
    }

    fn get_clipboard(&self, id: ClipboardId, data: &mut ClipboardData) -> bool {
        self.record(ScreenCall::GetClipboard(id));
        *data = self.lock(&self.clipboards)[id.index()].clone();
        true
    }

    fn set_clipboard(&self, id: ClipboardId, data: &ClipboardData) {
        self.lock(&self.clipboards)[id.index()] = data.clone();
        self.record(ScreenCall::SetClipboard(id));
    }

    fn grab_clipboard(&self, id: ClipboardId) {
        self.record(ScreenCall::GrabClipboard(id));
    }

    fn key_down(&self, key: KeyId, mask: KeyModifierMask, button: KeyButton) {
        self.record(ScreenCall::KeyDown(key, mask, button));
    }

    fn key_repeat(&self, key: KeyId, mask: KeyModifierMask, count: i32, button: KeyButton) {
        self.record(ScreenCall::KeyRepeat(key, mask, count, button));
    }

    fn key_up(&self, key: KeyId, mask: KeyModifierMask, button: KeyButton) {
        self.record(ScreenCall::KeyUp(key, mask, button));
    }

    fn mouse_down(&self, button: ButtonId) {
        self.record(ScreenCall::MouseDown(button));
    }

    fn mouse_up(&self, button: ButtonId) {
        self.record(ScreenCall::MouseUp(button));
    }

    fn mouse_move(&self, x: i32, y: i32) {
        *self.lock(&self.cursor) = (x, y);
        self.record(ScreenCall::MouseMove(x, y));
    }

    fn mouse_relative_move(&self, dx: i32, dy: i32) {
        let mut cursor = self.lock(&self.cursor);
        cursor.0 += dx;
        cursor.1 += dy;
        drop(cursor);
        self.record(ScreenCall::MouseRelativeMove(dx, dy));
    }

    fn mouse_wheel(&self, dx: i32, dy: i32) {
        self.record(ScreenCall::MouseWheel(dx, dy));
    }

    fn screensaver(&self, activate: bool) {
        self.record(ScreenCall::Screensaver(activate));
    }

    fn reset_options(&self) {
        self.record(ScreenCall::ResetOptions);
    }

    fn set_options(&self, options: &OptionsList) {
        self.record(ScreenCall::SetOptions(options.clone()));
    }

    fn game_device_buttons(&self, id: GameDeviceId, buttons: GameDeviceButtons) {
        self.record(ScreenCall::GameDeviceButtons(id, buttons));
    }

    fn game_device_sticks(&self, id: GameDeviceId, x1: i16, y1: i16, x2: i16, y2: i16) {
        self.record(ScreenCall::GameDeviceSticks(id, x1, y1, x2, y2));
    }

    fn game_device_triggers(&self, id: GameDeviceId, t1: u8, t2: u8) {
        self.record(ScreenCall::GameDeviceTriggers(id, t1, t2));
    }

    fn game_device_timing_req(&self) {
        self.record(ScreenCall::GameDeviceTimingReq);
    }
}
