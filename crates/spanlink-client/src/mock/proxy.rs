//! Scripted server-proxy double.
//!
//! Stands in for the session-protocol handler: upstream notifications are
//! recorded into a shared [`ProxyLog`], and inbound frames trigger whatever
//! [`ProxyCommand`]s the test scripted — which is how tests make "the server"
//! move the cursor onto the screen, push a clipboard, or ask it to leave.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use spanlink_core::clipboard::{ClipboardData, ClipboardId};
use spanlink_core::event::EventQueue;
use spanlink_core::input::{
    ButtonId, GameDeviceButtons, GameDeviceId, KeyButton, KeyId, KeyModifierMask,
};
use spanlink_core::stream::DataStream;

use crate::server_proxy::{ClientOps, ServerProxy, ServerProxyFactory};

/// A server action replayed against the client when input arrives.
#[derive(Debug, Clone)]
pub enum ProxyCommand {
    Enter {
        x: i32,
        y: i32,
        mask: KeyModifierMask,
    },
    Leave,
    SetClipboard(ClipboardId, ClipboardData),
    GrabClipboard(ClipboardId),
    KeyDown(KeyId, KeyModifierMask, KeyButton),
    KeyUp(KeyId, KeyModifierMask, KeyButton),
    MouseMove(i32, i32),
    MouseDown(ButtonId),
    MouseUp(ButtonId),
    MouseWheel(i32, i32),
    Screensaver(bool),
    ResetOptions,
    GameDeviceButtons(GameDeviceId, GameDeviceButtons),
}

/// Everything the proxy observed, shared between test and proxy instances.
#[derive(Debug, Default)]
pub struct ProxyLog {
    /// How many proxies the factory built (one per completed handshake).
    pub created: usize,
    /// Raw payload of every inbound frame the proxy consumed.
    pub frames: Vec<Vec<u8>>,
    pub info_changed: usize,
    pub grabs: Vec<ClipboardId>,
    pub clipboard_changes: Vec<(ClipboardId, ClipboardData)>,
    pub timing_resps: Vec<u32>,
    pub feedback: Vec<(GameDeviceId, u16, u16)>,
}

/// Builds [`MockServerProxy`]s sharing one log and one command script.
/// Clones share both, so tests keep one clone while the client owns the
/// other.
#[derive(Default, Clone)]
pub struct MockServerProxyFactory {
    log: Arc<Mutex<ProxyLog>>,
    script: Arc<Mutex<VecDeque<ProxyCommand>>>,
}

impl MockServerProxyFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared observation log.
    pub fn log(&self) -> Arc<Mutex<ProxyLog>> {
        Arc::clone(&self.log)
    }

    /// Queues a command to replay on the next inbound frame.
    pub fn script(&self, command: ProxyCommand) {
        self.script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(command);
    }
}

impl ServerProxyFactory for MockServerProxyFactory {
    fn create(&self, _queue: &Arc<EventQueue>) -> Box<dyn ServerProxy> {
        self.log
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .created += 1;
        Box::new(MockServerProxy {
            log: Arc::clone(&self.log),
            script: Arc::clone(&self.script),
        })
    }
}

struct MockServerProxy {
    log: Arc<Mutex<ProxyLog>>,
    script: Arc<Mutex<VecDeque<ProxyCommand>>>,
}

impl MockServerProxy {
    fn log(&self) -> MutexGuard<'_, ProxyLog> {
        self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ServerProxy for MockServerProxy {
    fn handle_input(&mut self, stream: &mut dyn DataStream, ops: &mut dyn ClientOps) {
        // Consume every complete frame currently buffered.
        while stream.is_ready() {
            let mut frame = Vec::new();
            let mut chunk = [0u8; 256];
            loop {
                let got = stream.read(&mut chunk);
                if got == 0 {
                    break;
                }
                frame.extend_from_slice(&chunk[..got]);
            }
            self.log().frames.push(frame);
        }

        // Replay the scripted server actions against the client.
        let commands: Vec<ProxyCommand> = self
            .script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .drain(..)
            .collect();
        for command in commands {
            match command {
                ProxyCommand::Enter { x, y, mask } => ops.enter(x, y, mask),
                ProxyCommand::Leave => {
                    ops.leave(self, stream);
                }
                ProxyCommand::SetClipboard(id, data) => ops.set_clipboard(id, &data),
                ProxyCommand::GrabClipboard(id) => ops.grab_clipboard(id),
                ProxyCommand::KeyDown(key, mask, button) => ops.key_down(key, mask, button),
                ProxyCommand::KeyUp(key, mask, button) => ops.key_up(key, mask, button),
                ProxyCommand::MouseMove(x, y) => ops.mouse_move(x, y),
                ProxyCommand::MouseDown(button) => ops.mouse_down(button),
                ProxyCommand::MouseUp(button) => ops.mouse_up(button),
                ProxyCommand::MouseWheel(dx, dy) => ops.mouse_wheel(dx, dy),
                ProxyCommand::Screensaver(activate) => ops.screensaver(activate),
                ProxyCommand::ResetOptions => ops.reset_options(),
                ProxyCommand::GameDeviceButtons(id, buttons) => {
                    ops.game_device_buttons(id, buttons)
                }
            }
        }
    }

    fn on_info_changed(&mut self, _stream: &mut dyn DataStream) {
        self.log().info_changed += 1;
    }

    fn on_grab_clipboard(&mut self, _stream: &mut dyn DataStream, id: ClipboardId) {
        self.log().grabs.push(id);
    }

    fn on_clipboard_changed(
        &mut self,
        _stream: &mut dyn DataStream,
        id: ClipboardId,
        data: &ClipboardData,
    ) {
        self.log().clipboard_changes.push((id, data.clone()));
    }

    fn on_game_device_timing_resp(&mut self, _stream: &mut dyn DataStream, freq: u32) {
        self.log().timing_resps.push(freq);
    }

    fn on_game_device_feedback(
        &mut self,
        _stream: &mut dyn DataStream,
        id: GameDeviceId,
        m1: u16,
        m2: u16,
    ) {
        self.log().feedback.push((id, m1, m2));
    }
}
