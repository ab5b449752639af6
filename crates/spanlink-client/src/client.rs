//! The client core: connection lifecycle, screen adapter, and clipboard
//! coherence.
//!
//! A [`Client`] is created once with its collaborators and then driven
//! entirely by events.  [`Client::connect`] builds the stream stack,
//! subscribes the dial handlers, arms the connect timer, and initiates the
//! dial; from there the machine advances on collaborator events until it
//! publishes one of its three lifecycle events at the screen's target:
//!
//! - `Connected` — handshake done, session live.
//! - `ConnectionFailed { message, retry }` — the attempt is over.
//! - `Disconnected` — a live session ended.
//!
//! The phases are visible in which handlers are subscribed rather than in an
//! explicit state field: while dialing the client listens for the dial
//! outcome, during handshake and session it listens to the stream's traffic
//! events, and the one-shot timer bounds everything before the session goes
//! live.  `is_connecting()` is therefore "timer present" and
//! `is_connected()` is "server proxy present".
//!
//! Power transitions are orthogonal: a suspend tears the connection down
//! (publishing `Disconnected` if one was up) and remembers whether to
//! re-dial; the matching resume clears the flag and calls `connect()` again.

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tracing::{debug, info, warn};

use spanlink_core::address::ServerAddress;
use spanlink_core::clipboard::{ClipboardData, ClipboardId, CLIPBOARD_COUNT};
use spanlink_core::event::{Event, EventData, EventKind, EventQueue, EventTarget, FailInfo};
use spanlink_core::input::{
    ButtonId, GameDeviceButtons, GameDeviceId, KeyButton, KeyId, KeyModifierMask, OptionsList,
};
use spanlink_core::protocol::{
    read_hello, HelloBack, PROTOCOL_MAJOR_VERSION, PROTOCOL_MINOR_VERSION,
};
use spanlink_core::stream::DataStream;

use crate::clipboard::ClipboardTracker;
use crate::screen::{Screen, ScreenShape};
use crate::server_proxy::{ClientOps, ServerProxy, ServerProxyFactory};
use crate::stack::{self, CipherControl, CipherStreamFactory, CryptoOptions, StreamFilterFactory};
use crate::transport::TransportFactory;

/// Bound on the dial plus handshake, cancelled once the session is live.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Failure reason for a hello that could not be parsed.
const PROTOCOL_ERROR_MESSAGE: &str = "Protocol error from server";

/// Failure reason when the connect timer fires.
const TIMEOUT_MESSAGE: &str = "Timed out";

// ── Configuration ─────────────────────────────────────────────────────────────

/// Static inputs for a client instance.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Name sent to the server in the `HelloBack` reply.
    pub name: String,
    /// Where the server lives; `Network` addresses are re-resolved on every
    /// attempt.
    pub server_address: ServerAddress,
    /// Session crypto settings; `Disabled` skips the cipher layer entirely.
    pub crypto: CryptoOptions,
}

// ── Status snapshot ───────────────────────────────────────────────────────────

/// Flags of one clipboard slot as seen from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClipboardSlotStatus {
    pub own: bool,
    pub sent: bool,
}

/// Point-in-time view of the client, for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientStatus {
    /// A server proxy exists: the session reached the handshake or beyond.
    pub connected: bool,
    /// The connect timer is armed: dialing or handshaking.
    pub connecting: bool,
    /// The local screen has been enabled for this session.
    pub ready: bool,
    /// The cursor is currently on this screen.
    pub active: bool,
    pub suspended: bool,
    pub connect_on_resume: bool,
    pub has_stream: bool,
    pub clipboard: [ClipboardSlotStatus; CLIPBOARD_COUNT],
}

// ── Client ────────────────────────────────────────────────────────────────────

/// The client endpoint.  See the [module docs](self) for the lifecycle.
pub struct Client {
    shared: Arc<ClientShared>,
}

struct ClientShared {
    queue: Arc<EventQueue>,
    /// The screen's event target, reused as the client's own so lifecycle
    /// subscribers and screen subscribers share one subscription point.
    target: EventTarget,
    state: Mutex<ClientState>,
}

struct ClientState {
    name: String,
    server_address: ServerAddress,
    crypto: CryptoOptions,
    screen: Arc<dyn Screen>,
    transport_factory: Box<dyn TransportFactory>,
    filter_factory: Option<Box<dyn StreamFilterFactory>>,
    cipher_factory: Option<Box<dyn CipherStreamFactory>>,
    proxy_factory: Box<dyn ServerProxyFactory>,
    stream: Option<Box<dyn DataStream>>,
    cipher: Option<Weak<dyn CipherControl>>,
    server: Option<Box<dyn ServerProxy>>,
    timer: Option<EventTarget>,
    ready: bool,
    active: bool,
    suspended: bool,
    connect_on_resume: bool,
    clipboard: ClipboardTracker,
}

impl Client {
    /// Creates a client and registers its suspend/resume and game-device
    /// subscriptions at the screen's target.
    ///
    /// Nothing is dialed until [`connect`](Client::connect).
    pub fn new(
        queue: Arc<EventQueue>,
        screen: Arc<dyn Screen>,
        config: ClientConfig,
        transport_factory: Box<dyn TransportFactory>,
        filter_factory: Option<Box<dyn StreamFilterFactory>>,
        cipher_factory: Option<Box<dyn CipherStreamFactory>>,
        proxy_factory: Box<dyn ServerProxyFactory>,
    ) -> Self {
        let target = screen.event_target();
        let shared = Arc::new(ClientShared {
            queue,
            target,
            state: Mutex::new(ClientState {
                name: config.name,
                server_address: config.server_address,
                crypto: config.crypto,
                screen,
                transport_factory,
                filter_factory,
                cipher_factory,
                proxy_factory,
                stream: None,
                cipher: None,
                server: None,
                timer: None,
                ready: false,
                active: false,
                suspended: false,
                connect_on_resume: false,
                clipboard: ClipboardTracker::new(),
            }),
        });

        for (kind, handler) in CONSTRUCTION_HANDLERS {
            ClientShared::subscribe(&shared, kind, target, handler);
        }

        Self { shared }
    }

    /// Begins a connection attempt.
    ///
    /// Never fails directly: every problem — unresolvable address, factory
    /// construction error, refused dial, timeout — surfaces as a
    /// `ConnectionFailed` event.  A no-op while a stream already exists;
    /// while suspended it only records that a resume should reconnect.
    pub fn connect(&self) {
        ClientShared::connect(&self.shared);
    }

    /// Tears the connection down immediately and unconditionally.
    ///
    /// With a reason the attempt ends in `ConnectionFailed(reason)`;
    /// without one a live session ends in `Disconnected`.  Calling this on
    /// an already-idle client does nothing and publishes nothing.
    pub fn disconnect(&self, reason: Option<&str>) {
        let mut guard = self.shared.lock();
        ClientShared::disconnect_locked(&self.shared, &mut guard, reason);
    }

    /// True once the handshake created the server proxy.
    pub fn is_connected(&self) -> bool {
        self.shared.lock().server.is_some()
    }

    /// True while the connect timer is armed (dialing or handshaking).
    pub fn is_connecting(&self) -> bool {
        self.shared.lock().timer.is_some()
    }

    /// The name sent in the handshake.
    pub fn name(&self) -> String {
        self.shared.lock().name.clone()
    }

    /// The configured server address.
    pub fn server_address(&self) -> ServerAddress {
        self.shared.lock().server_address.clone()
    }

    /// The target the client's lifecycle events are published at.
    pub fn event_target(&self) -> EventTarget {
        self.shared.target
    }

    /// Installs the peer's decryption IV on the cipher layer, when one is
    /// part of the current stack.  A no-op otherwise.
    pub fn set_decrypt_iv(&self, iv: &[u8]) {
        let guard = self.shared.lock();
        if let Some(control) = guard.cipher.as_ref().and_then(Weak::upgrade) {
            control.set_decrypt_iv(iv);
        }
    }

    /// A point-in-time snapshot of the machine, for diagnostics and tests.
    pub fn status(&self) -> ClientStatus {
        let guard = self.shared.lock();
        let mut clipboard = [ClipboardSlotStatus::default(); CLIPBOARD_COUNT];
        for id in ClipboardId::ALL {
            let slot = guard.clipboard.slot(id);
            clipboard[id.index()] = ClipboardSlotStatus {
                own: slot.own,
                sent: slot.sent,
            };
        }
        ClientStatus {
            connected: guard.server.is_some(),
            connecting: guard.timer.is_some(),
            ready: guard.ready,
            active: guard.active,
            suspended: guard.suspended,
            connect_on_resume: guard.connect_on_resume,
            has_stream: guard.stream.is_some(),
            clipboard,
        }
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        for (kind, _) in CONSTRUCTION_HANDLERS {
            self.shared.queue.remove_handler(kind, self.shared.target);
        }
        // Tear down silently: nobody is listening for lifecycle events from
        // a client that is going away.
        let mut guard = self.shared.lock();
        let state = &mut *guard;
        ClientShared::cleanup_timer(&self.shared, state);
        ClientShared::cleanup_screen(&self.shared, state);
        ClientShared::cleanup_connecting(&self.shared, state);
        ClientShared::cleanup_connection(&self.shared, state);
    }
}

type EventFn = fn(&Arc<ClientShared>, &Event);

/// Subscriptions that live for the whole client, not per session.
const CONSTRUCTION_HANDLERS: [(EventKind, EventFn); 4] = [
    (EventKind::Suspend, ClientShared::handle_suspend),
    (EventKind::Resume, ClientShared::handle_resume),
    (
        EventKind::GameDeviceTimingResp,
        ClientShared::handle_game_device_timing_resp,
    ),
    (
        EventKind::GameDeviceFeedback,
        ClientShared::handle_game_device_feedback,
    ),
];

// ── State machine ─────────────────────────────────────────────────────────────

impl ClientShared {
    fn lock(&self) -> MutexGuard<'_, ClientState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Registers an event handler holding only a weak reference back to the
    /// client, so subscriptions never keep a dropped client alive.
    fn subscribe(this: &Arc<Self>, kind: EventKind, target: EventTarget, handler: EventFn) {
        let weak = Arc::downgrade(this);
        this.queue.add_handler(kind, target, move |event| {
            if let Some(shared) = weak.upgrade() {
                handler(&shared, event);
            }
        });
    }

    fn publish(&self, kind: EventKind) {
        self.queue.post(Event::new(kind, self.target));
    }

    fn publish_connection_failed(&self, message: String) {
        self.queue.post(Event::with_data(
            EventKind::ConnectionFailed,
            self.target,
            EventData::Failure(FailInfo::retryable(message)),
        ));
    }

    // ── connect / disconnect ─────────────────────────────────────────────────

    fn connect(this: &Arc<Self>) {
        let mut guard = this.lock();
        let state = &mut *guard;
        if state.stream.is_some() {
            return;
        }
        if state.suspended {
            state.connect_on_resume = true;
            return;
        }

        // Resolve on every attempt: the machine may have moved networks
        // since the last try.
        if let ServerAddress::Network(address) = &state.server_address {
            match address.resolve() {
                Ok(resolved) => {
                    info!(host = %address.host, address = %resolved, "connecting to server");
                }
                Err(error) => {
                    debug!(%error, "connection failed");
                    this.publish_connection_failed(format!(
                        "cannot resolve '{}': {error}",
                        address.host
                    ));
                    return;
                }
            }
        }

        let built = stack::build_stack(
            state.transport_factory.as_ref(),
            state.filter_factory.as_deref(),
            state.cipher_factory.as_deref(),
            &state.crypto,
        );
        let (stream, cipher) = match built {
            Ok(built) => built,
            Err(error) => {
                debug!(%error, "connection failed");
                this.publish_connection_failed(error.to_string());
                return;
            }
        };
        state.stream = Some(stream);
        state.cipher = cipher;

        debug!("connecting to server");
        Self::setup_connecting(this, state);
        Self::setup_timer(this, state);

        let address = state.server_address.clone();
        let dialed = match state.stream.as_deref_mut() {
            Some(stream) => stream.connect(&address),
            None => Ok(()),
        };
        if let Err(error) = dialed {
            Self::cleanup_timer(this, state);
            Self::cleanup_connecting(this, state);
            Self::cleanup_connection(this, state);
            debug!(%error, "connection failed");
            this.publish_connection_failed(error.to_string());
        }
    }

    fn disconnect_locked(this: &Arc<Self>, state: &mut ClientState, reason: Option<&str>) {
        state.connect_on_resume = false;
        let was_engaged =
            state.stream.is_some() || state.server.is_some() || state.timer.is_some();
        Self::cleanup_timer(this, state);
        Self::cleanup_screen(this, state);
        Self::cleanup_connecting(this, state);
        Self::cleanup_connection(this, state);
        if !was_engaged {
            return;
        }
        match reason {
            Some(message) => this.publish_connection_failed(message.to_string()),
            None => this.publish(EventKind::Disconnected),
        }
    }

    // ── Subscription phases ──────────────────────────────────────────────────

    fn setup_connecting(this: &Arc<Self>, state: &mut ClientState) {
        let Some(stream) = state.stream.as_ref() else {
            return;
        };
        let target = stream.event_target();
        Self::subscribe(this, EventKind::StreamConnected, target, Self::handle_connected);
        Self::subscribe(
            this,
            EventKind::StreamConnectFailed,
            target,
            Self::handle_connection_failed,
        );
    }

    fn setup_connection(this: &Arc<Self>, state: &mut ClientState) {
        let Some(stream) = state.stream.as_ref() else {
            return;
        };
        let target = stream.event_target();
        Self::subscribe(
            this,
            EventKind::StreamDisconnected,
            target,
            Self::handle_disconnected,
        );
        Self::subscribe(this, EventKind::InputReady, target, Self::handle_input_ready);
        Self::subscribe(this, EventKind::OutputError, target, Self::handle_output_error);
        Self::subscribe(this, EventKind::InputShutdown, target, Self::handle_disconnected);
        Self::subscribe(this, EventKind::OutputShutdown, target, Self::handle_disconnected);
    }

    fn setup_screen(this: &Arc<Self>, state: &mut ClientState) {
        state.ready = false;
        state.server = Some(state.proxy_factory.create(&this.queue));
        Self::subscribe(this, EventKind::ShapeChanged, this.target, Self::handle_shape_changed);
        Self::subscribe(
            this,
            EventKind::ClipboardGrabbed,
            this.target,
            Self::handle_clipboard_grabbed,
        );
    }

    fn setup_timer(this: &Arc<Self>, state: &mut ClientState) {
        let timer = this.queue.new_one_shot_timer(CONNECT_TIMEOUT);
        Self::subscribe(this, EventKind::Timer, timer, Self::handle_connect_timeout);
        state.timer = Some(timer);
    }

    // ── Teardown fragments ───────────────────────────────────────────────────
    //
    // Each fragment is idempotent and they always run in the same order:
    // timer, screen, connecting, connection.

    fn cleanup_connecting(this: &Arc<Self>, state: &mut ClientState) {
        if let Some(stream) = state.stream.as_ref() {
            let target = stream.event_target();
            this.queue.remove_handler(EventKind::StreamConnected, target);
            this.queue.remove_handler(EventKind::StreamConnectFailed, target);
        }
    }

    fn cleanup_connection(this: &Arc<Self>, state: &mut ClientState) {
        if let Some(stream) = state.stream.take() {
            let target = stream.event_target();
            for kind in [
                EventKind::StreamDisconnected,
                EventKind::InputReady,
                EventKind::OutputError,
                EventKind::InputShutdown,
                EventKind::OutputShutdown,
            ] {
                this.queue.remove_handler(kind, target);
            }
        }
        state.cipher = None;
    }

    fn cleanup_screen(this: &Arc<Self>, state: &mut ClientState) {
        if state.server.take().is_some() {
            if state.ready {
                state.screen.disable();
                state.ready = false;
            }
            state.active = false;
            this.queue.remove_handler(EventKind::ShapeChanged, this.target);
            this.queue.remove_handler(EventKind::ClipboardGrabbed, this.target);
        }
    }

    fn cleanup_timer(this: &Arc<Self>, state: &mut ClientState) {
        if let Some(timer) = state.timer.take() {
            this.queue.remove_handler(EventKind::Timer, timer);
            this.queue.delete_timer(timer);
        }
    }

    // ── Dial outcome ─────────────────────────────────────────────────────────

    fn handle_connected(this: &Arc<Self>, _event: &Event) {
        debug!("connected; waiting for hello");
        let mut guard = this.lock();
        let state = &mut *guard;
        Self::cleanup_connecting(this, state);
        Self::setup_connection(this, state);
        // A new session starts with no clipboard history.
        state.clipboard.reset_all();
    }

    fn handle_connection_failed(this: &Arc<Self>, event: &Event) {
        let reason = event
            .failure()
            .map(|info| info.message.clone())
            .unwrap_or_else(|| "connection failed".to_string());
        let mut guard = this.lock();
        let state = &mut *guard;
        Self::cleanup_timer(this, state);
        Self::cleanup_screen(this, state);
        Self::cleanup_connecting(this, state);
        Self::cleanup_connection(this, state);
        debug!(%reason, "connection failed");
        this.publish_connection_failed(reason);
    }

    fn handle_connect_timeout(this: &Arc<Self>, _event: &Event) {
        let mut guard = this.lock();
        let state = &mut *guard;
        Self::cleanup_timer(this, state);
        Self::cleanup_screen(this, state);
        Self::cleanup_connecting(this, state);
        Self::cleanup_connection(this, state);
        debug!("connection timed out");
        this.publish_connection_failed(TIMEOUT_MESSAGE.to_string());
    }

    // ── Session traffic ──────────────────────────────────────────────────────

    fn handle_input_ready(this: &Arc<Self>, _event: &Event) {
        let mut guard = this.lock();
        let state = &mut *guard;
        if state.server.is_none() {
            Self::handle_hello(this, state);
            return;
        }
        // Hand the proxy the stream and the ops surface.  Both are moved out
        // for the duration of the dispatch so the proxy can hold the stream
        // while driving the client through `ClientOps`.
        match (state.server.take(), state.stream.take()) {
            (Some(mut server), Some(mut stream)) => {
                server.handle_input(stream.as_mut(), state);
                state.server = Some(server);
                state.stream = Some(stream);
            }
            (server, stream) => {
                state.server = server;
                state.stream = stream;
            }
        }
    }

    fn handle_hello(this: &Arc<Self>, state: &mut ClientState) {
        let hello = {
            let Some(stream) = state.stream.as_deref_mut() else {
                return;
            };
            read_hello(stream)
        };
        let hello = match hello {
            Ok(hello) => hello,
            Err(error) => {
                debug!(%error, "malformed hello from server");
                this.publish_connection_failed(PROTOCOL_ERROR_MESSAGE.to_string());
                Self::cleanup_timer(this, state);
                Self::cleanup_connection(this, state);
                return;
            }
        };

        debug!(major = hello.major, minor = hello.minor, "got hello");
        if let Err(error) = hello.check_compatibility() {
            this.publish_connection_failed(error.to_string());
            Self::cleanup_timer(this, state);
            Self::cleanup_connection(this, state);
            return;
        }

        debug!(
            major = PROTOCOL_MAJOR_VERSION,
            minor = PROTOCOL_MINOR_VERSION,
            "say hello back"
        );
        let reply = HelloBack::local(state.name.as_str());
        let write_result = match state.stream.as_deref_mut() {
            Some(stream) => stream.write(&reply.encode()),
            None => return,
        };
        if let Err(error) = write_result {
            warn!(%error, "failed to send hello reply");
            this.publish_connection_failed(error.to_string());
            Self::cleanup_timer(this, state);
            Self::cleanup_connection(this, state);
            return;
        }

        // Session is live: create the proxy, stop the clock, open the screen.
        Self::setup_screen(this, state);
        Self::cleanup_timer(this, state);
        Self::handshake_complete(this, state);

        // The hello may have arrived glued to the first session frames; no
        // further network event will announce those, so fake one.
        if let Some(stream) = state.stream.as_deref_mut() {
            if stream.is_ready() {
                let target = stream.event_target();
                this.queue.post(Event::new(EventKind::InputReady, target));
            }
        }
    }

    fn handshake_complete(this: &Arc<Self>, state: &mut ClientState) {
        state.ready = true;
        state.screen.enable();
        this.publish(EventKind::Connected);
    }

    fn handle_output_error(this: &Arc<Self>, _event: &Event) {
        let mut guard = this.lock();
        let state = &mut *guard;
        Self::cleanup_timer(this, state);
        Self::cleanup_screen(this, state);
        Self::cleanup_connecting(this, state);
        Self::cleanup_connection(this, state);
        warn!("error sending to server");
        this.publish(EventKind::Disconnected);
    }

    fn handle_disconnected(this: &Arc<Self>, _event: &Event) {
        let mut guard = this.lock();
        let state = &mut *guard;
        Self::cleanup_timer(this, state);
        Self::cleanup_screen(this, state);
        Self::cleanup_connecting(this, state);
        Self::cleanup_connection(this, state);
        debug!("disconnected");
        this.publish(EventKind::Disconnected);
    }

    // ── Screen events ────────────────────────────────────────────────────────

    fn handle_shape_changed(this: &Arc<Self>, _event: &Event) {
        debug!("resolution changed");
        let mut guard = this.lock();
        let state = &mut *guard;
        if let (Some(server), Some(stream)) =
            (state.server.as_deref_mut(), state.stream.as_deref_mut())
        {
            server.on_info_changed(stream);
        }
    }

    fn handle_clipboard_grabbed(this: &Arc<Self>, event: &Event) {
        let EventData::Clipboard(id) = &event.data else {
            return;
        };
        let id = *id;
        let mut guard = this.lock();
        let state = &mut *guard;
        let Some(server) = state.server.as_deref_mut() else {
            return;
        };
        let Some(stream) = state.stream.as_deref_mut() else {
            return;
        };

        // Announce the grab; we now own contents the server has not seen.
        server.on_grab_clipboard(stream, id);
        state.clipboard.grab_local(id);

        // While this screen is active the send waits for leave(); otherwise
        // the server wants the contents right away.
        if !state.active {
            send_clipboard(&*state.screen, &mut state.clipboard, id, server, stream);
        }
    }

    fn handle_suspend(this: &Arc<Self>, _event: &Event) {
        info!("suspend");
        let mut guard = this.lock();
        let state = &mut *guard;
        state.suspended = true;
        let was_connected = state.server.is_some();
        Self::disconnect_locked(this, state, None);
        state.connect_on_resume = was_connected;
    }

    fn handle_resume(this: &Arc<Self>, _event: &Event) {
        info!("resume");
        let reconnect = {
            let mut guard = this.lock();
            guard.suspended = false;
            if guard.connect_on_resume {
                guard.connect_on_resume = false;
                true
            } else {
                false
            }
        };
        if reconnect {
            Self::connect(this);
        }
    }

    fn handle_game_device_timing_resp(this: &Arc<Self>, event: &Event) {
        let EventData::GameDeviceTiming(freq) = &event.data else {
            return;
        };
        let freq = *freq;
        let mut guard = this.lock();
        let state = &mut *guard;
        if let (Some(server), Some(stream)) =
            (state.server.as_deref_mut(), state.stream.as_deref_mut())
        {
            server.on_game_device_timing_resp(stream, freq);
        }
    }

    fn handle_game_device_feedback(this: &Arc<Self>, event: &Event) {
        let EventData::GameDeviceFeedback { id, m1, m2 } = &event.data else {
            return;
        };
        let (id, m1, m2) = (*id, *m1, *m2);
        let mut guard = this.lock();
        let state = &mut *guard;
        if let (Some(server), Some(stream)) =
            (state.server.as_deref_mut(), state.stream.as_deref_mut())
        {
            server.on_game_device_feedback(stream, id, m1, m2);
        }
    }
}

// ── Clipboard send path ───────────────────────────────────────────────────────

/// Transmits clipboard `id` to the server if its contents changed since the
/// last transmission.
///
/// Runs on the event dispatch thread like every other state mutation; all
/// clipboard producers (grab events, proxy-driven leaves) funnel through the
/// queue, so the slot state needs no locking of its own.
///
/// The snapshot is seeded with the last observed timestamp so the screen can
/// skip copying an unchanged clipboard, and the marshalled bytes are compared
/// against the last transmission so identical content is never sent twice.
fn send_clipboard(
    screen: &dyn Screen,
    tracker: &mut ClipboardTracker,
    id: ClipboardId,
    server: &mut dyn ServerProxy,
    stream: &mut dyn DataStream,
) {
    let slot = tracker.slot_mut(id);
    let mut snapshot = ClipboardData::with_time(slot.time);
    screen.get_clipboard(id, &mut snapshot);

    if slot.time != 0 && snapshot.time() == slot.time {
        return;
    }
    slot.time = snapshot.time();

    let data = snapshot.marshall();
    if slot.data.as_deref() == Some(data.as_slice()) {
        return;
    }
    slot.sent = true;
    slot.data = Some(data);
    debug!(?id, "clipboard changed, sending");
    server.on_clipboard_changed(stream, id, &snapshot);
}

// ── Screen adapter: what the server proxy drives ──────────────────────────────

impl ClientOps for ClientState {
    fn enter(&mut self, x_abs: i32, y_abs: i32, mask: KeyModifierMask) {
        self.active = true;
        self.screen.mouse_move(x_abs, y_abs);
        self.screen.enter(mask);
    }

    fn leave(&mut self, server: &mut dyn ServerProxy, stream: &mut dyn DataStream) -> bool {
        self.screen.leave();
        self.active = false;

        // Send clipboards we own and that have changed before the leave
        // completes, so the server sees them before switching screens.
        for id in ClipboardId::ALL {
            if self.clipboard.slot(id).own {
                send_clipboard(&*self.screen, &mut self.clipboard, id, server, stream);
            }
        }
        true
    }

    fn set_clipboard(&mut self, id: ClipboardId, data: &ClipboardData) {
        self.screen.set_clipboard(id, data);
        self.clipboard.surrender(id);
    }

    fn grab_clipboard(&mut self, id: ClipboardId) {
        self.screen.grab_clipboard(id);
        self.clipboard.surrender(id);
    }

    fn set_clipboard_dirty(&mut self, _id: ClipboardId, _dirty: bool) {
        panic!("set_clipboard_dirty must not be called on the client side");
    }

    fn key_down(&mut self, key: KeyId, mask: KeyModifierMask, button: KeyButton) {
        self.screen.key_down(key, mask, button);
    }

    fn key_repeat(&mut self, key: KeyId, mask: KeyModifierMask, count: i32, button: KeyButton) {
        self.screen.key_repeat(key, mask, count, button);
    }

    fn key_up(&mut self, key: KeyId, mask: KeyModifierMask, button: KeyButton) {
        self.screen.key_up(key, mask, button);
    }

    fn mouse_down(&mut self, button: ButtonId) {
        self.screen.mouse_down(button);
    }

    fn mouse_up(&mut self, button: ButtonId) {
        self.screen.mouse_up(button);
    }

    fn mouse_move(&mut self, x: i32, y: i32) {
        self.screen.mouse_move(x, y);
    }

    fn mouse_relative_move(&mut self, dx: i32, dy: i32) {
        self.screen.mouse_relative_move(dx, dy);
    }

    fn mouse_wheel(&mut self, dx: i32, dy: i32) {
        self.screen.mouse_wheel(dx, dy);
    }

    fn screensaver(&mut self, activate: bool) {
        self.screen.screensaver(activate);
    }

    fn reset_options(&mut self) {
        self.screen.reset_options();
    }

    fn set_options(&mut self, options: &OptionsList) {
        self.screen.set_options(options);
    }

    fn game_device_buttons(&mut self, id: GameDeviceId, buttons: GameDeviceButtons) {
        self.screen.game_device_buttons(id, buttons);
    }

    fn game_device_sticks(&mut self, id: GameDeviceId, x1: i16, y1: i16, x2: i16, y2: i16) {
        self.screen.game_device_sticks(id, x1, y1, x2, y2);
    }

    fn game_device_triggers(&mut self, id: GameDeviceId, t1: u8, t2: u8) {
        self.screen.game_device_triggers(id, t1, t2);
    }

    fn game_device_timing_req(&mut self) {
        self.screen.game_device_timing_req();
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn shape(&self) -> ScreenShape {
        self.screen.shape()
    }

    fn cursor_pos(&self) -> (i32, i32) {
        self.screen.cursor_pos()
    }

    fn clipboard(&self, id: ClipboardId, data: &mut ClipboardData) -> bool {
        self.screen.get_clipboard(id, data)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
