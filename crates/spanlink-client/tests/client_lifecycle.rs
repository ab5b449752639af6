//! Integration tests for the client lifecycle.
//!
//! These drive the whole client through its public API with every
//! collaborator mocked: the transport handle plays the network, the scripted
//! proxy plays the server's session protocol, and the mock screen plays the
//! platform.  The queue is pumped manually, so each test controls exactly
//! which events have happened, and the 15-second connect timer is expired
//! with virtual time instead of waiting.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use spanlink_client::client::{Client, ClientConfig};
use spanlink_client::mock::{
    MemoryTransportFactory, MockScreen, MockServerProxyFactory, ProxyCommand, ProxyLog,
    ScreenCall, TransportHandle, XorCipherFactory,
};
use spanlink_client::screen::Screen;
use spanlink_client::stack::{CipherStreamFactory, CryptoMode, CryptoOptions};
use spanlink_core::address::ServerAddress;
use spanlink_core::clipboard::{ClipboardData, ClipboardFormat, ClipboardId};
use spanlink_core::event::{EventKind, EventQueue};
use spanlink_core::input::{KeyButton, KeyId, KeyModifierMask};
use spanlink_core::protocol::{Hello, HelloBack};

// ── Harness ───────────────────────────────────────────────────────────────────

type LifecycleLog = Arc<Mutex<Vec<(EventKind, Option<String>)>>>;

struct Harness {
    queue: Arc<EventQueue>,
    client: Client,
    transport: TransportHandle,
    screen: Arc<MockScreen>,
    proxy: MockServerProxyFactory,
    events: LifecycleLog,
}

impl Harness {
    fn new(name: &str) -> Self {
        Self::with_cipher(name, CryptoOptions::disabled(), None)
    }

    fn with_cipher(
        name: &str,
        crypto: CryptoOptions,
        cipher: Option<Box<dyn CipherStreamFactory>>,
    ) -> Self {
        let queue = EventQueue::new();
        let screen = Arc::new(MockScreen::new(Arc::clone(&queue)));
        let transport = TransportHandle::new(Arc::clone(&queue));
        let proxy = MockServerProxyFactory::new();
        let events = screen.subscribe_lifecycle();
        let client = Client::new(
            Arc::clone(&queue),
            Arc::clone(&screen) as Arc<dyn Screen>,
            ClientConfig {
                name: name.to_string(),
                server_address: ServerAddress::network("127.0.0.1", 24800),
                crypto,
            },
            Box::new(MemoryTransportFactory::new(transport.clone())),
            None,
            cipher,
            Box::new(proxy.clone()),
        );
        Self {
            queue,
            client,
            transport,
            screen,
            proxy,
            events,
        }
    }

    /// Dials, accepts, and completes the handshake with a matching version.
    fn connect_to_active(&self) {
        self.client.connect();
        self.transport.accept();
        self.transport
            .push_frame(&Hello { major: 1, minor: 6 }.encode());
        self.queue.run_pending();
        assert!(self.client.is_connected(), "handshake must have completed");
    }

    fn events(&self) -> Vec<(EventKind, Option<String>)> {
        self.events.lock().unwrap().clone()
    }

    fn proxy_log(&self) -> Arc<Mutex<ProxyLog>> {
        self.proxy.log()
    }

    /// Stages clipboard contents on the mock screen.
    fn stage_clipboard(&self, id: ClipboardId, time: u64, text: &[u8]) {
        let mut data = ClipboardData::with_time(time);
        data.add(ClipboardFormat::Text, text.to_vec());
        self.screen.set_local_clipboard(id, data);
    }
}

// ── Scenario 1: happy path ────────────────────────────────────────────────────

#[test]
fn test_happy_path_handshake_publishes_connected() {
    // Arrange
    let h = Harness::new("laptop");

    // Act
    h.client.connect();
    h.transport.accept();
    h.transport
        .push_frame(&Hello { major: 1, minor: 6 }.encode());
    h.queue.run_pending();

    // Assert — HelloBack carries the local version and name
    let frames = h.transport.written_frames();
    assert_eq!(frames.len(), 1, "exactly one frame written");
    let reply = HelloBack::decode(&frames[0]).expect("valid HelloBack");
    assert_eq!(reply.major, 1);
    assert_eq!(reply.minor, 6);
    assert_eq!(reply.name, "laptop");

    // Timer cancelled, session live, screen enabled.
    assert!(!h.client.is_connecting());
    assert!(h.client.is_connected());
    assert!(h.screen.is_enabled());
    assert_eq!(h.events(), vec![(EventKind::Connected, None)]);
}

#[test]
fn test_timer_is_cancelled_once_active() {
    // Reaching Active must disarm the 15 s timer for good.
    let h = Harness::new("laptop");
    h.connect_to_active();

    h.queue.advance(Duration::from_secs(20));
    h.queue.run_pending();

    assert_eq!(h.events(), vec![(EventKind::Connected, None)]);
    assert!(h.client.is_connected(), "late timer must not kill the session");
}

// ── Scenario 2: version too old ───────────────────────────────────────────────

#[test]
fn test_older_server_version_is_rejected() {
    // Arrange
    let h = Harness::new("laptop");

    // Act — server speaks 1.3, we need at least 1.6
    h.client.connect();
    h.transport.accept();
    h.transport
        .push_frame(&Hello { major: 1, minor: 3 }.encode());
    h.queue.run_pending();

    // Assert — no reply written, attempt over, back to idle
    assert!(h.transport.written_frames().is_empty(), "no HelloBack");
    let events = h.events();
    assert_eq!(events.len(), 1);
    let (kind, message) = &events[0];
    assert_eq!(*kind, EventKind::ConnectionFailed);
    let message = message.as_deref().unwrap_or_default();
    assert!(
        message.starts_with("incompatible server version"),
        "unexpected message: {message}"
    );
    assert!(message.contains("1.3"));
    let status = h.client.status();
    assert!(!status.connecting && !status.connected && !status.has_stream);
}

// ── Scenario 3: timeout ───────────────────────────────────────────────────────

#[test]
fn test_silent_transport_times_out_after_fifteen_seconds() {
    // Arrange — dial, then nothing
    let h = Harness::new("laptop");
    h.client.connect();
    assert!(h.client.is_connecting());

    // Act
    h.queue.advance(Duration::from_secs(15));
    h.queue.run_pending();

    // Assert
    assert_eq!(
        h.events(),
        vec![(EventKind::ConnectionFailed, Some("Timed out".to_string()))]
    );
    let status = h.client.status();
    assert!(!status.connecting && !status.has_stream);
}

#[test]
fn test_timeout_covers_the_handshake_too() {
    // The transport connects but the server never says hello.
    let h = Harness::new("laptop");
    h.client.connect();
    h.transport.accept();
    h.queue.run_pending();

    h.queue.advance(Duration::from_secs(15));
    h.queue.run_pending();

    assert_eq!(
        h.events(),
        vec![(EventKind::ConnectionFailed, Some("Timed out".to_string()))]
    );
}

// ── Scenario 4: suspend / resume ──────────────────────────────────────────────

#[test]
fn test_suspend_during_session_disconnects_and_resume_redials() {
    // Arrange
    let h = Harness::new("laptop");
    h.connect_to_active();

    // Act — platform suspends
    h.screen.post_suspend();
    h.queue.run_pending();

    // Assert — session torn down, reconnect remembered
    assert_eq!(
        h.events(),
        vec![
            (EventKind::Connected, None),
            (EventKind::Disconnected, None),
        ]
    );
    let status = h.client.status();
    assert!(status.suspended);
    assert!(status.connect_on_resume);
    assert!(!status.connected && !status.has_stream);
    assert!(!h.screen.is_enabled(), "screen disabled on teardown");

    // Act — platform resumes
    h.screen.post_resume();
    h.queue.run_pending();

    // Assert — a fresh dial began
    assert_eq!(h.transport.create_count(), 2);
    assert!(h.client.is_connecting());
    assert!(!h.client.status().suspended);
}

#[test]
fn test_suspend_while_dialing_does_not_reconnect_on_resume() {
    // No session had been established, so resume must stay idle.
    let h = Harness::new("laptop");
    h.client.connect();
    h.screen.post_suspend();
    h.queue.run_pending();

    assert_eq!(h.events(), vec![(EventKind::Disconnected, None)]);
    assert!(!h.client.status().connect_on_resume);

    h.screen.post_resume();
    h.queue.run_pending();
    assert_eq!(h.transport.create_count(), 1, "no automatic re-dial");
}

#[test]
fn test_connect_while_suspended_waits_for_resume() {
    let h = Harness::new("laptop");
    h.screen.post_suspend();
    h.queue.run_pending();

    h.client.connect();
    assert_eq!(h.transport.create_count(), 0);
    assert!(h.client.status().connect_on_resume);

    h.screen.post_resume();
    h.queue.run_pending();
    assert_eq!(h.transport.create_count(), 1);
}

// ── Scenario 5: clipboard emit on leave ───────────────────────────────────────

#[test]
fn test_owned_clipboard_is_sent_on_leave_not_before() {
    // Arrange — active session with the cursor on this screen
    let h = Harness::new("laptop");
    h.connect_to_active();
    h.stage_clipboard(ClipboardId::Clipboard, 100, b"copied text");

    h.proxy.script(ProxyCommand::Enter {
        x: 10,
        y: 20,
        mask: KeyModifierMask::default(),
    });
    h.transport.push_frame(b"enter");
    h.queue.run_pending();
    assert!(h.client.status().active);

    // Act — local app grabs the clipboard while we are active
    h.screen.post_clipboard_grabbed(ClipboardId::Clipboard);
    h.queue.run_pending();

    // Assert — grab announced, but contents held back until leave
    {
        let log = h.proxy_log();
        let log = log.lock().unwrap();
        assert_eq!(log.grabs, vec![ClipboardId::Clipboard]);
        assert!(log.clipboard_changes.is_empty(), "no emit while active");
    }
    let status = h.client.status();
    assert!(status.clipboard[0].own);
    assert!(!status.clipboard[0].sent);

    // Act — the server moves the cursor away
    h.proxy.script(ProxyCommand::Leave);
    h.transport.push_frame(b"leave");
    h.queue.run_pending();

    // Assert — exactly one emission, then sent
    {
        let log = h.proxy_log();
        let log = log.lock().unwrap();
        assert_eq!(log.clipboard_changes.len(), 1);
        let (id, data) = &log.clipboard_changes[0];
        assert_eq!(*id, ClipboardId::Clipboard);
        assert_eq!(data.get(ClipboardFormat::Text), Some(&b"copied text"[..]));
    }
    let status = h.client.status();
    assert!(!status.active);
    assert!(status.clipboard[0].sent);
}

// ── Scenario 6: unchanged re-grab ─────────────────────────────────────────────

#[test]
fn test_regrab_with_identical_content_is_not_retransmitted() {
    // Arrange — first grab while inactive sends immediately
    let h = Harness::new("laptop");
    h.connect_to_active();
    h.stage_clipboard(ClipboardId::Clipboard, 100, b"same content");

    h.screen.post_clipboard_grabbed(ClipboardId::Clipboard);
    h.queue.run_pending();
    {
        let log = h.proxy_log();
        let log = log.lock().unwrap();
        assert_eq!(log.clipboard_changes.len(), 1);
    }
    assert!(h.client.status().clipboard[0].sent);
    h.screen.clear_calls();

    // Act — a second grab with identical content and timestamp
    h.screen.post_clipboard_grabbed(ClipboardId::Clipboard);
    h.queue.run_pending();

    // Assert — one read attempt, marshalled bytes matched, nothing sent
    assert_eq!(h.screen.clipboard_reads(ClipboardId::Clipboard), 1);
    let log = h.proxy_log();
    let log = log.lock().unwrap();
    assert_eq!(log.grabs.len(), 2, "the grab itself is still announced");
    assert_eq!(log.clipboard_changes.len(), 1, "no second transmission");
}

// ── Clipboard round trip ──────────────────────────────────────────────────────

#[test]
fn test_server_push_then_local_grab_reenters_owned_unsent() {
    // Arrange — active cursor so a grab does not immediately transmit
    let h = Harness::new("laptop");
    h.connect_to_active();
    h.proxy.script(ProxyCommand::Enter {
        x: 0,
        y: 0,
        mask: KeyModifierMask::default(),
    });

    // Server pushes clipboard contents down.
    let mut pushed = ClipboardData::with_time(7);
    pushed.add(ClipboardFormat::Text, b"from server".to_vec());
    h.proxy
        .script(ProxyCommand::SetClipboard(ClipboardId::Clipboard, pushed));
    h.transport.push_frame(b"enter-and-clip");
    h.queue.run_pending();

    let status = h.client.status();
    assert!(!status.clipboard[0].own);
    assert!(!status.clipboard[0].sent);
    assert!(h
        .screen
        .calls()
        .contains(&ScreenCall::SetClipboard(ClipboardId::Clipboard)));

    // Act — the local application grabs the clipboard back
    h.screen.post_clipboard_grabbed(ClipboardId::Clipboard);
    h.queue.run_pending();

    // Assert
    let status = h.client.status();
    assert!(status.clipboard[0].own);
    assert!(!status.clipboard[0].sent);
}

#[test]
fn test_remote_grab_surrenders_local_ownership() {
    let h = Harness::new("laptop");
    h.connect_to_active();
    h.stage_clipboard(ClipboardId::Selection, 5, b"mine");
    h.screen.post_clipboard_grabbed(ClipboardId::Selection);
    h.queue.run_pending();
    assert!(h.client.status().clipboard[1].own);

    // The server announces another screen took the clipboard.
    h.proxy
        .script(ProxyCommand::GrabClipboard(ClipboardId::Selection));
    h.transport.push_frame(b"grab");
    h.queue.run_pending();

    let status = h.client.status();
    assert!(!status.clipboard[1].own);
    assert!(!status.clipboard[1].sent);
    assert!(h
        .screen
        .calls()
        .contains(&ScreenCall::GrabClipboard(ClipboardId::Selection)));
}

// ── Failure paths ─────────────────────────────────────────────────────────────

#[test]
fn test_refused_dial_publishes_exactly_one_failure() {
    let h = Harness::new("laptop");
    h.client.connect();
    h.transport.refuse("connection refused");
    h.queue.run_pending();

    assert_eq!(
        h.events(),
        vec![(
            EventKind::ConnectionFailed,
            Some("connection refused".to_string())
        )]
    );
    let status = h.client.status();
    assert!(!status.connecting && !status.has_stream && !status.connected);
}

#[test]
fn test_malformed_hello_is_a_protocol_error() {
    let h = Harness::new("laptop");
    h.client.connect();
    h.transport.accept();
    h.transport.push_frame(b"not a hello at all");
    h.queue.run_pending();

    assert_eq!(
        h.events(),
        vec![(
            EventKind::ConnectionFailed,
            Some("Protocol error from server".to_string())
        )]
    );
    assert!(!h.client.status().has_stream);
}

#[test]
fn test_remote_close_during_session_publishes_disconnected() {
    let h = Harness::new("laptop");
    h.connect_to_active();

    h.transport.close();
    h.queue.run_pending();

    assert_eq!(
        h.events(),
        vec![
            (EventKind::Connected, None),
            (EventKind::Disconnected, None),
        ]
    );
    let status = h.client.status();
    assert!(!status.connected && !status.has_stream);
    assert!(!h.screen.is_enabled());
}

#[test]
fn test_output_error_during_session_publishes_disconnected() {
    let h = Harness::new("laptop");
    h.connect_to_active();

    h.transport.fail_output();
    h.queue.run_pending();

    assert_eq!(
        h.events(),
        vec![
            (EventKind::Connected, None),
            (EventKind::Disconnected, None),
        ]
    );
}

#[test]
fn test_input_shutdown_during_session_publishes_disconnected() {
    let h = Harness::new("laptop");
    h.connect_to_active();

    h.transport.close_input();
    h.queue.run_pending();

    assert_eq!(
        h.events(),
        vec![
            (EventKind::Connected, None),
            (EventKind::Disconnected, None),
        ]
    );
}

// ── Caller-initiated disconnect ───────────────────────────────────────────────

#[test]
fn test_disconnect_without_reason_publishes_disconnected() {
    let h = Harness::new("laptop");
    h.connect_to_active();

    h.client.disconnect(None);
    h.queue.run_pending();

    let status = h.client.status();
    assert!(!status.connected && !status.connecting && !status.has_stream);
    assert_eq!(
        h.events(),
        vec![
            (EventKind::Connected, None),
            (EventKind::Disconnected, None),
        ]
    );
}

#[test]
fn test_disconnect_with_reason_publishes_connection_failed() {
    let h = Harness::new("laptop");
    h.connect_to_active();

    h.client.disconnect(Some("server rejected client name"));
    h.queue.run_pending();

    assert_eq!(
        h.events(),
        vec![
            (EventKind::Connected, None),
            (
                EventKind::ConnectionFailed,
                Some("server rejected client name".to_string())
            ),
        ]
    );
}

#[test]
fn test_second_disconnect_is_a_no_op() {
    let h = Harness::new("laptop");
    h.connect_to_active();

    h.client.disconnect(None);
    h.client.disconnect(None);
    h.queue.run_pending();

    // Only one lifecycle event beyond the original Connected.
    assert_eq!(h.events().len(), 2);
}

// ── Handshake tail ────────────────────────────────────────────────────────────

#[test]
fn test_frames_glued_to_the_hello_reach_the_proxy() {
    // One network event carries the hello plus the first session frame; the
    // client must synthesize the input-ready the proxy would otherwise miss.
    let h = Harness::new("laptop");
    h.client.connect();
    h.transport.accept();

    let mut glued = Vec::new();
    let hello = Hello { major: 1, minor: 6 }.encode();
    glued.extend_from_slice(&(hello.len() as u32).to_be_bytes());
    glued.extend_from_slice(&hello);
    glued.extend_from_slice(&5u32.to_be_bytes());
    glued.extend_from_slice(b"first");
    h.transport.push_bytes(&glued);
    h.queue.run_pending();

    assert!(h.client.is_connected());
    let log = h.proxy_log();
    let log = log.lock().unwrap();
    assert_eq!(log.frames, vec![b"first".to_vec()]);
}

// ── Upstream forwarding ───────────────────────────────────────────────────────

#[test]
fn test_shape_change_is_reported_to_the_server() {
    let h = Harness::new("laptop");
    h.connect_to_active();

    h.screen.post_shape_changed();
    h.queue.run_pending();

    assert_eq!(h.proxy_log().lock().unwrap().info_changed, 1);
}

#[test]
fn test_shape_change_before_session_is_ignored() {
    let h = Harness::new("laptop");
    h.screen.post_shape_changed();
    h.queue.run_pending();
    assert_eq!(h.proxy_log().lock().unwrap().info_changed, 0);
}

#[test]
fn test_game_device_events_are_forwarded() {
    let h = Harness::new("laptop");
    h.connect_to_active();

    h.screen.post_game_device_timing(125);
    h.screen
        .post_game_device_feedback(spanlink_core::input::GameDeviceId(1), 20, 40);
    h.queue.run_pending();

    let log = h.proxy_log();
    let log = log.lock().unwrap();
    assert_eq!(log.timing_resps, vec![125]);
    assert_eq!(log.feedback, vec![(spanlink_core::input::GameDeviceId(1), 20, 40)]);
}

// ── Server-driven input injection ─────────────────────────────────────────────

#[test]
fn test_server_input_commands_reach_the_screen() {
    let h = Harness::new("laptop");
    h.connect_to_active();

    h.proxy.script(ProxyCommand::KeyDown(
        KeyId(0x61),
        KeyModifierMask(KeyModifierMask::SHIFT),
        KeyButton(30),
    ));
    h.proxy.script(ProxyCommand::MouseMove(640, 480));
    h.transport.push_frame(b"input");
    h.queue.run_pending();

    let calls = h.screen.calls();
    assert!(calls.contains(&ScreenCall::KeyDown(
        KeyId(0x61),
        KeyModifierMask(KeyModifierMask::SHIFT),
        KeyButton(30)
    )));
    assert!(calls.contains(&ScreenCall::MouseMove(640, 480)));
}

// ── Crypto layer ──────────────────────────────────────────────────────────────

#[test]
fn test_encrypted_session_handshake_and_decrypt_iv() {
    // Arrange — a stack with the XOR "cipher" outermost
    let key = 0x5A;
    let cipher = XorCipherFactory::new(key);
    let h = Harness::with_cipher(
        "laptop",
        CryptoOptions {
            mode: CryptoMode::Ctr,
            pass: "secret".to_string(),
        },
        Some(Box::new(cipher.clone())),
    );

    // Act — the server's hello arrives encrypted
    h.client.connect();
    h.transport.accept();
    let encrypted: Vec<u8> = Hello { major: 1, minor: 6 }
        .encode()
        .iter()
        .map(|byte| byte ^ key)
        .collect();
    h.transport.push_frame(&encrypted);
    h.queue.run_pending();

    // Assert — session live, reply encrypted on the wire
    assert!(h.client.is_connected());
    let frames = h.transport.written_frames();
    assert_eq!(frames.len(), 1);
    let decrypted: Vec<u8> = frames[0].iter().map(|byte| byte ^ key).collect();
    let reply = HelloBack::decode(&decrypted).expect("valid HelloBack under the cipher");
    assert_eq!(reply.name, "laptop");

    // The IV plumbing reaches the live cipher layer.
    h.client.set_decrypt_iv(&[9, 8, 7]);
    let control = cipher.last_control().expect("layer was built");
    assert_eq!(control.decrypt_iv(), Some(vec![9, 8, 7]));

    // After teardown the weak handle is dead and the call is a no-op.
    h.client.disconnect(None);
    h.client.set_decrypt_iv(&[1]);
    assert_eq!(control.decrypt_iv(), Some(vec![9, 8, 7]));
}

// ── Invariants ────────────────────────────────────────────────────────────────

#[test]
fn test_proxy_presence_implies_stream_presence() {
    let h = Harness::new("laptop");

    let check = |h: &Harness| {
        let status = h.client.status();
        if status.connected {
            assert!(status.has_stream, "proxy without stream");
        }
    };

    check(&h);
    h.client.connect();
    check(&h);
    h.transport.accept();
    h.queue.run_pending();
    check(&h);
    h.transport
        .push_frame(&Hello { major: 1, minor: 6 }.encode());
    h.queue.run_pending();
    check(&h);
    h.client.disconnect(None);
    check(&h);
}

#[test]
fn test_reconnect_after_disconnect_starts_clean() {
    // Arrange — a full session with clipboard state, then teardown
    let h = Harness::new("laptop");
    h.connect_to_active();
    h.stage_clipboard(ClipboardId::Clipboard, 50, b"old session");
    h.screen.post_clipboard_grabbed(ClipboardId::Clipboard);
    h.queue.run_pending();
    assert!(h.client.status().clipboard[0].own);
    h.client.disconnect(None);
    h.transport.clear_written();

    // Act — second attempt
    h.client.connect();
    h.transport.accept();
    h.transport
        .push_frame(&Hello { major: 1, minor: 6 }.encode());
    h.queue.run_pending();

    // Assert — clipboard slate wiped, handshake repeated
    assert!(h.client.is_connected());
    let status = h.client.status();
    assert!(!status.clipboard[0].own && !status.clipboard[0].sent);
    assert_eq!(h.transport.written_frames().len(), 1);
    assert_eq!(h.proxy_log().lock().unwrap().created, 2);
}
