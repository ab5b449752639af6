//! Cooperative event queue shared by the client and its collaborators.
//!
//! Everything that happens to the client — a transport finishing its dial, a
//! frame becoming readable, the local screen grabbing a clipboard, a power
//! suspend — arrives as an [`Event`] posted to one [`EventQueue`].  Handlers
//! are registered under an `(EventKind, EventTarget)` key and invoked
//! serially by whichever thread pumps the queue, so state transitions never
//! race each other.
//!
//! Posting is thread-safe: producer threads (a socket reader, a platform
//! notification hook) may call [`EventQueue::post`] at any time.  Dispatch is
//! not re-entrant; events posted while a handler runs are appended and picked
//! up on the next pump iteration.
//!
//! One-shot timers are scheduled deadlines inside the queue rather than
//! blocking sleeps.  [`EventQueue::advance`] shifts the queue's notion of
//! "now" forward, which lets tests expire a 15-second connect timer without
//! waiting for one.

mod queue;

pub use queue::EventQueue;

use crate::clipboard::ClipboardId;
use crate::input::GameDeviceId;

// ── Targets and kinds ─────────────────────────────────────────────────────────

/// Opaque routing identity for event subscription.
///
/// A target says *whose* event this is: each stream stack, screen, and timer
/// gets its own target, and handlers are keyed by `(kind, target)` so two
/// streams never see each other's traffic.  Allocate with
/// [`EventQueue::next_target`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventTarget(pub(crate) u64);

/// Every event kind that travels through the queue.
///
/// The set is closed: stream and screen collaborators, the connect timer, and
/// the client's three public lifecycle notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // Stream / transport surface.
    StreamConnected,
    StreamConnectFailed,
    StreamDisconnected,
    InputReady,
    OutputError,
    InputShutdown,
    OutputShutdown,
    // Screen surface.
    ShapeChanged,
    ClipboardGrabbed,
    Suspend,
    Resume,
    GameDeviceTimingResp,
    GameDeviceFeedback,
    // Client lifecycle, published to the screen's target.
    Connected,
    ConnectionFailed,
    Disconnected,
    // One-shot timers, targeted at the handle from `new_one_shot_timer`.
    Timer,
}

// ── Payloads ──────────────────────────────────────────────────────────────────

/// Payload of a `ConnectionFailed` (or `StreamConnectFailed`) event.
///
/// Ownership transfers to the subscriber together with the event value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailInfo {
    /// Human-readable reason, suitable for logging or display.
    pub message: String,
    /// Advisory flag: the caller may retry the connection attempt.
    pub retry: bool,
}

impl FailInfo {
    /// Creates a failure payload with `retry` set, the normal client case.
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retry: true,
        }
    }
}

/// Typed payload attached to an [`Event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventData {
    None,
    /// Why a dial or a session fell over.
    Failure(FailInfo),
    /// Which clipboard slot a `ClipboardGrabbed` event refers to.
    Clipboard(ClipboardId),
    /// Polling frequency reported by a `GameDeviceTimingResp`.
    GameDeviceTiming(u32),
    /// Force-feedback motor values reported by a `GameDeviceFeedback`.
    GameDeviceFeedback { id: GameDeviceId, m1: u16, m2: u16 },
}

/// A single queued occurrence: what happened, to whom, with what payload.
#[derive(Debug, Clone)]
pub struct Event {
    pub kind: EventKind,
    pub target: EventTarget,
    pub data: EventData,
}

impl Event {
    /// An event with no payload.
    pub fn new(kind: EventKind, target: EventTarget) -> Self {
        Self {
            kind,
            target,
            data: EventData::None,
        }
    }

    /// An event carrying a payload.
    pub fn with_data(kind: EventKind, target: EventTarget, data: EventData) -> Self {
        Self { kind, target, data }
    }

    /// Convenience accessor for failure payloads.
    pub fn failure(&self) -> Option<&FailInfo> {
        match &self.data {
            EventData::Failure(info) => Some(info),
            _ => None,
        }
    }
}
