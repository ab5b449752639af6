//! The queue itself: handler registry, FIFO dispatch, and one-shot timers.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use tracing::trace;

use super::{Event, EventKind, EventTarget};

/// A registered event handler.
///
/// Handlers are shared closures so the registry lock never has to be held
/// while one runs; dispatch clones the `Arc`, releases the lock, then calls.
pub type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

struct TimerEntry {
    deadline: Instant,
    target: EventTarget,
}

struct QueueState {
    pending: VecDeque<Event>,
    handlers: HashMap<(EventKind, EventTarget), Handler>,
    timers: Vec<TimerEntry>,
    next_target: u64,
    /// Virtual-time offset added to `Instant::now()` when checking timer
    /// deadlines.  Advanced by tests and simulations; zero in production.
    skew: Duration,
}

/// Serial event dispatcher with thread-safe posting.
///
/// See the [module docs](super) for the scheduling model.  The queue is
/// normally shared as an `Arc<EventQueue>` between the client, its stream
/// stack, and the screen.
pub struct EventQueue {
    state: Mutex<QueueState>,
    wakeup: Condvar,
}

impl EventQueue {
    /// Creates an empty queue.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(QueueState {
                pending: VecDeque::new(),
                handlers: HashMap::new(),
                timers: Vec::new(),
                next_target: 1,
                skew: Duration::ZERO,
            }),
            wakeup: Condvar::new(),
        })
    }

    /// Allocates a fresh routing target, never reused within a queue.
    pub fn next_target(&self) -> EventTarget {
        let mut state = self.lock();
        let target = EventTarget(state.next_target);
        state.next_target += 1;
        target
    }

    // ── Handler registry ─────────────────────────────────────────────────────

    /// Registers `handler` for events matching `(kind, target)`.
    ///
    /// Inserting over an existing registration replaces it; the previous
    /// handler is dropped.
    pub fn add_handler<F>(&self, kind: EventKind, target: EventTarget, handler: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.lock().handlers.insert((kind, target), Arc::new(handler));
    }

    /// Removes the handler registered for `(kind, target)`.
    ///
    /// Returns `false` when nothing was registered, which is normal on the
    /// idempotent teardown paths.
    pub fn remove_handler(&self, kind: EventKind, target: EventTarget) -> bool {
        self.lock().handlers.remove(&(kind, target)).is_some()
    }

    // ── Posting and timers ───────────────────────────────────────────────────

    /// Appends an event for later dispatch.  Callable from any thread,
    /// including from inside a running handler.
    pub fn post(&self, event: Event) {
        trace!(kind = ?event.kind, target = ?event.target, "event posted");
        self.lock().pending.push_back(event);
        self.wakeup.notify_one();
    }

    /// Schedules a one-shot timer that fires a `Timer` event at the returned
    /// target after `after` elapses.
    pub fn new_one_shot_timer(&self, after: Duration) -> EventTarget {
        let mut state = self.lock();
        let target = EventTarget(state.next_target);
        state.next_target += 1;
        let deadline = Instant::now() + after;
        state.timers.push(TimerEntry { deadline, target });
        drop(state);
        self.wakeup.notify_one();
        target
    }

    /// Cancels a pending one-shot timer.  Returns `false` when the timer has
    /// already fired or was cancelled before.
    pub fn delete_timer(&self, target: EventTarget) -> bool {
        let mut state = self.lock();
        let before = state.timers.len();
        state.timers.retain(|entry| entry.target != target);
        state.timers.len() != before
    }

    /// Shifts the queue's notion of "now" forward by `by`.
    ///
    /// Only deadline checks are affected.  Tests use this to expire long
    /// connect timers deterministically.
    pub fn advance(&self, by: Duration) {
        let mut state = self.lock();
        state.skew += by;
        drop(state);
        self.wakeup.notify_one();
    }

    // ── Dispatch ─────────────────────────────────────────────────────────────

    /// Dispatches the next ready event, firing any due timers first.
    ///
    /// Returns `false` when there is nothing to do.  An event without a
    /// registered handler is consumed silently.
    pub fn dispatch_one(&self) -> bool {
        let (event, handler) = {
            let mut state = self.lock();
            Self::promote_due_timers(&mut state);
            let Some(event) = state.pending.pop_front() else {
                return false;
            };
            let handler = state.handlers.get(&(event.kind, event.target)).cloned();
            (event, handler)
        };

        match handler {
            Some(handler) => handler(&event),
            None => trace!(kind = ?event.kind, target = ?event.target, "event dropped, no handler"),
        }
        true
    }

    /// Dispatches until the queue is idle; returns how many events ran.
    ///
    /// Events posted by handlers during this call are dispatched too.
    pub fn run_pending(&self) -> usize {
        let mut dispatched = 0;
        while self.dispatch_one() {
            dispatched += 1;
        }
        dispatched
    }

    /// Blocks until an event or due timer is available, or `timeout` passes.
    ///
    /// Returns `true` when there is something to dispatch.  This is the
    /// pump's idle wait; it never runs handlers itself.
    pub fn wait(&self, timeout: Duration) -> bool {
        let overall_deadline = Instant::now() + timeout;
        let mut state = self.lock();
        loop {
            if !state.pending.is_empty() || Self::next_due(&state).is_some() {
                return true;
            }
            let now = Instant::now();
            if now >= overall_deadline {
                return false;
            }
            let mut sleep = overall_deadline - now;
            if let Some(deadline) = state.timers.iter().map(|t| t.deadline).min() {
                let effective = deadline.checked_sub(state.skew).unwrap_or(now);
                sleep = sleep.min(effective.saturating_duration_since(now));
            }
            // A zero sleep means a timer is due at the skewed "now".
            if sleep.is_zero() {
                return true;
            }
            let (guard, _) = self
                .wakeup
                .wait_timeout(state, sleep)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            state = guard;
        }
    }

    // ── Internals ────────────────────────────────────────────────────────────

    fn lock(&self) -> std::sync::MutexGuard<'_, QueueState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Index of the earliest timer whose deadline has passed in skewed time.
    fn next_due(state: &QueueState) -> Option<usize> {
        let now = Instant::now() + state.skew;
        state
            .timers
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.deadline <= now)
            .min_by_key(|(_, entry)| entry.deadline)
            .map(|(index, _)| index)
    }

    /// Converts every due timer into a queued `Timer` event, earliest first.
    fn promote_due_timers(state: &mut QueueState) {
        while let Some(index) = Self::next_due(state) {
            let entry = state.timers.swap_remove(index);
            state
                .pending
                .push_back(Event::new(EventKind::Timer, entry.target));
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
