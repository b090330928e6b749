//! Tick and command event queue.
//!
//! Events are produced by:
//! - Timer callbacks (control tick, sensor poll)
//! - The HTTP/WebSocket server task (incoming command)
//!
//! Events are consumed by the main control loop, which processes them one
//! at a time. The queue is a lock-free SPSC ring so the network task can
//! post `CommandReceived` between ticks without taking a lock.

use core::sync::atomic::{AtomicU8, Ordering};

/// Maximum number of pending events.
/// Power of 2 for efficient ring buffer modulo.
const EVENT_QUEUE_CAP: usize = 16;

/// System event types, ordered by rough priority.
/// Lower discriminant = higher priority when multiple events are pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Event {
    /// Periodic sensor poll timer fired (nominal 0.5 Hz).
    SensorPoll = 10,
    /// Control loop tick: state machine + thermostat (nominal 1 Hz).
    ControlTick = 20,
    /// Incoming command from the web layer.
    CommandReceived = 30,
}

// ── Lock-free SPSC ring buffer ────────────────────────────────
//
// Timer callbacks / the server task write (produce), the main loop reads
// (consume). Uses atomic head/tail indices. The buffer lives in a static
// so timer callbacks can reach it without a handle.

static EVENT_HEAD: AtomicU8 = AtomicU8::new(0);
static EVENT_TAIL: AtomicU8 = AtomicU8::new(0);
// SAFETY: EVENT_BUFFER is only touched through push_event/pop_event, which
// enforce the SPSC discipline with the acquire/release atomics above. One
// writer (timer/server context), one reader (main loop).
static mut EVENT_BUFFER: [u8; EVENT_QUEUE_CAP] = [0; EVENT_QUEUE_CAP];

/// Push an event into the queue.
/// Lock-free; safe to call from timer callback context.
/// Returns `false` if the queue is full (event dropped).
pub fn push_event(event: Event) -> bool {
    let head = EVENT_HEAD.load(Ordering::Relaxed);
    let tail = EVENT_TAIL.load(Ordering::Acquire);
    let next_head = (head + 1) % EVENT_QUEUE_CAP as u8;

    if next_head == tail {
        return false; // Queue full — drop event.
    }

    // SAFETY: single producer; the head index is published only after the
    // slot is written.
    unsafe {
        EVENT_BUFFER[head as usize] = event as u8;
    }

    EVENT_HEAD.store(next_head, Ordering::Release);
    true
}

/// Pop the next event from the queue.
/// Called from the main loop (single consumer).
/// Returns `None` if the queue is empty.
pub fn pop_event() -> Option<Event> {
    let tail = EVENT_TAIL.load(Ordering::Relaxed);
    let head = EVENT_HEAD.load(Ordering::Acquire);

    if tail == head {
        return None; // Empty.
    }

    let raw = unsafe { EVENT_BUFFER[tail as usize] };
    EVENT_TAIL.store((tail + 1) % EVENT_QUEUE_CAP as u8, Ordering::Release);

    event_from_u8(raw)
}

/// Drain all pending events into a callback, in FIFO order.
pub fn drain_events(mut handler: impl FnMut(Event)) {
    while let Some(event) = pop_event() {
        handler(event);
    }
}

/// Number of pending events.
pub fn queue_len() -> usize {
    let head = EVENT_HEAD.load(Ordering::Relaxed) as usize;
    let tail = EVENT_TAIL.load(Ordering::Relaxed) as usize;
    (head + EVENT_QUEUE_CAP - tail) % EVENT_QUEUE_CAP
}

// ── Internal ──────────────────────────────────────────────────

fn event_from_u8(raw: u8) -> Option<Event> {
    match raw {
        10 => Some(Event::SensorPoll),
        20 => Some(Event::ControlTick),
        30 => Some(Event::CommandReceived),
        _ => None,
    }
}
