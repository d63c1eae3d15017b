//! Interrupt-safe event delivery.
//!
//! Events are produced by:
//! - GPIO ISRs (debounced button / digital sensor edges)
//! - Alarm callbacks (hardware one-shot timers)
//! - The control loop itself (polled timers, polled analog sensors)
//! - Application code (custom events posted from callbacks or other tasks)
//!
//! Every producer pushes a small [`EventId`] token into one bounded queue.
//! Only the control loop consumes it, so the transition table and the
//! current state are mutated on a single logical thread.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ GPIO ISR    │────▶│              │     │              │
//! │ Alarm ISR   │────▶│  EventQueue  │────▶│ Control loop │
//! │ Polled srcs │────▶│  (bounded)   │     │  (consumer)  │
//! │ Application │────▶│              │     │              │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```

use core::fmt::{self, Write as _};
use std::sync::Arc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};

use crate::error::ModelError;
use crate::ports::{InputHandler, TimerHandler};

/// Longest source or event name, in bytes.
pub const MAX_NAME_LEN: usize = 32;

/// Maximum number of pending events.
pub const EVENT_QUEUE_CAP: usize = 32;

/// Name of the reserved epsilon pseudo-event.
pub const NO_EVENT: &str = "NO_EVENT";

/// Fixed-capacity name storage shared by sources, timers and events.
pub type EventName = heapless::String<MAX_NAME_LEN>;

/// Validate and copy a name into fixed storage.
pub fn event_name(name: &str) -> Result<EventName, ModelError> {
    if name.is_empty() {
        return Err(ModelError::InvalidName("name is empty"));
    }
    if name.chars().any(char::is_whitespace) {
        return Err(ModelError::InvalidName("name contains whitespace"));
    }
    let mut out = EventName::new();
    out.push_str(name)
        .map_err(|_| ModelError::InvalidName("name too long"))?;
    Ok(out)
}

/// Build the canonical `"{source}_{suffix}"` event name.
pub fn source_event_name(source: &str, suffix: &str) -> Result<EventName, ModelError> {
    let mut out = EventName::new();
    write!(out, "{source}_{suffix}").map_err(|_| ModelError::InvalidName("name too long"))?;
    Ok(out)
}

// ── Event identity ────────────────────────────────────────────

/// Dense event code assigned by the [`EventRegistry`](crate::registry::EventRegistry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(u16);

impl EventId {
    /// The epsilon pseudo-event, generated once per loop iteration.
    pub const NONE: Self = Self(0);

    /// Number of distinct ids, `NONE` included.
    pub const CAPACITY: usize = u16::MAX as usize + 1;

    /// `index` must be below [`CAPACITY`](Self::CAPACITY); the registry
    /// refuses registrations past that.
    pub(crate) const fn from_index(index: usize) -> Self {
        Self(index as u16)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

/// An event as seen by model callbacks: its id plus its registered name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event<'a> {
    id: EventId,
    name: &'a str,
}

impl<'a> Event<'a> {
    pub(crate) const fn new(id: EventId, name: &'a str) -> Self {
        Self { id, name }
    }

    pub const fn id(&self) -> EventId {
        self.id
    }

    pub const fn name(&self) -> &'a str {
        self.name
    }

    /// True if this is the named event.
    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }

    /// True for the epsilon pseudo-event (state entry on `start`, exit on `stop`).
    pub const fn is_none(&self) -> bool {
        self.id.is_none()
    }
}

impl fmt::Display for Event<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

// ── Queue ─────────────────────────────────────────────────────

type EventChannel = Channel<CriticalSectionRawMutex, EventId, EVENT_QUEUE_CAP>;

/// Consumer side, owned by the model.
pub struct EventQueue {
    channel: Arc<EventChannel>,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EventQueue {
    pub fn new() -> Self {
        Self {
            channel: Arc::new(Channel::new()),
        }
    }

    /// A producer handle.  Cheap to clone; safe to use from interrupt context.
    pub fn sender(&self) -> EventSender {
        EventSender {
            channel: Arc::clone(&self.channel),
        }
    }

    /// Pop the next event in FIFO order.
    pub fn pop(&self) -> Option<EventId> {
        self.channel.try_receive().ok()
    }

    /// Drop every pending event.
    pub fn clear(&self) {
        while self.channel.try_receive().is_ok() {}
    }
}

/// Producer side of the [`EventQueue`].
#[derive(Clone)]
pub struct EventSender {
    channel: Arc<EventChannel>,
}

impl EventSender {
    /// Push an event.  Lock-free from the caller's point of view (a short
    /// critical section).  Returns `false` if the queue is full and the
    /// event was dropped.
    pub fn post(&self, id: EventId) -> bool {
        match self.channel.try_send(id) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => false,
        }
    }
}

// ── Forwarders ────────────────────────────────────────────────
//
// The model installs one of these as the handler of each registered
// source.  They turn a named callback into a queued event id and do
// nothing else, which keeps the interrupt path short.

/// Routes a source's asserted/deasserted callbacks into the queue.
pub struct SourceForwarder {
    name: EventName,
    asserted: EventId,
    deasserted: EventId,
    sender: EventSender,
}

impl SourceForwarder {
    pub fn new(name: EventName, asserted: EventId, deasserted: EventId, sender: EventSender) -> Self {
        Self {
            name,
            asserted,
            deasserted,
            sender,
        }
    }

    fn forward(&self, name: &str, id: EventId, suffix: &str) -> anyhow::Result<()> {
        if name != self.name.as_str() {
            anyhow::bail!("forwarder for '{}' called for '{name}'", self.name);
        }
        if !self.sender.post(id) {
            anyhow::bail!("event queue full, dropped {name}_{suffix}");
        }
        Ok(())
    }
}

impl InputHandler for SourceForwarder {
    fn on_asserted(&self, name: &str) -> anyhow::Result<()> {
        self.forward(name, self.asserted, "asserted")
    }

    fn on_deasserted(&self, name: &str) -> anyhow::Result<()> {
        self.forward(name, self.deasserted, "deasserted")
    }
}

/// Routes a timer's expiry into the queue.
pub struct TimeoutForwarder {
    name: EventName,
    timeout: EventId,
    sender: EventSender,
}

impl TimeoutForwarder {
    pub fn new(name: EventName, timeout: EventId, sender: EventSender) -> Self {
        Self {
            name,
            timeout,
            sender,
        }
    }
}

impl TimerHandler for TimeoutForwarder {
    fn on_timeout(&self, name: &str) -> anyhow::Result<()> {
        if name != self.name.as_str() {
            anyhow::bail!("forwarder for '{}' called for '{name}'", self.name);
        }
        if !self.sender.post(self.timeout) {
            anyhow::bail!("event queue full, dropped {name}_timeout");
        }
        Ok(())
    }
}
