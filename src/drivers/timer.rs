//! One-shot timeout sources.
//!
//! Two variants behind the [`Countdown`] trait:
//!
//! - [`SoftwareTimer`]: polled.  `check()` must be called once per
//!   control-loop iteration; the model does this for every registered
//!   timer.  Works anywhere a [`Clock`](crate::ports::Clock) exists.
//! - [`HardwareTimer`]: arms a [`OneShotAlarm`]; the alarm callback runs
//!   asynchronously and fires the handler without the control loop.
//!
//! Both fire `on_timeout(name)` exactly once per `start()` unless
//! cancelled first.  `cancel()` is idempotent and `start()` always
//! supersedes a pending countdown.

use core::cell::RefCell;
use core::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use critical_section::Mutex;
use log::{error, info};

use crate::error::{ModelError, TimerError};
use crate::events::{event_name, EventName};
use crate::ports::{OneShotAlarm, SharedClock, TimerHandler};

/// Handle to a timer owned by a [`StateModel`](crate::fsm::StateModel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(pub(crate) usize);

/// Common timer contract.
pub trait Countdown: Send {
    fn name(&self) -> &str;

    /// Start (or restart) a countdown of `seconds`.
    fn start(&mut self, seconds: f32) -> Result<(), TimerError>;

    /// Stop without firing.  Idempotent.
    fn cancel(&mut self);

    fn is_running(&self) -> bool;

    /// Configured duration of the pending countdown; `0.0` when idle.
    fn duration_secs(&self) -> f32;

    fn set_handler(&mut self, handler: Option<Arc<dyn TimerHandler>>);

    /// Poll for expiry.  No-op for timers that fire on their own.
    fn check(&mut self) {}
}

fn duration_ms(seconds: f32) -> Result<u32, TimerError> {
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(TimerError::InvalidDuration);
    }
    Ok((seconds * 1000.0).round().min(u32::MAX as f32) as u32)
}

fn notify(handler: Option<&Arc<dyn TimerHandler>>, name: &str) {
    if let Some(h) = handler {
        if let Err(e) = h.on_timeout(name) {
            error!("Timer {}: timeout handler failed: {:#}", name, e);
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Polled variant
// ═══════════════════════════════════════════════════════════════

pub struct SoftwareTimer {
    name: EventName,
    clock: SharedClock,
    handler: Option<Arc<dyn TimerHandler>>,
    started_ms: u32,
    duration_ms: u32,
    seconds: f32,
    running: bool,
}

impl SoftwareTimer {
    pub fn new(name: &str, clock: SharedClock) -> Result<Self, ModelError> {
        Ok(Self {
            name: event_name(name)?,
            clock,
            handler: None,
            started_ms: 0,
            duration_ms: 0,
            seconds: 0.0,
            running: false,
        })
    }

    /// Milliseconds left before expiry; `None` when idle.
    pub fn remaining_ms(&self) -> Option<u32> {
        self.running.then(|| {
            let elapsed = self.clock.now_ms().wrapping_sub(self.started_ms);
            self.duration_ms.saturating_sub(elapsed)
        })
    }
}

impl Countdown for SoftwareTimer {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&mut self, seconds: f32) -> Result<(), TimerError> {
        self.duration_ms = duration_ms(seconds)?;
        self.seconds = seconds;
        self.started_ms = self.clock.now_ms();
        self.running = true;
        info!("Timer {}: started for {} sec", self.name, seconds);
        Ok(())
    }

    fn cancel(&mut self) {
        if self.running {
            info!("Timer {}: {} sec timer cancelled", self.name, self.seconds);
        }
        self.running = false;
        self.started_ms = 0;
        self.duration_ms = 0;
        self.seconds = 0.0;
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn duration_secs(&self) -> f32 {
        self.seconds
    }

    fn set_handler(&mut self, handler: Option<Arc<dyn TimerHandler>>) {
        self.handler = handler;
    }

    fn check(&mut self) {
        if !self.running {
            return;
        }
        let elapsed = self.clock.now_ms().wrapping_sub(self.started_ms);
        if elapsed < self.duration_ms {
            return;
        }
        info!("Timer {}: {} sec timer is up", self.name, self.seconds);
        self.running = false;
        self.duration_ms = 0;
        self.seconds = 0.0;
        notify(self.handler.as_ref(), &self.name);
    }
}

// ═══════════════════════════════════════════════════════════════
//  Alarm-driven variant
// ═══════════════════════════════════════════════════════════════

/// State shared between the owner and the pending alarm callback.
struct AlarmShared {
    name: EventName,
    /// Generation of the pending countdown, or [`IDLE`]. A callback claims
    /// its own generation with one compare-exchange, so a stale callback
    /// can never consume a newer countdown.
    armed: AtomicU32,
    handler: Mutex<RefCell<Option<Arc<dyn TimerHandler>>>>,
}

impl AlarmShared {
    /// Alarm callback body.
    fn expire(&self, armed_generation: u32) {
        if self
            .armed
            .compare_exchange(armed_generation, IDLE, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        info!("Timer {}: alarm fired", self.name);
        let handler = critical_section::with(|cs| self.handler.borrow(cs).borrow().clone());
        notify(handler.as_ref(), &self.name);
    }
}

const IDLE: u32 = 0;

pub struct HardwareTimer<A> {
    alarm: A,
    shared: Arc<AlarmShared>,
    /// Last generation handed out; never [`IDLE`].
    generation: u32,
    seconds: f32,
}

impl<A: OneShotAlarm> HardwareTimer<A> {
    pub fn new(name: &str, alarm: A) -> Result<Self, ModelError> {
        Ok(Self {
            alarm,
            shared: Arc::new(AlarmShared {
                name: event_name(name)?,
                armed: AtomicU32::new(IDLE),
                handler: Mutex::new(RefCell::new(None)),
            }),
            generation: IDLE,
            seconds: 0.0,
        })
    }

    fn next_generation(&mut self) -> u32 {
        self.generation = match self.generation.wrapping_add(1) {
            IDLE => 1,
            g => g,
        };
        self.generation
    }
}

impl<A: OneShotAlarm> Countdown for HardwareTimer<A> {
    fn name(&self) -> &str {
        &self.shared.name
    }

    fn start(&mut self, seconds: f32) -> Result<(), TimerError> {
        let period = duration_ms(seconds)?;
        self.alarm.disarm();
        let armed = self.next_generation();
        self.seconds = seconds;
        self.shared.armed.store(armed, Ordering::Release);

        let shared = Arc::clone(&self.shared);
        self.alarm
            .arm(period, Box::new(move || shared.expire(armed)));
        info!("Timer {}: alarm armed for {} sec", self.shared.name, seconds);
        Ok(())
    }

    fn cancel(&mut self) {
        if self.shared.armed.swap(IDLE, Ordering::AcqRel) != IDLE {
            self.alarm.disarm();
            info!("Timer {}: {} sec alarm cancelled", self.shared.name, self.seconds);
        }
        self.seconds = 0.0;
    }

    fn is_running(&self) -> bool {
        self.shared.armed.load(Ordering::Acquire) != IDLE
    }

    fn duration_secs(&self) -> f32 {
        if self.is_running() { self.seconds } else { 0.0 }
    }

    fn set_handler(&mut self, handler: Option<Arc<dyn TimerHandler>>) {
        critical_section::with(|cs| *self.shared.handler.borrow(cs).borrow_mut() = handler);
    }
}
