//! Port traits: the boundary between the state-model core and hardware.
//!
//! ```text
//!   GPIO ISR ──▶ DebouncedInput ──▶ InputHandler ──┐
//!   Alarm ISR ─▶ HardwareTimer  ──▶ TimerHandler ──┼──▶ event queue ──▶ StateModel
//!   ADC poll ──▶ AnalogSensor   ──▶ InputHandler ──┘
//! ```
//!
//! Digital pins come in through `embedded_hal::digital::InputPin`.  The
//! rest of the hardware the core needs (a millisecond clock, a one-shot
//! alarm, an ADC channel) is described here so the core never touches a
//! peripheral directly.  Host adapters live in [`crate::adapters`].

use std::sync::Arc;

// ───────────────────────────────────────────────────────────────
// Time
// ───────────────────────────────────────────────────────────────

/// Monotonic millisecond tick source.  Wraps at `u32::MAX`; callers
/// compare instants with `wrapping_sub`.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u32;
}

/// Shared clock handle, cloned into every timed component.
pub type SharedClock = Arc<dyn Clock>;

// ───────────────────────────────────────────────────────────────
// Source callbacks (interrupt side)
// ───────────────────────────────────────────────────────────────

/// Receives debounced level changes from an input source.
///
/// Called from interrupt context: implementations must be short and must
/// not block.  Errors are logged by the caller and never propagate into
/// the interrupt dispatcher.
pub trait InputHandler: Send + Sync {
    /// Button pressed / sensor tripped.
    fn on_asserted(&self, name: &str) -> anyhow::Result<()>;

    /// Button released / sensor untripped.
    fn on_deasserted(&self, name: &str) -> anyhow::Result<()>;
}

/// Receives countdown expiry from a timer.
pub trait TimerHandler: Send + Sync {
    fn on_timeout(&self, name: &str) -> anyhow::Result<()>;
}

// ───────────────────────────────────────────────────────────────
// Peripherals
// ───────────────────────────────────────────────────────────────

/// A 16-bit ADC channel.
pub trait AnalogInput {
    fn read_u16(&mut self) -> u16;
}

/// Callback run once when a [`OneShotAlarm`] expires.
pub type AlarmCallback = Box<dyn FnOnce() + Send + 'static>;

/// A hardware one-shot alarm.  `arm` replaces any pending alarm; the
/// callback runs asynchronously (interrupt or timer-task context).
pub trait OneShotAlarm: Send {
    fn arm(&mut self, period_ms: u32, callback: AlarmCallback);

    /// Cancel a pending alarm.  Idempotent.
    fn disarm(&mut self);
}

/// A source the control loop samples once per iteration (as opposed to an
/// edge-interrupt source).  The model owns these after registration.
pub trait PolledInput: Send {
    /// Source name, used to derive its event names.
    fn name(&self) -> &str;

    /// Install or clear the callback target.
    fn set_handler(&mut self, handler: Option<Arc<dyn InputHandler>>);

    /// Sample the source and report a change of its asserted state.
    fn poll(&mut self);
}
