//! ISR-debounced digital inputs: buttons and digital sensors.
//!
//! ## Hardware
//!
//! A GPIO with an edge interrupt on both edges.  The platform ISR calls
//! [`DebouncedInput::on_edge`] with the current millisecond tick; the
//! input reads the pin, applies polarity, and runs the debounce filter.
//!
//! ## Debounce rule
//!
//! An edge is accepted only when **both** hold:
//!
//! | Condition    | Why                                                    |
//! |--------------|--------------------------------------------------------|
//! | settled      | `now - last_accepted >= window`                        |
//! | level change | logical level differs from the last accepted level     |
//!
//! Time alone is not enough: a slow contact can cross the threshold twice
//! in the same direction after the window has passed.
//!
//! Accepted edges are reported to the installed [`InputHandler`].  Buttons
//! report `press`/`release`, sensors report `trip`/`untrip`.

use std::sync::Arc;

use embedded_hal::digital::InputPin;
use log::{error, info, warn};

use crate::config::DEFAULT_DEBOUNCE_MS;
use crate::error::ModelError;
use crate::events::{event_name, EventName};
use crate::ports::InputHandler;

/// A debounced logical transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// Pressed / tripped.
    Asserted,
    /// Released / untripped.
    Deasserted,
}

/// What kind of device sits on the pin; decides the event suffixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Button,
    Sensor,
}

impl SourceKind {
    /// Event suffixes in `[asserted, deasserted]` order.
    pub const fn suffixes(self) -> [&'static str; 2] {
        match self {
            Self::Button => ["press", "release"],
            Self::Sensor => ["trip", "untrip"],
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Button => "Button",
            Self::Sensor => "Sensor",
        }
    }
}

// ---------------------------------------------------------------------------
// Debounce filter
// ---------------------------------------------------------------------------

/// Pure time-window + level-change filter.  No hardware, no callbacks.
#[derive(Debug, Clone, Copy)]
pub struct Debouncer {
    window_ms: u32,
    last_level: Option<bool>,
    last_accepted_ms: Option<u32>,
}

impl Debouncer {
    pub const fn new(window_ms: u32) -> Self {
        Self {
            window_ms,
            last_level: None,
            last_accepted_ms: None,
        }
    }

    pub const fn window_ms(&self) -> u32 {
        self.window_ms
    }

    pub fn set_window_ms(&mut self, window_ms: u32) {
        self.window_ms = window_ms;
    }

    /// Last accepted logical level, `None` before the first accepted edge.
    pub const fn level(&self) -> Option<bool> {
        self.last_level
    }

    /// Feed one raw observation.  Returns the accepted transition, if any.
    pub fn update(&mut self, level: bool, now_ms: u32) -> Option<Edge> {
        let settled = self
            .last_accepted_ms
            .is_none_or(|t| now_ms.wrapping_sub(t) >= self.window_ms);
        if !settled || self.last_level == Some(level) {
            return None;
        }

        self.last_accepted_ms = Some(now_ms);
        self.last_level = Some(level);
        Some(if level { Edge::Asserted } else { Edge::Deasserted })
    }
}

// ---------------------------------------------------------------------------
// Input source
// ---------------------------------------------------------------------------

/// A named, debounced digital input bound to one pin.
pub struct DebouncedInput<P> {
    pin: P,
    name: EventName,
    kind: SourceKind,
    low_active: bool,
    debouncer: Debouncer,
    handler: Option<Arc<dyn InputHandler>>,
}

/// Momentary push button; active-low with pull-up by default.
pub type Button<P> = DebouncedInput<P>;

/// Digital output sensor (PIR, tilt, LM393 comparator boards).
pub type DigitalSensor<P> = DebouncedInput<P>;

impl<P: InputPin> DebouncedInput<P> {
    pub fn new(pin: P, name: &str, kind: SourceKind, low_active: bool) -> Result<Self, ModelError> {
        let name = event_name(name)?;
        info!(
            "{} {}: created ({})",
            kind.label(),
            name,
            if low_active { "active low" } else { "active high" }
        );
        Ok(Self {
            pin,
            name,
            kind,
            low_active,
            debouncer: Debouncer::new(DEFAULT_DEBOUNCE_MS),
            handler: None,
        })
    }

    /// Active-low push button.
    pub fn button(pin: P, name: &str) -> Result<Self, ModelError> {
        Self::new(pin, name, SourceKind::Button, true)
    }

    pub fn digital_sensor(pin: P, name: &str, low_active: bool) -> Result<Self, ModelError> {
        Self::new(pin, name, SourceKind::Sensor, low_active)
    }

    /// Override the debounce window (builder style).
    pub fn with_debounce_ms(mut self, window_ms: u32) -> Self {
        self.debouncer.set_window_ms(window_ms);
        self
    }

    pub fn set_debounce_ms(&mut self, window_ms: u32) {
        self.debouncer.set_window_ms(window_ms);
    }

    pub fn debounce_ms(&self) -> u32 {
        self.debouncer.window_ms()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn is_low_active(&self) -> bool {
        self.low_active
    }

    /// Instantaneous polarity-corrected level.  A pin read error reads as
    /// not asserted.
    pub fn is_asserted(&mut self) -> bool {
        match self.pin.is_high() {
            Ok(high) => high != self.low_active,
            Err(e) => {
                warn!("{} {}: pin read failed: {:?}", self.kind.label(), self.name, e);
                false
            }
        }
    }

    /// Alias of [`is_asserted`](Self::is_asserted) for buttons.
    pub fn is_pressed(&mut self) -> bool {
        self.is_asserted()
    }

    /// Alias of [`is_asserted`](Self::is_asserted) for sensors.
    pub fn tripped(&mut self) -> bool {
        self.is_asserted()
    }

    /// Install a handler, or pass `None` to disarm edge delivery.
    pub fn set_handler(&mut self, handler: Option<Arc<dyn InputHandler>>) {
        self.handler = handler;
    }

    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    /// Edge interrupt entry point.  Call from the GPIO ISR on both edges.
    ///
    /// Returns the accepted transition, if any.  Never panics on handler
    /// failure: errors are logged here and go no further.
    pub fn on_edge(&mut self, now_ms: u32) -> Option<Edge> {
        let handler = self.handler.clone()?;

        let level = self.is_asserted();
        let edge = self.debouncer.update(level, now_ms)?;

        let result = match edge {
            Edge::Asserted => handler.on_asserted(&self.name),
            Edge::Deasserted => handler.on_deasserted(&self.name),
        };
        if let Err(e) = result {
            error!(
                "{} {}: handler failed on {:?}: {:#}",
                self.kind.label(),
                self.name,
                edge,
                e
            );
        }
        Some(edge)
    }

    /// Release the pin.
    pub fn into_pin(self) -> P {
        self.pin
    }
}
