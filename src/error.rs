//! Unified error types for the state-model core.
//!
//! Registration and configuration mistakes are reported as [`ModelError`]
//! the moment they are made, never at runtime.  Events that simply have
//! nowhere to go are not errors at all (see [`crate::fsm`]).  Failures
//! raised by application callbacks are `anyhow::Error`s, logged and
//! isolated at the dispatch boundary.

use core::fmt;

use crate::drivers::timer::TimerId;
use crate::fsm::StateId;

// ---------------------------------------------------------------------------
// Model configuration errors
// ---------------------------------------------------------------------------

/// Every fallible registration or control operation funnels into this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// A model must have at least the initial state.
    NoStates,
    /// State index outside `0..num_states`.
    InvalidState { state: StateId, num_states: usize },
    /// The event name was never registered.
    UnknownEvent(String),
    /// Two input sources or timers share a name.
    DuplicateSource(String),
    /// A custom event collides with an already registered event.
    DuplicateEvent(String),
    /// `(from, event)` already maps to a destination.
    DuplicateTransition {
        from: StateId,
        event: String,
        existing: StateId,
    },
    /// `NO_EVENT` cannot be used as a source or custom event name.
    ReservedName,
    /// Name is empty, contains whitespace, or is too long.
    InvalidName(&'static str),
    /// The timer handle does not belong to this model.
    UnknownTimer(TimerId),
    /// The operation needs a running model.
    NotRunning,
    /// Sources, timers, events and transitions are registered while stopped.
    AlreadyRunning,
    /// Every `EventId` is taken.
    TooManyEvents,
    /// The event queue is full; the event was dropped.
    QueueFull(String),
    /// A timer rejected its arguments.
    Timer(TimerError),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoStates => write!(f, "model needs at least one state"),
            Self::InvalidState { state, num_states } => {
                write!(f, "invalid state {state} (model has {num_states} states)")
            }
            Self::UnknownEvent(name) => write!(f, "unknown event '{name}'"),
            Self::DuplicateSource(name) => write!(f, "duplicate source name '{name}'"),
            Self::DuplicateEvent(name) => write!(f, "duplicate event '{name}'"),
            Self::DuplicateTransition {
                from,
                event,
                existing,
            } => write!(
                f,
                "state {from} already transitions to {existing} on '{event}'"
            ),
            Self::ReservedName => write!(f, "name is reserved"),
            Self::InvalidName(why) => write!(f, "invalid name: {why}"),
            Self::UnknownTimer(id) => write!(f, "unknown timer {id:?}"),
            Self::NotRunning => write!(f, "model is not running"),
            Self::AlreadyRunning => write!(f, "model is running"),
            Self::TooManyEvents => write!(f, "event id space exhausted"),
            Self::QueueFull(name) => write!(f, "event queue full, dropped '{name}'"),
            Self::Timer(e) => write!(f, "timer: {e}"),
        }
    }
}

impl std::error::Error for ModelError {}

// ---------------------------------------------------------------------------
// Timer errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    /// Duration was negative, NaN or infinite.
    InvalidDuration,
}

impl fmt::Display for TimerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDuration => write!(f, "duration must be a finite, non-negative number"),
        }
    }
}

impl std::error::Error for TimerError {}

impl From<TimerError> for ModelError {
    fn from(e: TimerError) -> Self {
        Self::Timer(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from loading or persisting [`ModelConfig`](crate::config::ModelConfig).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A field failed range validation.
    ValidationFailed(&'static str),
    /// The stored representation could not be decoded.
    Parse(String),
    /// The configuration could not be encoded.
    Encode,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
            Self::Parse(msg) => write!(f, "parse error: {msg}"),
            Self::Encode => write!(f, "encode failed"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, ModelError>;
