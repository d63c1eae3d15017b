//! PicoModel: reactive event and state-machine core.
//!
//! Exposes the engine, drivers and port traits.  Board support supplies
//! implementations of the traits in [`ports`]; host implementations live in
//! [`adapters`] and back the demo binary and the test suite.

#![deny(unused_must_use)]

pub mod adapters;
pub mod config;
pub mod drivers;
pub mod error;
pub mod events;
pub mod fsm;
pub mod ports;
pub mod registry;

pub use config::ModelConfig;
pub use drivers::analog::AnalogSensor;
pub use drivers::button::{Button, DebouncedInput, DigitalSensor, Edge, SourceKind};
pub use drivers::timer::{Countdown, HardwareTimer, SoftwareTimer, TimerId};
pub use error::{ConfigError, ModelError, TimerError};
pub use events::{Event, EventId, NO_EVENT};
pub use fsm::{ModelContext, ModelHandler, StateId, StateModel};
