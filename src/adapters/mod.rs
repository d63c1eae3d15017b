//! Host adapters for the port traits.
//!
//! On a board these are replaced by the HAL's GPIO, ADC, alarm and tick
//! counter; on the host they back the demo binary and the test suite.

pub mod alarm;
pub mod sim;
pub mod time;

pub use alarm::ThreadAlarm;
pub use sim::{SimAnalog, SimPin};
pub use time::{ManualClock, SystemClock};
