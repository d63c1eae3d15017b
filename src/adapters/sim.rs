//! Simulated peripherals for host runs and tests.
//!
//! Clones share state, so a test (or a simulation thread) keeps one
//! handle to drive the level while the driver under test owns another.

use core::convert::Infallible;
use core::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::Arc;

use embedded_hal::digital::{ErrorType, InputPin};

use crate::ports::AnalogInput;

/// Digital input whose level is set by hand.
#[derive(Clone, Default)]
pub struct SimPin {
    high: Arc<AtomicBool>,
}

impl SimPin {
    pub fn new(high: bool) -> Self {
        Self {
            high: Arc::new(AtomicBool::new(high)),
        }
    }

    pub fn set(&self, high: bool) {
        self.high.store(high, Ordering::Release);
    }

    pub fn set_high(&self) {
        self.set(true);
    }

    pub fn set_low(&self) {
        self.set(false);
    }

    pub fn level(&self) -> bool {
        self.high.load(Ordering::Acquire)
    }
}

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl InputPin for SimPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.level())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.level())
    }
}

/// 16-bit ADC channel whose reading is set by hand.
#[derive(Clone, Default)]
pub struct SimAnalog {
    value: Arc<AtomicU16>,
}

impl SimAnalog {
    pub fn new(value: u16) -> Self {
        Self {
            value: Arc::new(AtomicU16::new(value)),
        }
    }

    pub fn set(&self, value: u16) {
        self.value.store(value, Ordering::Release);
    }
}

impl AnalogInput for SimAnalog {
    fn read_u16(&mut self) -> u16 {
        self.value.load(Ordering::Acquire)
    }
}
