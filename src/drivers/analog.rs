//! Polled analog threshold sensor (LDR, force, thermistor boards).
//!
//! The ADC is read once per control-loop iteration.  The sensor is
//! *tripped* when the reading is below the threshold (`low_active`) or
//! above it (high active).  Only changes of the tripped flag are reported,
//! as `trip` / `untrip`.

use std::sync::Arc;

use log::{error, info};

use crate::error::ModelError;
use crate::events::{event_name, EventName};
use crate::ports::{AnalogInput, InputHandler, PolledInput};

/// Mid-scale default threshold for a 16-bit ADC reading.
pub const DEFAULT_THRESHOLD: u16 = 30_000;

pub struct AnalogSensor<A> {
    input: A,
    name: EventName,
    threshold: u16,
    low_active: bool,
    last_tripped: bool,
    handler: Option<Arc<dyn InputHandler>>,
}

impl<A: AnalogInput> AnalogSensor<A> {
    pub fn new(input: A, name: &str, threshold: u16, low_active: bool) -> Result<Self, ModelError> {
        let name = event_name(name)?;
        info!(
            "AnalogSensor {}: threshold {} ({})",
            name,
            threshold,
            if low_active { "trips below" } else { "trips above" }
        );
        Ok(Self {
            input,
            name,
            threshold,
            low_active,
            last_tripped: false,
            handler: None,
        })
    }

    pub fn raw_value(&mut self) -> u16 {
        self.input.read_u16()
    }

    pub fn threshold(&self) -> u16 {
        self.threshold
    }

    pub fn set_threshold(&mut self, threshold: u16) {
        self.threshold = threshold;
    }

    pub fn tripped(&mut self) -> bool {
        let v = self.raw_value();
        if self.low_active {
            v < self.threshold
        } else {
            v > self.threshold
        }
    }
}

impl<A: AnalogInput + Send> PolledInput for AnalogSensor<A> {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_handler(&mut self, handler: Option<Arc<dyn InputHandler>>) {
        self.handler = handler;
    }

    fn poll(&mut self) {
        let tripped = self.tripped();
        if tripped == self.last_tripped {
            return;
        }
        self.last_tripped = tripped;

        let Some(handler) = self.handler.as_ref() else {
            return;
        };
        let result = if tripped {
            handler.on_asserted(&self.name)
        } else {
            handler.on_deasserted(&self.name)
        };
        if let Err(e) = result {
            error!("AnalogSensor {}: handler failed: {:#}", self.name, e);
        }
    }
}
