//! PicoModel host demo.
//!
//! Runs the template controller against simulated peripherals:
//!
//! ```text
//!            button1_press                 pir_trip / ldr_trip
//!   ┌──────┐ ───────────► ┌──────────┐    ┌──────────┐
//!   │ 0    │              │ 1 lit    │    │ 2 alarm  │
//!   │ idle │ ◄─────────── │ (timer1) │    │          │
//!   └──────┘ timer1_timeout└──────────┘    └──────────┘
//!      ▲                                        │
//!      └────────── pir_untrip / ldr_untrip ─────┘
//! ```
//!
//! A simulation thread presses the button, trips both sensors and finally
//! posts `shutdown`, which state 0 handles in-state by stopping the model.
//!
//! Set `PICOMODEL_CONFIG` to a JSON file to override [`ModelConfig`];
//! `RUST_LOG` controls verbosity.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};

use picomodel::adapters::{SimAnalog, SimPin, SystemClock, ThreadAlarm};
use picomodel::drivers::analog::DEFAULT_THRESHOLD;
use picomodel::events::EventSender;
use picomodel::ports::SharedClock;
use picomodel::{
    AnalogSensor, Button, DebouncedInput, DigitalSensor, Event, EventId, HardwareTimer,
    ModelConfig, ModelContext, ModelHandler, StateId, StateModel, TimerId,
};

const IDLE: StateId = 0;
const LIT: StateId = 1;
const ALARM: StateId = 2;

const LIT_SECS: f32 = 2.0;

struct Controller {
    timer1: Option<TimerId>,
}

impl ModelHandler for Controller {
    fn state_entered(
        &mut self,
        state: StateId,
        event: Event<'_>,
        ctx: &mut ModelContext<'_>,
    ) -> anyhow::Result<()> {
        info!("entered state {} on {}", state, event);
        if state == LIT {
            let timer = self.timer1.context("timer1 not registered")?;
            ctx.start_timer(timer, LIT_SECS)?;
        }
        Ok(())
    }

    fn state_left(
        &mut self,
        state: StateId,
        event: Event<'_>,
        ctx: &mut ModelContext<'_>,
    ) -> anyhow::Result<()> {
        info!("left state {} on {}", state, event);
        if state == LIT {
            if let Some(timer) = self.timer1 {
                ctx.cancel_timer(timer)?;
            }
        }
        Ok(())
    }

    fn state_event(
        &mut self,
        state: StateId,
        event: Event<'_>,
        ctx: &mut ModelContext<'_>,
    ) -> anyhow::Result<bool> {
        if event.is("shutdown") {
            info!("shutdown requested in state {}", state);
            ctx.stop();
            return Ok(true);
        }
        Ok(false)
    }
}

fn load_config() -> Result<ModelConfig> {
    match std::env::var("PICOMODEL_CONFIG") {
        Ok(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {path}"))?;
            Ok(ModelConfig::from_json(&json)?)
        }
        Err(_) => Ok(ModelConfig::default()),
    }
}

/// Deliver an edge interrupt to a shared input.
fn edge(input: &Mutex<DebouncedInput<SimPin>>, clock: &SharedClock) {
    match input.lock() {
        Ok(mut input) => {
            input.on_edge(clock.now_ms());
        }
        Err(_) => warn!("sim: input lock poisoned"),
    }
}

struct Stimulus {
    button_pin: SimPin,
    button: Arc<Mutex<Button<SimPin>>>,
    pir_pin: SimPin,
    pir: Arc<Mutex<DigitalSensor<SimPin>>>,
    ldr: SimAnalog,
    clock: SharedClock,
    sender: EventSender,
    shutdown: EventId,
}

impl Stimulus {
    fn run(self) {
        let pause = |ms| thread::sleep(Duration::from_millis(ms));

        pause(500);
        info!("sim: button1 pressed");
        self.button_pin.set_low();
        edge(&self.button, &self.clock);
        pause(120);
        self.button_pin.set_high();
        edge(&self.button, &self.clock);

        // Let timer1 bring the model back to idle.
        pause(u64::from((LIT_SECS * 1_000.0) as u32) + 500);

        info!("sim: pir tripped");
        self.pir_pin.set_high();
        edge(&self.pir, &self.clock);
        pause(500);
        self.pir_pin.set_low();
        edge(&self.pir, &self.clock);
        pause(500);

        info!("sim: ldr tripped");
        self.ldr.set(DEFAULT_THRESHOLD + 10_000);
        pause(500);
        self.ldr.set(0);
        pause(500);

        info!("sim: shutdown");
        if !self.sender.post(self.shutdown) {
            warn!("sim: event queue full, shutdown dropped");
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = load_config()?;
    info!("PicoModel demo starting ({:?})", config);

    let clock: SharedClock = Arc::new(SystemClock::new());
    let mut model = StateModel::new(3, Controller { timer1: None }, config)?;

    let button_pin = SimPin::new(true);
    let mut button = Button::button(button_pin.clone(), "button1")?;
    model.add_input_source(&mut button)?;

    let pir_pin = SimPin::new(false);
    let mut pir = DigitalSensor::digital_sensor(pir_pin.clone(), "pir", false)?;
    model.add_input_source(&mut pir)?;

    let ldr = SimAnalog::new(0);
    model.add_polled_sensor(AnalogSensor::new(ldr.clone(), "ldr", DEFAULT_THRESHOLD, false)?)?;

    let timer1 = model.add_timer(HardwareTimer::new("timer1", ThreadAlarm::new())?)?;
    model.handler_mut().timer1 = Some(timer1);
    let shutdown = model.add_custom_event("shutdown")?;

    model.add_transition(IDLE, &["button1_press"], LIT)?;
    model.add_transition(LIT, &["timer1_timeout"], IDLE)?;
    model.add_transition(IDLE, &["pir_trip", "ldr_trip"], ALARM)?;
    model.add_transition(ALARM, &["pir_untrip", "ldr_untrip"], IDLE)?;

    let stimulus = Stimulus {
        button_pin,
        button: Arc::new(Mutex::new(button)),
        pir_pin,
        pir: Arc::new(Mutex::new(pir)),
        ldr,
        clock,
        sender: model.sender(),
        shutdown,
    };
    let sim = thread::Builder::new()
        .name("sim".into())
        .spawn(move || stimulus.run())
        .context("spawning simulation thread")?;

    model.run_with_config();

    if sim.join().is_err() {
        warn!("simulation thread panicked");
    }
    info!("PicoModel demo finished");
    Ok(())
}
