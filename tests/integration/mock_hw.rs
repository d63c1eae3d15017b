//! Recording controller and simulated board for integration tests.
//!
//! Records every model callback so tests can assert on the full callback
//! history without a real board.

use picomodel::adapters::{ManualClock, SimPin};
use picomodel::ports::Clock;
use picomodel::{
    Button, Event, ModelConfig, ModelContext, ModelHandler, StateId, StateModel, TimerId,
};

// ── Callback record ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Entered { state: StateId, event: String },
    Left { state: StateId, event: String },
    Event { state: StateId, event: String },
    Do { state: StateId },
}

pub fn entered(state: StateId, event: &str) -> Call {
    Call::Entered {
        state,
        event: event.into(),
    }
}

pub fn left(state: StateId, event: &str) -> Call {
    Call::Left {
        state,
        event: event.into(),
    }
}

// ── RecordingController ───────────────────────────────────────

#[derive(Default)]
pub struct RecordingController {
    pub calls: Vec<Call>,
    /// `(state, event)` pairs accepted by `state_event`.
    pub handled: Vec<(StateId, &'static str)>,
    /// `state_event` stops the model on this event.
    pub stop_event: Option<&'static str>,
    /// Stop from `state_do` after this many iterations.
    pub stop_after_do: Option<usize>,
    /// Stop when this state is entered.
    pub stop_on_entry: Option<StateId>,
    /// Start a timer on entry to a state.
    pub timer_on_entry: Option<(StateId, TimerId, f32)>,
    /// `state_entered` fails for these states.
    pub failing: Vec<StateId>,
    pub record_do: bool,
    do_count: usize,
}

#[allow(dead_code)]
impl RecordingController {
    pub fn new() -> Self {
        Self::default()
    }

    /// States entered, in order.
    pub fn entries(&self) -> Vec<StateId> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Entered { state, .. } => Some(*state),
                _ => None,
            })
            .collect()
    }

    /// Entry and exit callbacks only, in order.
    pub fn transitions(&self) -> Vec<Call> {
        self.calls
            .iter()
            .filter(|c| matches!(c, Call::Entered { .. } | Call::Left { .. }))
            .cloned()
            .collect()
    }

    pub fn take(&mut self) -> Vec<Call> {
        core::mem::take(&mut self.calls)
    }

    pub fn do_count(&self) -> usize {
        self.do_count
    }
}

impl ModelHandler for RecordingController {
    fn state_entered(
        &mut self,
        state: StateId,
        event: Event<'_>,
        ctx: &mut ModelContext<'_>,
    ) -> anyhow::Result<()> {
        self.calls.push(Call::Entered {
            state,
            event: event.name().into(),
        });
        if let Some((s, timer, secs)) = self.timer_on_entry {
            if s == state {
                ctx.start_timer(timer, secs)?;
            }
        }
        if self.stop_on_entry == Some(state) {
            ctx.stop();
        }
        if self.failing.contains(&state) {
            anyhow::bail!("entry action for state {state} failed");
        }
        Ok(())
    }

    fn state_left(
        &mut self,
        state: StateId,
        event: Event<'_>,
        _ctx: &mut ModelContext<'_>,
    ) -> anyhow::Result<()> {
        self.calls.push(Call::Left {
            state,
            event: event.name().into(),
        });
        Ok(())
    }

    fn state_event(
        &mut self,
        state: StateId,
        event: Event<'_>,
        ctx: &mut ModelContext<'_>,
    ) -> anyhow::Result<bool> {
        self.calls.push(Call::Event {
            state,
            event: event.name().into(),
        });
        if self.stop_event.is_some_and(|name| event.is(name)) {
            ctx.stop();
            return Ok(true);
        }
        Ok(self
            .handled
            .iter()
            .any(|&(s, name)| s == state && event.is(name)))
    }

    fn state_do(&mut self, state: StateId, ctx: &mut ModelContext<'_>) -> anyhow::Result<()> {
        self.do_count += 1;
        if self.record_do {
            self.calls.push(Call::Do { state });
        }
        if self.stop_after_do.is_some_and(|n| self.do_count >= n) {
            ctx.stop();
        }
        Ok(())
    }
}

// ── Simulated board ───────────────────────────────────────────

/// A model with one push button, driven by a manual clock.
pub struct ButtonRig {
    pub model: StateModel<RecordingController>,
    pub clock: ManualClock,
    pub pin: SimPin,
    pub button: Button<SimPin>,
}

#[allow(dead_code)]
impl ButtonRig {
    pub fn new(num_states: usize) -> Self {
        let clock = ManualClock::new(0);
        let pin = SimPin::new(true);
        let mut button = Button::button(pin.clone(), "button1").unwrap();
        let mut model =
            StateModel::new(num_states, RecordingController::new(), ModelConfig::default())
                .unwrap();
        model.add_input_source(&mut button).unwrap();
        Self {
            model,
            clock,
            pin,
            button,
        }
    }

    /// Drive the pin to `pressed` and deliver the edge interrupt.
    pub fn set_pressed(&mut self, pressed: bool) {
        self.pin.set(!pressed);
        self.button.on_edge(self.clock.now_ms());
    }

    /// Press and release with a settled gap, advancing the clock.
    pub fn click(&mut self) {
        self.clock.advance(100);
        self.set_pressed(true);
        self.clock.advance(100);
        self.set_pressed(false);
    }
}
