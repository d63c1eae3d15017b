//! Event-driven finite state machine engine.
//!
//! ```text
//!  ISR / alarm                     control loop (single thread)
//!  ───────────                     ────────────────────────────
//!  DebouncedInput ─┐               ┌── step() ─────────────────────────┐
//!  HardwareTimer ──┼─► EventQueue ─┤ 1. state_do(current)              │
//!  ModelContext ───┘   (32 ids)    │ 2. process_event(NO_EVENT)        │
//!                                  │ 3. poll sensors, check timers     │
//!                                  │ 4. drain queue → process_event    │
//!                                  └───────────────────────────────────┘
//! ```
//!
//! `process_event` looks the event up in the transition table for the
//! current state.  A mapped event runs `state_left(current)`, updates the
//! current pointer, then runs `state_entered(next)`.  An unmapped event is
//! offered to `state_event`; if that declines, the event is dropped.
//!
//! States are plain indices `0..num_states`; state 0 is the initial state.
//! Callbacks never see the model itself, only a [`ModelContext`].

pub mod context;
pub mod table;

use core::time::Duration;
use std::sync::Arc;
use std::thread;

use embedded_hal::digital::InputPin;
use log::{error, info, log, warn, Level};

pub use context::ModelContext;
use table::TransitionTable;

use crate::config::ModelConfig;
use crate::drivers::button::{DebouncedInput, SourceKind};
use crate::drivers::timer::{Countdown, TimerId};
use crate::error::{ModelError, Result};
use crate::events::{
    event_name, Event, EventId, EventQueue, EventSender, SourceForwarder, TimeoutForwarder,
    EVENT_QUEUE_CAP,
};
use crate::ports::PolledInput;
use crate::registry::EventRegistry;

/// Index of a state; `0` is the initial state.
pub type StateId = usize;

/// Application callbacks.  All default to doing nothing.
///
/// Errors are logged by the engine and do not abort the transition or
/// the loop.
pub trait ModelHandler {
    /// `state` was entered because of `event` (`NO_EVENT` on start).
    fn state_entered(
        &mut self,
        _state: StateId,
        _event: Event<'_>,
        _ctx: &mut ModelContext<'_>,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    /// `state` is being left because of `event` (`NO_EVENT` on stop).
    fn state_left(
        &mut self,
        _state: StateId,
        _event: Event<'_>,
        _ctx: &mut ModelContext<'_>,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    /// An event with no transition from `state`.  Return `true` if handled.
    fn state_event(
        &mut self,
        _state: StateId,
        _event: Event<'_>,
        _ctx: &mut ModelContext<'_>,
    ) -> anyhow::Result<bool> {
        Ok(false)
    }

    /// Called once per loop iteration while in `state`.
    fn state_do(&mut self, _state: StateId, _ctx: &mut ModelContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Everything a callback may touch through its [`ModelContext`].
struct Core {
    registry: EventRegistry,
    timers: Vec<Box<dyn Countdown>>,
    sender: EventSender,
    current: Option<StateId>,
    stop_requested: bool,
}

/// The state machine engine.  Owns the application handler, the event
/// registry, the transition table, every polled sensor and every timer.
pub struct StateModel<H> {
    handler: H,
    table: TransitionTable,
    core: Core,
    sensors: Vec<Box<dyn PolledInput>>,
    queue: EventQueue,
    config: ModelConfig,
    running: bool,
}

impl<H: ModelHandler> StateModel<H> {
    pub fn new(num_states: usize, handler: H, config: ModelConfig) -> Result<Self> {
        if num_states == 0 {
            return Err(ModelError::NoStates);
        }
        let registry = EventRegistry::new();
        let mut table = TransitionTable::new(num_states);
        table.ensure_events(registry.len());
        let queue = EventQueue::new();

        Ok(Self {
            handler,
            table,
            core: Core {
                registry,
                timers: Vec::new(),
                sender: queue.sender(),
                current: None,
                stop_requested: false,
            },
            sensors: Vec::new(),
            queue,
            config,
            running: false,
        })
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Declare `from --event--> to` for every event in `events`.
    ///
    /// Nothing is inserted unless every entry is valid.
    pub fn add_transition(&mut self, from: StateId, events: &[&str], to: StateId) -> Result<()> {
        self.ensure_stopped()?;
        self.check_state(from)?;
        self.check_state(to)?;

        let mut ids: Vec<EventId> = Vec::with_capacity(events.len());
        for &name in events {
            let id = self.core.registry.resolve(name)?;
            let existing = self
                .table
                .lookup(from, id)
                .or_else(|| ids.contains(&id).then_some(to));
            if let Some(existing) = existing {
                return Err(ModelError::DuplicateTransition {
                    from,
                    event: name.into(),
                    existing,
                });
            }
            ids.push(id);
        }

        for id in ids {
            if let Err(existing) = self.table.insert(from, id, to) {
                return Err(ModelError::DuplicateTransition {
                    from,
                    event: self.core.registry.name(id).into(),
                    existing,
                });
            }
            log!(
                self.level(),
                "StateModel: transition {} --{}--> {}",
                from,
                self.core.registry.name(id),
                to
            );
        }
        Ok(())
    }

    /// Register a button or digital sensor.  Its edges are routed into the
    /// event queue as `{name}_press`/`{name}_release` (buttons) or
    /// `{name}_trip`/`{name}_untrip` (sensors).
    ///
    /// The input takes the model's configured debounce window.
    pub fn add_input_source<P: InputPin>(
        &mut self,
        source: &mut DebouncedInput<P>,
    ) -> Result<[EventId; 2]> {
        self.ensure_stopped()?;
        let ids = self
            .core
            .registry
            .register_source(source.name(), source.kind().suffixes())?;
        self.table.ensure_events(self.core.registry.len());

        let forwarder = SourceForwarder::new(
            event_name(source.name())?,
            ids[0],
            ids[1],
            self.core.sender.clone(),
        );
        source.set_debounce_ms(self.config.debounce_ms);
        source.set_handler(Some(Arc::new(forwarder)));
        info!(
            "StateModel: {} '{}' registered",
            source.kind().label(),
            source.name()
        );
        Ok(ids)
    }

    /// Register a sensor the loop polls every iteration (analog thresholds).
    pub fn add_polled_sensor(
        &mut self,
        mut sensor: impl PolledInput + 'static,
    ) -> Result<[EventId; 2]> {
        self.ensure_stopped()?;
        let ids = self
            .core
            .registry
            .register_source(sensor.name(), SourceKind::Sensor.suffixes())?;
        self.table.ensure_events(self.core.registry.len());

        let forwarder = SourceForwarder::new(
            event_name(sensor.name())?,
            ids[0],
            ids[1],
            self.core.sender.clone(),
        );
        sensor.set_handler(Some(Arc::new(forwarder)));
        info!("StateModel: polled sensor '{}' registered", sensor.name());
        self.sensors.push(Box::new(sensor));
        Ok(ids)
    }

    /// Register a timer; its expiry is the `{name}_timeout` event.
    pub fn add_timer(&mut self, mut timer: impl Countdown + 'static) -> Result<TimerId> {
        self.ensure_stopped()?;
        let [timeout] = self
            .core
            .registry
            .register_source(timer.name(), ["timeout"])?;
        self.table.ensure_events(self.core.registry.len());

        let forwarder =
            TimeoutForwarder::new(event_name(timer.name())?, timeout, self.core.sender.clone());
        timer.set_handler(Some(Arc::new(forwarder)));
        info!("StateModel: timer '{}' registered", timer.name());

        let id = TimerId(self.core.timers.len());
        self.core.timers.push(Box::new(timer));
        Ok(id)
    }

    /// Register an application event, raised with [`post_event`](Self::post_event)
    /// or [`ModelContext::post`].
    pub fn add_custom_event(&mut self, name: &str) -> Result<EventId> {
        self.ensure_stopped()?;
        let id = self.core.registry.register_custom(name)?;
        self.table.ensure_events(self.core.registry.len());
        Ok(id)
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Enter the initial state.  Restarts a running model.
    pub fn start(&mut self) {
        if self.running {
            self.stop();
        }
        self.queue.clear();
        self.core.stop_requested = false;
        self.running = true;
        self.core.current = Some(0);
        info!(
            "StateModel: starting ({} states, {} events)",
            self.table.num_states(),
            self.core.registry.len()
        );
        self.enter(0, EventId::NONE);
        self.apply_pending_stop();
    }

    /// Leave the current state and stop.  Cancels every timer.  No-op when
    /// already stopped.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        if let Some(state) = self.core.current {
            self.leave(state, EventId::NONE);
        }
        self.running = false;
        self.core.current = None;
        self.core.stop_requested = false;
        for timer in &mut self.core.timers {
            timer.cancel();
        }
        info!("StateModel: stopped");
    }

    /// Jump to `state` as if `event` had been mapped to it.
    pub fn goto_state(&mut self, state: StateId, event: EventId) -> Result<()> {
        self.check_state(state)?;
        if !self.running {
            return Err(ModelError::NotRunning);
        }
        if !self.core.registry.contains(event) {
            return Err(ModelError::UnknownEvent(format!("#{}", event.index())));
        }
        self.transition(state, event);
        self.apply_pending_stop();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Event processing
    // -----------------------------------------------------------------------

    /// Route one event.  Ignored while stopped.
    pub fn process_event(&mut self, event: EventId) {
        let Some(state) = self.core.current.filter(|_| self.running) else {
            return;
        };
        if !self.core.registry.contains(event) {
            warn!("StateModel: ignoring unregistered event #{}", event.index());
            return;
        }

        if let Some(next) = self.table.lookup(state, event) {
            self.transition(next, event);
        } else if !event.is_none() {
            let handled = self.dispatch(event, |h, ev, ctx| h.state_event(state, ev, ctx));
            match handled {
                Ok(true) => log!(
                    self.level(),
                    "StateModel: state {} handled {}",
                    state,
                    self.core.registry.name(event)
                ),
                Ok(false) => log!(
                    self.level(),
                    "StateModel: state {} ignored {}",
                    state,
                    self.core.registry.name(event)
                ),
                Err(e) => error!(
                    "StateModel: state_event({}, {}) failed: {:#}",
                    state,
                    self.core.registry.name(event),
                    e
                ),
            }
        }
        self.apply_pending_stop();
    }

    /// [`process_event`](Self::process_event) by name.
    pub fn process_named(&mut self, name: &str) -> Result<()> {
        let id = self.core.registry.resolve(name)?;
        self.process_event(id);
        Ok(())
    }

    /// Queue a registered event for the next drain.
    pub fn post_event(&self, name: &str) -> Result<()> {
        let id = self.core.registry.resolve(name)?;
        if !self.core.sender.post(id) {
            warn!("StateModel: event queue full, dropped '{}'", name);
            return Err(ModelError::QueueFull(name.into()));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Control loop
    // -----------------------------------------------------------------------

    /// One loop iteration.  Does nothing while stopped.
    pub fn step(&mut self) {
        let Some(state) = self.current_state() else {
            return;
        };

        if let Err(e) = self.dispatch(EventId::NONE, |h, _, ctx| h.state_do(state, ctx)) {
            error!("StateModel: state_do({}) failed: {:#}", state, e);
        }
        if self.apply_pending_stop() {
            return;
        }

        self.process_event(EventId::NONE);
        if !self.running {
            return;
        }

        for sensor in &mut self.sensors {
            sensor.poll();
        }
        for timer in &mut self.core.timers {
            timer.check();
        }

        // At most EVENT_QUEUE_CAP events per step, including any posted
        // by callbacks during this drain.
        for _ in 0..EVENT_QUEUE_CAP {
            let Some(event) = self.queue.pop() else {
                break;
            };
            self.process_event(event);
            if !self.running {
                return;
            }
        }
    }

    /// Start, then step until stopped, sleeping `poll_interval` between
    /// iterations (no sleep when zero).
    pub fn run(&mut self, poll_interval: Duration) {
        self.start();
        while self.running {
            self.step();
            if self.running && !poll_interval.is_zero() {
                thread::sleep(poll_interval);
            }
        }
    }

    /// [`run`](Self::run) with the configured poll interval.
    pub fn run_with_config(&mut self) {
        let interval = Duration::from_millis(u64::from(self.config.poll_interval_ms));
        self.run(interval);
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// `None` while stopped.
    pub fn current_state(&self) -> Option<StateId> {
        self.core.current.filter(|_| self.running)
    }

    /// Current state as an index, `-1` while stopped.
    pub fn current_index(&self) -> i32 {
        self.current_state()
            .and_then(|s| i32::try_from(s).ok())
            .unwrap_or(-1)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn num_states(&self) -> usize {
        self.table.num_states()
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// Producer handle for code outside the loop (interrupts, other threads).
    pub fn sender(&self) -> EventSender {
        self.core.sender.clone()
    }

    pub fn registry(&self) -> &EventRegistry {
        &self.core.registry
    }

    pub fn event_id(&self, name: &str) -> Option<EventId> {
        self.core.registry.lookup(name)
    }

    pub fn timer_id(&self, name: &str) -> Option<TimerId> {
        self.core
            .timers
            .iter()
            .position(|t| t.name() == name)
            .map(TimerId)
    }

    pub fn timer_running(&self, id: TimerId) -> bool {
        self.core.timers.get(id.0).is_some_and(|t| t.is_running())
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn level(&self) -> Level {
        if self.config.debug {
            Level::Info
        } else {
            Level::Trace
        }
    }

    fn ensure_stopped(&self) -> Result<()> {
        if self.running {
            return Err(ModelError::AlreadyRunning);
        }
        Ok(())
    }

    fn check_state(&self, state: StateId) -> Result<()> {
        if state >= self.table.num_states() {
            return Err(ModelError::InvalidState {
                state,
                num_states: self.table.num_states(),
            });
        }
        Ok(())
    }

    /// Run one handler callback with a context borrowed from `core`.
    fn dispatch<R>(
        &mut self,
        event: EventId,
        f: impl FnOnce(&mut H, Event<'_>, &mut ModelContext<'_>) -> R,
    ) -> R {
        let Core {
            registry,
            timers,
            sender,
            current,
            stop_requested,
        } = &mut self.core;
        let registry: &EventRegistry = registry;
        let mut ctx = ModelContext {
            state: *current,
            registry,
            timers: timers.as_mut_slice(),
            sender,
            stop_requested,
        };
        f(&mut self.handler, registry.event(event), &mut ctx)
    }

    fn enter(&mut self, state: StateId, event: EventId) {
        if let Err(e) = self.dispatch(event, |h, ev, ctx| h.state_entered(state, ev, ctx)) {
            error!("StateModel: state_entered({}) failed: {:#}", state, e);
        }
    }

    fn leave(&mut self, state: StateId, event: EventId) {
        if let Err(e) = self.dispatch(event, |h, ev, ctx| h.state_left(state, ev, ctx)) {
            error!("StateModel: state_left({}) failed: {:#}", state, e);
        }
    }

    fn transition(&mut self, next: StateId, event: EventId) {
        let Some(prev) = self.core.current else {
            return;
        };
        log!(
            self.level(),
            "StateModel: {} -> {} on {}",
            prev,
            next,
            self.core.registry.name(event)
        );
        self.leave(prev, event);
        self.core.current = Some(next);
        self.enter(next, event);
    }

    /// Apply a stop requested through [`ModelContext::stop`].
    fn apply_pending_stop(&mut self) -> bool {
        if !self.core.stop_requested {
            return false;
        }
        self.core.stop_requested = false;
        self.stop();
        true
    }
}
