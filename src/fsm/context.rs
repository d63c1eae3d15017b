//! Control surface handed to every [`ModelHandler`](super::ModelHandler) callback.
//!
//! Callbacks cannot reach the model directly (it is busy dispatching
//! them).  Instead they get a `ModelContext` that can start and cancel
//! the model's timers, queue custom events, and request a stop.  Queued
//! events and stop requests take effect after the running callback chain
//! returns, never in the middle of a transition.

use log::warn;

use super::StateId;
use crate::drivers::timer::{Countdown, TimerId};
use crate::error::{ModelError, Result};
use crate::events::{EventId, EventSender};
use crate::registry::EventRegistry;

pub struct ModelContext<'a> {
    pub(super) state: Option<StateId>,
    pub(super) registry: &'a EventRegistry,
    pub(super) timers: &'a mut [Box<dyn Countdown>],
    pub(super) sender: &'a EventSender,
    pub(super) stop_requested: &'a mut bool,
}

impl ModelContext<'_> {
    /// The state whose callback is running (`None` once stopped).
    pub fn current_state(&self) -> Option<StateId> {
        self.state
    }

    // -- Timers --

    pub fn start_timer(&mut self, id: TimerId, seconds: f32) -> Result<()> {
        self.timer_mut(id)?.start(seconds)?;
        Ok(())
    }

    pub fn cancel_timer(&mut self, id: TimerId) -> Result<()> {
        self.timer_mut(id)?.cancel();
        Ok(())
    }

    pub fn timer_running(&self, id: TimerId) -> bool {
        self.timers.get(id.0).is_some_and(|t| t.is_running())
    }

    /// Look a timer up by name.
    pub fn timer_id(&self, name: &str) -> Option<TimerId> {
        self.timers
            .iter()
            .position(|t| t.name() == name)
            .map(TimerId)
    }

    fn timer_mut(&mut self, id: TimerId) -> Result<&mut Box<dyn Countdown>> {
        self.timers.get_mut(id.0).ok_or(ModelError::UnknownTimer(id))
    }

    // -- Events --

    /// Queue a registered event; it is processed after the current callback
    /// chain completes.
    pub fn post(&mut self, name: &str) -> Result<()> {
        let id = self.registry.resolve(name)?;
        self.post_id(id)
    }

    pub fn post_id(&mut self, id: EventId) -> Result<()> {
        if !self.sender.post(id) {
            let name = self.registry.name(id);
            warn!("StateModel: event queue full, dropped '{}'", name);
            return Err(ModelError::QueueFull(name.into()));
        }
        Ok(())
    }

    pub fn event_id(&self, name: &str) -> Option<EventId> {
        self.registry.lookup(name)
    }

    // -- Lifecycle --

    /// Ask the model to stop once the current callback returns.
    pub fn stop(&mut self) {
        *self.stop_requested = true;
    }

    pub fn stop_requested(&self) -> bool {
        *self.stop_requested
    }
}
