//! Name registry for sources, timers and custom events.
//!
//! Every event the transition table can reference is registered here first
//! and receives a dense [`EventId`].  Id 0 is always [`NO_EVENT`].

use log::{debug, warn};

use crate::error::{ModelError, Result};
use crate::events::{event_name, source_event_name, Event, EventId, EventName, NO_EVENT};

pub struct EventRegistry {
    /// Indexed by `EventId`.
    events: Vec<EventName>,
    /// Names of registered sources and timers.
    sources: Vec<EventName>,
}

impl Default for EventRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EventRegistry {
    pub fn new() -> Self {
        let mut none = EventName::new();
        // NO_EVENT fits in MAX_NAME_LEN.
        let _ = none.push_str(NO_EVENT);
        Self {
            events: vec![none],
            sources: Vec::new(),
        }
    }

    /// Register a source (button, sensor, timer) and one event per suffix.
    ///
    /// Either every event is registered or none is.
    pub fn register_source<const N: usize>(
        &mut self,
        source: &str,
        suffixes: [&str; N],
    ) -> Result<[EventId; N]> {
        let name = checked_name(source)?;
        if self.sources.iter().any(|s| s.as_str() == source) {
            return Err(ModelError::DuplicateSource(source.into()));
        }
        self.ensure_room(N)?;

        let mut names: [EventName; N] = core::array::from_fn(|_| EventName::new());
        for (slot, suffix) in names.iter_mut().zip(suffixes) {
            let full = source_event_name(source, suffix)?;
            if self.lookup(&full).is_some() {
                return Err(ModelError::DuplicateEvent(full.as_str().into()));
            }
            *slot = full;
        }

        self.sources.push(name);
        let first = self.events.len();
        for full in names {
            debug!("EventRegistry: '{}' -> {}", full, self.events.len());
            self.events.push(full);
        }
        Ok(core::array::from_fn(|i| EventId::from_index(first + i)))
    }

    /// Register an application-declared event not tied to any source.
    pub fn register_custom(&mut self, name: &str) -> Result<EventId> {
        let stored = checked_name(name)?;
        if self.lookup(name).is_some() {
            return Err(ModelError::DuplicateEvent(name.into()));
        }
        self.ensure_room(1)?;
        let id = EventId::from_index(self.events.len());
        debug!("EventRegistry: custom '{}' -> {}", name, id.index());
        self.events.push(stored);
        Ok(id)
    }

    pub fn lookup(&self, name: &str) -> Option<EventId> {
        self.events
            .iter()
            .position(|e| e.as_str() == name)
            .map(EventId::from_index)
    }

    /// Like [`lookup`](Self::lookup) but an unknown name is an error.
    pub fn resolve(&self, name: &str) -> Result<EventId> {
        self.lookup(name)
            .ok_or_else(|| ModelError::UnknownEvent(name.into()))
    }

    /// Name for `id`; unknown ids read as `"?"`.
    pub fn name(&self, id: EventId) -> &str {
        self.events.get(id.index()).map_or("?", |n| n.as_str())
    }

    pub fn event(&self, id: EventId) -> Event<'_> {
        Event::new(id, self.name(id))
    }

    pub fn contains(&self, id: EventId) -> bool {
        id.index() < self.events.len()
    }

    /// Number of registered events, `NO_EVENT` included.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.len() <= 1
    }

    pub fn has_source(&self, name: &str) -> bool {
        self.sources.iter().any(|s| s.as_str() == name)
    }

    fn ensure_room(&self, count: usize) -> Result<()> {
        if self.events.len() + count > EventId::CAPACITY {
            warn!("EventRegistry: no ids left for {} more event(s)", count);
            return Err(ModelError::TooManyEvents);
        }
        Ok(())
    }
}

fn checked_name(name: &str) -> Result<EventName> {
    if name == NO_EVENT {
        return Err(ModelError::ReservedName);
    }
    event_name(name)
}
