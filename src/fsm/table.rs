//! Dense transition table.
//!
//! ```text
//!              event id →  0 (NO_EVENT)  1          2          …
//!  ┌─────────┬────────────┬──────────┬──────────┬───┐
//!  │ state 0 │ None       │ Some(1)  │ None     │ … │
//!  │ state 1 │ None       │ None     │ Some(0)  │ … │
//!  │ …       │            │          │          │   │
//!  └─────────┴────────────┴──────────┴──────────┴───┘
//! ```
//!
//! Every state has a slot for every registered event; columns are added as
//! events are registered.

use super::StateId;
use crate::events::EventId;

pub struct TransitionTable {
    rows: Vec<Vec<Option<StateId>>>,
}

impl TransitionTable {
    pub fn new(num_states: usize) -> Self {
        Self {
            rows: vec![Vec::new(); num_states],
        }
    }

    pub fn num_states(&self) -> usize {
        self.rows.len()
    }

    /// Grow every row to hold `num_events` columns.
    pub fn ensure_events(&mut self, num_events: usize) {
        for row in &mut self.rows {
            if row.len() < num_events {
                row.resize(num_events, None);
            }
        }
    }

    pub fn lookup(&self, from: StateId, event: EventId) -> Option<StateId> {
        self.rows
            .get(from)
            .and_then(|row| row.get(event.index()))
            .copied()
            .flatten()
    }

    /// Insert `(from, event) -> to`.  Refuses to overwrite: returns the
    /// existing destination instead.
    pub fn insert(&mut self, from: StateId, event: EventId, to: StateId) -> Result<(), StateId> {
        let row = &mut self.rows[from];
        if row.len() <= event.index() {
            row.resize(event.index() + 1, None);
        }
        match row[event.index()] {
            Some(existing) => Err(existing),
            None => {
                row[event.index()] = Some(to);
                Ok(())
            }
        }
    }

    /// Number of declared `(from, event)` pairs.
    pub fn len(&self) -> usize {
        self.rows
            .iter()
            .map(|row| row.iter().filter(|slot| slot.is_some()).count())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
