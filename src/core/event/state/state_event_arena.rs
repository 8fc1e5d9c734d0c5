// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-context arena of composite events.
//!
//! Partial matches are referred to by [`StateEventId`] index rather than by
//! pointer. Pending and staging lists, chunks and outboxes all carry ids; the
//! arena is the single owner. Indices are recycled through a free list and the
//! number of live entries is bounded by the configured capacity.
//!
//! Releasing an entry returns every flat event it binds to the shared
//! [`StreamEventPool`].

use super::state_event::StateEvent;
use super::state_event_factory::StateEventFactory;
use crate::core::error::{EventFluxError, EventFluxResult};
use crate::core::event::complex_event::ComplexEventType;
use crate::core::event::stream::StreamEventPool;
use std::fmt;
use std::sync::Arc;

pub const STATE_EVENT_POOL: &str = "state_event";

/// Index of a composite event inside a [`StateEventArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateEventId(u32);

impl StateEventId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for StateEventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug)]
struct ArenaEntry {
    event: StateEvent,
    live: bool,
}

#[derive(Debug)]
pub struct StateEventArena {
    entries: Vec<ArenaEntry>,
    free: Vec<u32>,
    capacity: usize,
    live: usize,
    factory: StateEventFactory,
    stream_pool: Arc<StreamEventPool>,
}

impl StateEventArena {
    pub fn new(factory: StateEventFactory, capacity: usize, stream_pool: Arc<StreamEventPool>) -> Self {
        let capacity = capacity.min(u32::MAX as usize);
        Self {
            entries: Vec::new(),
            free: Vec::new(),
            capacity,
            live: 0,
            factory,
            stream_pool,
        }
    }

    /// Hand out a zero-initialized composite event with a fresh id.
    pub fn borrow_event(&mut self) -> EventFluxResult<StateEventId> {
        let index = match self.free.pop() {
            Some(index) => {
                let entry = &mut self.entries[index as usize];
                entry.event.id = StateEvent::next_id();
                entry.live = true;
                index
            }
            None => {
                if self.entries.len() >= self.capacity {
                    return Err(EventFluxError::pool_exhausted(STATE_EVENT_POOL, self.capacity));
                }
                self.entries.push(ArenaEntry {
                    event: self.factory.new_instance(),
                    live: true,
                });
                (self.entries.len() - 1) as u32
            }
        };
        self.live += 1;
        Ok(StateEventId(index))
    }

    /// Return an entry, handing its bound flat events back to the stream pool.
    pub fn release(&mut self, id: StateEventId) -> EventFluxResult<()> {
        let stream_pool = &self.stream_pool;
        let entry = match self.entries.get_mut(id.index()) {
            Some(entry) if entry.live => entry,
            _ => return Err(Self::stale(id)),
        };
        entry.live = false;
        let event = &mut entry.event;
        for slot in event.stream_events.iter_mut() {
            if let Some(stream_event) = slot.take() {
                stream_pool.release(stream_event);
            }
        }
        event.timestamp = -1;
        event.event_type = ComplexEventType::Current;
        event.output_data.fill(Default::default());
        self.free.push(id.0);
        self.live -= 1;
        Ok(())
    }

    pub fn get(&self, id: StateEventId) -> EventFluxResult<&StateEvent> {
        match self.entries.get(id.index()) {
            Some(entry) if entry.live => Ok(&entry.event),
            _ => Err(Self::stale(id)),
        }
    }

    pub fn get_mut(&mut self, id: StateEventId) -> EventFluxResult<&mut StateEvent> {
        Ok(&mut self.live_entry_mut(id)?.event)
    }

    /// Shared access to `source` together with mutable access to `target`.
    pub fn pair_mut(
        &mut self,
        source: StateEventId,
        target: StateEventId,
    ) -> EventFluxResult<(&StateEvent, &mut StateEvent)> {
        if source == target {
            return Err(EventFluxError::invariant_violation(format!(
                "composite event {source} cannot be copied onto itself"
            )));
        }
        self.get(source)?;
        self.get(target)?;
        let (s, t) = (source.index(), target.index());
        if s < t {
            let (head, tail) = self.entries.split_at_mut(t);
            Ok((&head[s].event, &mut tail[0].event))
        } else {
            let (head, tail) = self.entries.split_at_mut(s);
            Ok((&tail[0].event, &mut head[t].event))
        }
    }

    /// Whether `id` currently refers to a borrowed entry.
    pub fn is_live(&self, id: StateEventId) -> bool {
        self.entries.get(id.index()).is_some_and(|entry| entry.live)
    }

    pub fn live_count(&self) -> usize {
        self.live
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stream_event_size(&self) -> usize {
        self.factory.stream_event_size
    }

    pub fn stream_pool(&self) -> &Arc<StreamEventPool> {
        &self.stream_pool
    }

    fn live_entry_mut(&mut self, id: StateEventId) -> EventFluxResult<&mut ArenaEntry> {
        match self.entries.get_mut(id.index()) {
            Some(entry) if entry.live => Ok(entry),
            _ => Err(Self::stale(id)),
        }
    }

    fn stale(id: StateEventId) -> EventFluxError {
        EventFluxError::invariant_violation(format!(
            "composite event {id} is not live in this arena"
        ))
    }
}

impl Drop for StateEventArena {
    fn drop(&mut self) {
        for entry in self.entries.iter_mut().filter(|entry| entry.live) {
            for slot in entry.event.stream_events.iter_mut() {
                if let Some(stream_event) = slot.take() {
                    self.stream_pool.release(stream_event);
                }
            }
        }
    }
}
