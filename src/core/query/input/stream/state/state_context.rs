// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mutable per-context world handed down every processor chain.
//!
//! Processors never reach into each other. A step that advances, re-arms or
//! completes a match, or needs the start state reset, records it in the
//! context's [`Outbox`]; the runtime applies the outbox after each pre-state
//! processor has finished its pass over the pending list.

use crate::core::error::EventFluxResult;
use crate::core::event::state::{StateEventArena, StateEventCloner, StateEventId};
use crate::core::event::stream::{StreamEvent, StreamEventCloner};

/// Hand-off of a partial match to another step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateTransition {
    /// Move `event` into the staging list of step `target`.
    Advance { target: usize, event: StateEventId },
    /// Stage an independent copy of `event` at step `target`; `event` itself
    /// is not handed over.
    Every { target: usize, event: StateEventId },
}

/// Effects recorded during one pre-state processor pass, in record order.
#[derive(Debug, Default)]
pub struct Outbox {
    pub transitions: Vec<StateTransition>,
    pub completed: Vec<StateEventId>,
    pub reset_requests: Vec<usize>,
}

impl Outbox {
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty() && self.completed.is_empty() && self.reset_requests.is_empty()
    }

    pub fn clear(&mut self) {
        self.transitions.clear();
        self.completed.clear();
        self.reset_requests.clear();
    }
}

#[derive(Debug)]
pub struct StateContext {
    arena: StateEventArena,
    state_event_cloner: StateEventCloner,
    outbox: Outbox,
}

impl StateContext {
    pub fn new(arena: StateEventArena, stream_event_cloner: StreamEventCloner) -> Self {
        Self {
            arena,
            state_event_cloner: StateEventCloner::new(stream_event_cloner),
            outbox: Outbox::default(),
        }
    }

    pub fn arena(&self) -> &StateEventArena {
        &self.arena
    }

    pub fn arena_mut(&mut self) -> &mut StateEventArena {
        &mut self.arena
    }

    pub fn stream_event_cloner(&self) -> &StreamEventCloner {
        self.state_event_cloner.stream_event_cloner()
    }

    pub fn copy_stream_event(&self, source: &StreamEvent) -> EventFluxResult<StreamEvent> {
        self.stream_event_cloner().copy_stream_event(source)
    }

    /// Bind `stream_event` into slot `position`, releasing any previous occupant.
    pub fn bind_event(
        &mut self,
        event: StateEventId,
        position: usize,
        stream_event: StreamEvent,
    ) -> EventFluxResult<()> {
        if let Some(previous) = self.arena.get_mut(event)?.set_event(position, stream_event)? {
            self.state_event_cloner.stream_event_cloner().release(previous);
        }
        Ok(())
    }

    /// Clear slot `position`, releasing its flat event.
    pub fn unbind_event(&mut self, event: StateEventId, position: usize) -> EventFluxResult<()> {
        if let Some(previous) = self.arena.get_mut(event)?.take_event(position)? {
            self.state_event_cloner.stream_event_cloner().release(previous);
        }
        Ok(())
    }

    pub fn copy_state_event_for_every(
        &mut self,
        event: StateEventId,
        clear_from_position: usize,
    ) -> EventFluxResult<StateEventId> {
        self.state_event_cloner
            .copy_state_event_for_every(&mut self.arena, event, clear_from_position)
    }

    pub fn release_state_event(&mut self, event: StateEventId) -> EventFluxResult<()> {
        self.arena.release(event)
    }

    /// Release `event` unless it already went back to the arena.
    ///
    /// Used when abandoning a failed pass, where the same match can be
    /// referenced both by the failing step and by recorded transitions.
    pub fn release_if_live(&mut self, event: StateEventId) -> bool {
        if !self.arena.is_live(event) {
            return false;
        }
        self.arena.release(event).is_ok()
    }

    pub fn record_transition(&mut self, transition: StateTransition) {
        self.outbox.transitions.push(transition);
    }

    pub fn record_completion(&mut self, event: StateEventId) {
        self.outbox.completed.push(event);
    }

    /// Ask step `state_id` to restart its attempt at the next state update.
    pub fn request_reset(&mut self, state_id: usize) {
        self.outbox.reset_requests.push(state_id);
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    /// Exchange the recorded outbox with `other`, normally an empty one whose
    /// buffers are reused on the next pass.
    pub fn swap_outbox(&mut self, other: &mut Outbox) {
        std::mem::swap(&mut self.outbox, other);
    }
}

#[cfg(test)]
pub(crate) fn test_context(slots: usize) -> StateContext {
    use crate::core::event::state::StateEventFactory;
    use crate::core::event::stream::StreamEventPool;
    use std::sync::Arc;

    let pool = Arc::new(StreamEventPool::new(64));
    let arena = StateEventArena::new(StateEventFactory::new(slots, 0), 32, Arc::clone(&pool));
    StateContext::new(arena, StreamEventCloner::new(pool))
}
