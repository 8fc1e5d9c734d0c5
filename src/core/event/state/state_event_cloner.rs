// SPDX-License-Identifier: MIT OR Apache-2.0

use super::state_event_arena::{StateEventArena, StateEventId};
use crate::core::error::EventFluxResult;
use crate::core::event::stream::StreamEventCloner;

/// Deep-copies composite events inside an arena.
///
/// Bound flat events are copied through the [`StreamEventCloner`] so the copy
/// shares nothing with its source.
#[derive(Debug, Clone)]
pub struct StateEventCloner {
    stream_event_cloner: StreamEventCloner,
}

impl StateEventCloner {
    pub fn new(stream_event_cloner: StreamEventCloner) -> Self {
        Self {
            stream_event_cloner,
        }
    }

    /// Copy `source` into a fresh arena entry, keeping its logical id.
    pub fn copy_state_event(
        &self,
        arena: &mut StateEventArena,
        source: StateEventId,
    ) -> EventFluxResult<StateEventId> {
        let copy = self.copy_into_new(arena, source, usize::MAX)?;
        let id = arena.get(source)?.id;
        arena.get_mut(copy)?.id = id;
        Ok(copy)
    }

    /// Copy for an `every` re-arm: fresh id, slots from `clear_from_position`
    /// onward left empty so the new attempt starts clean at that step.
    ///
    /// ```text
    /// every (A -> B -> C), re-armed at B:
    ///   source [a1, b1, c1]  =>  copy [a1, -, -]
    /// ```
    pub fn copy_state_event_for_every(
        &self,
        arena: &mut StateEventArena,
        source: StateEventId,
        clear_from_position: usize,
    ) -> EventFluxResult<StateEventId> {
        self.copy_into_new(arena, source, clear_from_position)
    }

    fn copy_into_new(
        &self,
        arena: &mut StateEventArena,
        source: StateEventId,
        clear_from_position: usize,
    ) -> EventFluxResult<StateEventId> {
        arena.get(source)?;
        let copy = arena.borrow_event()?;
        if let Err(e) = self.fill(arena, source, copy, clear_from_position) {
            // Partially filled copy still owns whatever was bound so far
            arena.release(copy)?;
            return Err(e);
        }
        Ok(copy)
    }

    fn fill(
        &self,
        arena: &mut StateEventArena,
        source: StateEventId,
        target: StateEventId,
        clear_from_position: usize,
    ) -> EventFluxResult<()> {
        let (src, dst) = arena.pair_mut(source, target)?;
        dst.timestamp = src.timestamp;
        dst.event_type = src.event_type;
        dst.output_data.clone_from(&src.output_data);
        for (position, slot) in src.stream_events.iter().enumerate() {
            if position >= clear_from_position {
                break;
            }
            if let Some(stream_event) = slot {
                let copied = self.stream_event_cloner.copy_stream_event(stream_event)?;
                dst.set_event(position, copied)?;
            }
        }
        Ok(())
    }

    pub fn stream_event_cloner(&self) -> &StreamEventCloner {
        &self.stream_event_cloner
    }
}
