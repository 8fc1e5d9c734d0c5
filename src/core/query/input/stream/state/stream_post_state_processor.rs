// SPDX-License-Identifier: MIT OR Apache-2.0

// src/core/query/input/stream/state/stream_post_state_processor.rs
// Terminal processor of a step's chain: decides where an accepted match goes

use super::state_context::{StateContext, StateTransition};
use crate::core::error::{EventFluxError, EventFluxResult};
use crate::core::event::complex_event::ComplexEventChunk;
use crate::core::event::state::StateEventId;
use crate::core::query::processor::{Processor, StepOutcome};
use std::sync::Arc;

/// Routing of matches accepted at one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostStateConfig {
    pub state_id: usize,
    /// Step the match advances to; `None` marks the pattern's terminal step
    pub next_state_id: Option<usize>,
    /// Step re-armed with a copy of every accepted match
    pub next_every_state_id: Option<usize>,
}

impl PostStateConfig {
    pub fn new(state_id: usize) -> Self {
        Self {
            state_id,
            next_state_id: None,
            next_every_state_id: None,
        }
    }

    pub fn with_next_state(mut self, next_state_id: Option<usize>) -> Self {
        self.next_state_id = next_state_id;
        self
    }

    pub fn with_next_every_state(mut self, next_every_state_id: Option<usize>) -> Self {
        self.next_every_state_id = next_every_state_id;
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.next_state_id.is_none()
    }
}

/// On an accepted candidate:
/// 1. stamps the match with the timestamp of the event bound at this step
/// 2. re-arms `next_every_state_id` (recorded first, so the copy is taken
///    while the match is still intact)
/// 3. advances to `next_state_id`, or completes the match at the terminal step
///
/// Processors chained after this one observe the accepted candidate; their
/// outcome does not undo the match.
#[derive(Debug)]
pub struct StreamPostStateProcessor {
    config: Arc<PostStateConfig>,
    next_processor: Option<Box<dyn Processor>>,
}

impl StreamPostStateProcessor {
    pub fn new(config: Arc<PostStateConfig>) -> Self {
        Self {
            config,
            next_processor: None,
        }
    }

    pub fn config(&self) -> &Arc<PostStateConfig> {
        &self.config
    }

    fn route(&self, event: StateEventId, context: &mut StateContext) -> EventFluxResult<()> {
        let state_id = self.config.state_id;
        let state_event = context.arena_mut().get_mut(event)?;
        let timestamp = state_event
            .get_stream_event(state_id)
            .map(|bound| bound.timestamp)
            .ok_or_else(|| {
                EventFluxError::invariant_violation(format!(
                    "match {event} accepted at step {state_id} with nothing bound there"
                ))
            })?;
        state_event.timestamp = timestamp;

        if let Some(target) = self.config.next_every_state_id {
            context.record_transition(StateTransition::Every { target, event });
        }
        match self.config.next_state_id {
            Some(target) => context.record_transition(StateTransition::Advance { target, event }),
            None => context.record_completion(event),
        }
        Ok(())
    }
}

impl Processor for StreamPostStateProcessor {
    fn process(
        &mut self,
        chunk: &mut ComplexEventChunk<StateEventId>,
        context: &mut StateContext,
    ) -> EventFluxResult<StepOutcome> {
        let event = *chunk.single_event(self.name())?;
        self.route(event, context)?;
        if let Some(next) = self.next_processor.as_mut() {
            chunk.reset();
            next.process(chunk, context)?;
        }
        Ok(StepOutcome::Matched)
    }

    fn next_processor(&self) -> Option<&dyn Processor> {
        self.next_processor.as_deref()
    }

    fn next_processor_mut(&mut self) -> Option<&mut Box<dyn Processor>> {
        self.next_processor.as_mut()
    }

    fn set_next_processor(&mut self, next_processor: Option<Box<dyn Processor>>) {
        self.next_processor = next_processor;
    }

    fn clone_processor(&self) -> Box<dyn Processor> {
        Box::new(Self {
            config: Arc::clone(&self.config),
            next_processor: self.next_processor.as_ref().map(|p| p.clone_processor()),
        })
    }

    fn name(&self) -> &'static str {
        "StreamPostStateProcessor"
    }
}
