// SPDX-License-Identifier: MIT OR Apache-2.0

// src/core/query/processor/stream/filter/filter_processor.rs
use crate::core::error::EventFluxResult;
use crate::core::event::complex_event::ComplexEventChunk;
use crate::core::event::state::{StateEvent, StateEventId};
use crate::core::query::input::stream::state::state_context::StateContext;
use crate::core::query::processor::{Processor, StepOutcome};
use std::fmt;
use std::sync::Arc;

/// Predicate over the candidate composite event, evaluated after the step's
/// slot has been bound.
pub type StateCondition = Arc<dyn Fn(&StateEvent) -> bool + Send + Sync>;

/// Rejects candidates whose condition evaluates to false.
pub struct FilterProcessor {
    condition: StateCondition,
    next_processor: Option<Box<dyn Processor>>,
}

impl fmt::Debug for FilterProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterProcessor")
            .field("next_processor", &self.next_processor)
            .finish_non_exhaustive()
    }
}

impl FilterProcessor {
    pub fn new(condition: StateCondition) -> Self {
        Self {
            condition,
            next_processor: None,
        }
    }

    pub fn from_fn<F>(condition: F) -> Self
    where
        F: Fn(&StateEvent) -> bool + Send + Sync + 'static,
    {
        Self::new(Arc::new(condition))
    }
}

impl Processor for FilterProcessor {
    fn process(
        &mut self,
        chunk: &mut ComplexEventChunk<StateEventId>,
        context: &mut StateContext,
    ) -> EventFluxResult<StepOutcome> {
        let candidate = *chunk.single_event(self.name())?;
        if !(self.condition)(context.arena().get(candidate)?) {
            return Ok(StepOutcome::NotMatched);
        }
        match self.next_processor.as_mut() {
            Some(next) => {
                chunk.reset();
                next.process(chunk, context)
            }
            None => Ok(StepOutcome::Matched),
        }
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
            condition: Arc::clone(&self.condition),
            next_processor: self.next_processor.as_ref().map(|p| p.clone_processor()),
        })
    }

    fn name(&self) -> &'static str {
        "FilterProcessor"
    }
}
