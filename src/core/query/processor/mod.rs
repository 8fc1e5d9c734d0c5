// SPDX-License-Identifier: MIT OR Apache-2.0

// src/core/query/processor/mod.rs
// Processor chain shared by every pattern step.

use crate::core::error::EventFluxResult;
use crate::core::event::complex_event::ComplexEventChunk;
use crate::core::event::state::StateEventId;
use crate::core::query::input::stream::state::state_context::StateContext;
use std::fmt::Debug;

/// Result of offering a candidate partial match to a step's chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The step accepted the candidate and took it forward.
    Matched,
    /// The candidate was rejected; the caller decides whether to keep it.
    NotMatched,
}

/// Trait for processors chained behind a pre-state processor.
///
/// A chain receives a chunk holding the candidate composite event and
/// reports through its return value whether the step matched.
pub trait Processor: Debug + Send + Sync {
    fn process(
        &mut self,
        chunk: &mut ComplexEventChunk<StateEventId>,
        context: &mut StateContext,
    ) -> EventFluxResult<StepOutcome>;

    fn next_processor(&self) -> Option<&dyn Processor>;

    fn next_processor_mut(&mut self) -> Option<&mut Box<dyn Processor>>;

    fn set_next_processor(&mut self, next_processor: Option<Box<dyn Processor>>);

    /// Attach `processor` after the current last element of the chain.
    fn set_to_last(&mut self, processor: Box<dyn Processor>) {
        match self.next_processor_mut() {
            Some(next) => next.set_to_last(processor),
            None => self.set_next_processor(Some(processor)),
        }
    }

    /// Fresh copy of this processor and everything chained after it.
    fn clone_processor(&self) -> Box<dyn Processor>;

    fn name(&self) -> &'static str;
}

/// Number of processors in the chain starting at `processor`.
pub fn chain_length(processor: &dyn Processor) -> usize {
    let mut length = 1;
    let mut current = processor.next_processor();
    while let Some(next) = current {
        length += 1;
        current = next.next_processor();
    }
    length
}

/// Names of the processors in the chain starting at `processor`, in order.
pub fn chain_names(processor: &dyn Processor) -> Vec<&'static str> {
    let mut names = vec![processor.name()];
    let mut current = processor.next_processor();
    while let Some(next) = current {
        names.push(next.name());
        current = next.next_processor();
    }
    names
}

pub mod stream;

pub use self::stream::filter::filter_processor::{FilterProcessor, StateCondition};
