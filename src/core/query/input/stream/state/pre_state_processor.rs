// SPDX-License-Identifier: MIT OR Apache-2.0

use super::state_context::StateContext;
use super::stream_pre_state_processor::StateType;
use crate::core::error::EventFluxResult;
use crate::core::event::complex_event::ComplexEventChunk;
use crate::core::event::state::StateEventId;
use crate::core::event::stream::StreamEvent;
use crate::core::query::processor::Processor;
use std::fmt::Debug;

/// Entry point of one pattern step.
///
/// Holds the partial matches waiting at this step and offers each incoming
/// flat event to them. Matches handed to the step during a pass are staged
/// and only become pending at [`update_state`](Self::update_state), so an
/// event never advances a match through two steps at once.
pub trait PreStateProcessor: Debug + Send + Sync {
    fn state_id(&self) -> usize;

    fn is_start_state(&self) -> bool;

    fn state_type(&self) -> StateType;

    /// Step whose attempt restarts when a sequence match fails here
    fn callback_state_id(&self) -> usize;

    /// Seed the step with an empty composite event if it starts the pattern.
    fn init(&mut self, context: &mut StateContext) -> EventFluxResult<()>;

    /// Offer the single flat event in `chunk` to every pending match.
    fn process(
        &mut self,
        chunk: &ComplexEventChunk<StreamEvent>,
        context: &mut StateContext,
    ) -> EventFluxResult<()>;

    /// Stage a match handed over by the previous step.
    fn add_state(&mut self, event: StateEventId, context: &mut StateContext) -> EventFluxResult<()>;

    /// Stage an independent copy of `event`, leaving `event` untouched.
    fn add_every_state(&mut self, event: StateEventId, context: &mut StateContext) -> EventFluxResult<()>;

    /// Promote staged matches to pending.
    fn update_state(&mut self, context: &mut StateContext) -> EventFluxResult<()>;

    /// Drop every pending match; a start state re-seeds itself.
    fn reset_state(&mut self, context: &mut StateContext) -> EventFluxResult<()>;

    /// Restart request from a failed sequence step, applied at the next update.
    fn start_state_reset(&mut self);

    fn pending_state_events(&self) -> &[StateEventId];

    fn staging_state_events(&self) -> &[StateEventId];

    fn next_processor(&self) -> Option<&dyn Processor>;

    fn set_next_processor(&mut self, next_processor: Option<Box<dyn Processor>>);

    fn set_to_last(&mut self, processor: Box<dyn Processor>);

    /// Same step and chain, with no partial matches.
    fn clone_processor(&self) -> Box<dyn PreStateProcessor>;
}
