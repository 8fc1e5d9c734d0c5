// SPDX-License-Identifier: MIT OR Apache-2.0

// src/core/query/input/stream/state/stream_pre_state_processor.rs
// Single-stream pattern step: pending/staging lists plus the match protocol

use super::pre_state_processor::PreStateProcessor;
use super::state_context::StateContext;
use super::stream_pre_state::StreamPreState;
use crate::core::error::{EventFluxError, EventFluxResult};
use crate::core::event::complex_event::ComplexEventChunk;
use crate::core::event::state::StateEventId;
use crate::core::event::stream::StreamEvent;
use crate::core::query::processor::{Processor, StepOutcome};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Pattern vs Sequence semantics
///
/// **Pattern** (A -> B -> C):
/// - Unrelated events may occur between steps
/// - On no match the step's slot is cleared and the match keeps waiting
///
/// **Sequence** (A, B, C):
/// - Each step must be satisfied by the very next event
/// - On no match the partial match is discarded and the start state restarts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateType {
    Pattern,
    Sequence,
}

/// Immutable per-step settings, shared by every clone of the processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreStateConfig {
    pub state_id: usize,
    pub state_type: StateType,
    pub is_start_state: bool,
    /// Step notified when a sequence match fails here (the pattern's start state)
    pub callback_state_id: usize,
}

impl PreStateConfig {
    pub fn new(state_id: usize, state_type: StateType, is_start_state: bool) -> Self {
        Self {
            state_id,
            state_type,
            is_start_state,
            callback_state_id: 0,
        }
    }

    pub fn with_callback_state(mut self, callback_state_id: usize) -> Self {
        self.callback_state_id = callback_state_id;
        self
    }
}

const COMPONENT: &str = "StreamPreStateProcessor";

#[derive(Debug)]
pub struct StreamPreStateProcessor {
    config: Arc<PreStateConfig>,
    state: StreamPreState,
    next_processor: Option<Box<dyn Processor>>,
    /// Reused single-candidate chunk handed to the chain
    candidate_chunk: ComplexEventChunk<StateEventId>,
    reset_requested: bool,
    reset_notifications: u64,
}

impl StreamPreStateProcessor {
    pub fn new(config: Arc<PreStateConfig>) -> Self {
        Self {
            config,
            state: StreamPreState::new(),
            next_processor: None,
            candidate_chunk: ComplexEventChunk::with_capacity(1),
            reset_requested: false,
            reset_notifications: 0,
        }
    }

    pub fn config(&self) -> &Arc<PreStateConfig> {
        &self.config
    }

    /// Reset notifications received so far
    pub fn reset_notifications(&self) -> u64 {
        self.reset_notifications
    }

    pub fn is_reset_requested(&self) -> bool {
        self.reset_requested
    }

    /// Bind a copy of `stream_event` into `event` and run the chain.
    ///
    /// Returns whether `event` stays pending at this step.
    fn offer(
        &mut self,
        event: StateEventId,
        stream_event: &StreamEvent,
        context: &mut StateContext,
    ) -> EventFluxResult<bool> {
        let state_id = self.config.state_id;
        let copy = context.copy_stream_event(stream_event)?;
        context.bind_event(event, state_id, copy)?;

        let next = self.next_processor.as_mut().ok_or_else(|| {
            EventFluxError::configuration(format!("pattern step {state_id} has no processor chain"))
        })?;
        self.candidate_chunk.clear();
        self.candidate_chunk.add(event);
        let outcome = next.process(&mut self.candidate_chunk, context);
        self.candidate_chunk.clear();

        match outcome? {
            StepOutcome::Matched => Ok(false),
            StepOutcome::NotMatched => {
                context.unbind_event(event, state_id)?;
                match self.config.state_type {
                    StateType::Pattern => Ok(true),
                    StateType::Sequence => {
                        log::trace!(
                            "sequence step {} discarded partial match {}",
                            state_id,
                            event
                        );
                        context.release_state_event(event)?;
                        context.request_reset(self.config.callback_state_id);
                        Ok(false)
                    }
                }
            }
        }
    }
}

impl PreStateProcessor for StreamPreStateProcessor {
    fn state_id(&self) -> usize {
        self.config.state_id
    }

    fn is_start_state(&self) -> bool {
        self.config.is_start_state
    }

    fn state_type(&self) -> StateType {
        self.config.state_type
    }

    fn callback_state_id(&self) -> usize {
        self.config.callback_state_id
    }

    fn init(&mut self, context: &mut StateContext) -> EventFluxResult<()> {
        if self.next_processor.is_none() {
            return Err(EventFluxError::configuration(format!(
                "pattern step {} has no processor chain",
                self.config.state_id
            )));
        }
        if self.config.is_start_state {
            let seed = context.arena_mut().borrow_event()?;
            self.add_state(seed, context)?;
        }
        Ok(())
    }

    fn process(
        &mut self,
        chunk: &ComplexEventChunk<StreamEvent>,
        context: &mut StateContext,
    ) -> EventFluxResult<()> {
        let stream_event = chunk.single_event(COMPONENT)?;
        let (mut pending, mut retained) = self.state.take_pending();

        let mut result = Ok(());
        let mut remaining = pending.drain(..);
        for event in remaining.by_ref() {
            match self.offer(event, stream_event, context) {
                Ok(true) => retained.push(event),
                Ok(false) => {}
                Err(e) => {
                    // The failed match is in neither list any more
                    if context.release_if_live(event) {
                        log::debug!(
                            "step {} released match {} after a failed offer",
                            self.config.state_id,
                            event
                        );
                    }
                    result = Err(e);
                    break;
                }
            }
        }
        // Matches not yet offered when the pass failed stay pending
        retained.extend(remaining);
        self.state.restore_pending(retained, pending);
        result
    }

    fn add_state(&mut self, event: StateEventId, context: &mut StateContext) -> EventFluxResult<()> {
        match self.config.state_type {
            StateType::Sequence if !self.state.is_staging_empty() => {
                // A sequence step keeps a single live attempt
                log::trace!(
                    "sequence step {} already has a staged match, dropping {}",
                    self.config.state_id,
                    event
                );
                context.release_state_event(event)
            }
            _ => {
                self.state.stage(event);
                Ok(())
            }
        }
    }

    fn add_every_state(&mut self, event: StateEventId, context: &mut StateContext) -> EventFluxResult<()> {
        let copy = context.copy_state_event_for_every(event, self.config.state_id)?;
        self.state.stage(copy);
        Ok(())
    }

    fn update_state(&mut self, context: &mut StateContext) -> EventFluxResult<()> {
        if self.reset_requested {
            self.reset_requested = false;
            self.reset_state(context)?;
        }
        self.state.promote_staging();
        Ok(())
    }

    fn reset_state(&mut self, context: &mut StateContext) -> EventFluxResult<()> {
        let mut first_error = None;
        for event in self.state.drain_pending() {
            if let Err(e) = context.release_state_event(event) {
                first_error.get_or_insert(e);
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }
        if self.config.is_start_state && self.state.is_staging_empty() {
            self.init(context)?;
        }
        Ok(())
    }

    fn start_state_reset(&mut self) {
        self.reset_notifications += 1;
        self.reset_requested = true;
    }

    fn pending_state_events(&self) -> &[StateEventId] {
        self.state.pending()
    }

    fn staging_state_events(&self) -> &[StateEventId] {
        self.state.staging()
    }

    fn next_processor(&self) -> Option<&dyn Processor> {
        self.next_processor.as_deref()
    }

    fn set_next_processor(&mut self, next_processor: Option<Box<dyn Processor>>) {
        self.next_processor = next_processor;
    }

    fn set_to_last(&mut self, processor: Box<dyn Processor>) {
        match self.next_processor.as_mut() {
            Some(next) => next.set_to_last(processor),
            None => self.next_processor = Some(processor),
        }
    }

    fn clone_processor(&self) -> Box<dyn PreStateProcessor> {
        let mut cloned = StreamPreStateProcessor::new(Arc::clone(&self.config));
        cloned.next_processor = self.next_processor.as_ref().map(|p| p.clone_processor());
        Box::new(cloned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::event::state::{StateEventArena, StateEventFactory};
    use crate::core::event::stream::{StreamEventCloner, StreamEventPool};
    use crate::core::event::value::AttributeValue;
    use crate::core::query::input::stream::state::state_context::{
        test_context, Outbox, StateTransition,
    };
    use crate::core::query::input::stream::state::stream_post_state_processor::{
        PostStateConfig, StreamPostStateProcessor,
    };
    use crate::core::query::processor::{chain_length, FilterProcessor};

    fn symbol_is(symbol: &'static str, position: usize) -> FilterProcessor {
        FilterProcessor::from_fn(move |event| {
            event.attribute(position, 0).and_then(AttributeValue::as_str) == Some(symbol)
        })
    }

    fn step(
        state_id: usize,
        state_type: StateType,
        symbol: &'static str,
        next_state_id: Option<usize>,
    ) -> StreamPreStateProcessor {
        let mut pre = StreamPreStateProcessor::new(Arc::new(PreStateConfig::new(
            state_id,
            state_type,
            state_id == 0,
        )));
        pre.set_to_last(Box::new(symbol_is(symbol, state_id)));
        pre.set_to_last(Box::new(StreamPostStateProcessor::new(Arc::new(
            PostStateConfig::new(state_id).with_next_state(next_state_id),
        ))));
        pre
    }

    fn chunk(symbol: &str, ts: i64) -> ComplexEventChunk<StreamEvent> {
        ComplexEventChunk::single(StreamEvent::new(ts, vec![AttributeValue::from(symbol)]))
    }

    fn drain(context: &mut StateContext) -> Outbox {
        let mut outbox = Outbox::default();
        context.swap_outbox(&mut outbox);
        outbox
    }

    #[test]
    fn test_init_seeds_only_start_state() {
        let mut context = test_context(2);
        let mut start = step(0, StateType::Pattern, "A", Some(1));
        let mut second = step(1, StateType::Pattern, "B", None);
        start.init(&mut context).unwrap();
        second.init(&mut context).unwrap();
        assert_eq!(start.staging_state_events().len(), 1);
        assert!(second.staging_state_events().is_empty());

        start.update_state(&mut context).unwrap();
        assert_eq!(start.pending_state_events().len(), 1);
        assert!(start.staging_state_events().is_empty());
    }

    #[test]
    fn test_init_without_chain_fails_fast() {
        let mut context = test_context(1);
        let mut bare = StreamPreStateProcessor::new(Arc::new(PreStateConfig::new(
            0,
            StateType::Pattern,
            true,
        )));
        assert!(matches!(
            bare.init(&mut context),
            Err(EventFluxError::Configuration { .. })
        ));
    }

    #[test]
    fn test_match_removes_from_pending_and_advances() {
        let mut context = test_context(2);
        let mut start = step(0, StateType::Pattern, "A", Some(1));
        start.init(&mut context).unwrap();
        start.update_state(&mut context).unwrap();
        let seed = start.pending_state_events()[0];

        start.process(&chunk("A", 10), &mut context).unwrap();
        assert!(start.pending_state_events().is_empty());

        let outbox = drain(&mut context);
        assert_eq!(
            outbox.transitions,
            vec![StateTransition::Advance { target: 1, event: seed }]
        );
        let bound = context.arena().get(seed).unwrap();
        assert_eq!(bound.timestamp, 10);
        assert_eq!(bound.get_stream_event(0).map(|e| e.timestamp), Some(10));
    }

    #[test]
    fn test_pattern_no_match_keeps_and_clears_slot() {
        let mut context = test_context(2);
        let mut start = step(0, StateType::Pattern, "A", Some(1));
        start.init(&mut context).unwrap();
        start.update_state(&mut context).unwrap();
        let seed = start.pending_state_events()[0];

        start.process(&chunk("X", 10), &mut context).unwrap();
        assert_eq!(start.pending_state_events(), &[seed]);
        assert!(context.arena().get(seed).unwrap().get_stream_event(0).is_none());
        assert!(drain(&mut context).is_empty());
        assert_eq!(context.stream_event_cloner().pool().outstanding(), 0);
    }

    #[test]
    fn test_sequence_no_match_discards_and_requests_reset() {
        let mut context = test_context(2);
        let mut second = step(1, StateType::Sequence, "B", None);
        let partial = context.arena_mut().borrow_event().unwrap();
        second.add_state(partial, &mut context).unwrap();
        second.update_state(&mut context).unwrap();

        second.process(&chunk("X", 10), &mut context).unwrap();
        assert!(second.pending_state_events().is_empty());
        assert!(context.arena().get(partial).is_err());

        let outbox = drain(&mut context);
        assert_eq!(outbox.reset_requests, vec![0]);
        assert_eq!(context.arena().live_count(), 0);
    }

    #[test]
    fn test_pending_order_preserved_with_removals() {
        let mut context = test_context(2);
        // Second step whose condition looks at what the first step bound
        let mut second = StreamPreStateProcessor::new(Arc::new(PreStateConfig::new(
            1,
            StateType::Pattern,
            false,
        )));
        second.set_to_last(Box::new(symbol_is("mid", 0)));
        second.set_to_last(Box::new(StreamPostStateProcessor::new(Arc::new(
            PostStateConfig::new(1),
        ))));

        let ids: Vec<_> = (0..3)
            .map(|_| context.arena_mut().borrow_event().unwrap())
            .collect();
        for (i, id) in ids.iter().enumerate() {
            let origin = if i == 1 { "mid" } else { "edge" };
            let copy = context
                .copy_stream_event(&StreamEvent::new(1, vec![AttributeValue::from(origin)]))
                .unwrap();
            context.bind_event(*id, 0, copy).unwrap();
            second.add_state(*id, &mut context).unwrap();
        }
        second.update_state(&mut context).unwrap();

        second.process(&chunk("B", 5), &mut context).unwrap();
        assert_eq!(second.pending_state_events(), &[ids[0], ids[2]]);
        assert_eq!(drain(&mut context).completed, vec![ids[1]]);
    }

    #[test]
    fn test_sequence_add_state_keeps_single_attempt() {
        let mut context = test_context(2);
        let mut second = step(1, StateType::Sequence, "B", None);
        let first = context.arena_mut().borrow_event().unwrap();
        let extra = context.arena_mut().borrow_event().unwrap();
        second.add_state(first, &mut context).unwrap();
        second.add_state(extra, &mut context).unwrap();
        assert_eq!(second.staging_state_events(), &[first]);
        assert!(context.arena().get(extra).is_err());
    }

    #[test]
    fn test_pattern_add_state_is_unbounded() {
        let mut context = test_context(2);
        let mut second = step(1, StateType::Pattern, "B", None);
        for _ in 0..5 {
            let id = context.arena_mut().borrow_event().unwrap();
            second.add_state(id, &mut context).unwrap();
        }
        assert_eq!(second.staging_state_events().len(), 5);
    }

    #[test]
    fn test_add_every_state_stages_independent_copy() {
        let mut context = test_context(2);
        let mut second = step(1, StateType::Pattern, "B", None);
        let original = context.arena_mut().borrow_event().unwrap();
        let copy = context
            .copy_stream_event(&StreamEvent::new(1, vec![AttributeValue::from("A")]))
            .unwrap();
        context.bind_event(original, 0, copy).unwrap();

        second.add_every_state(original, &mut context).unwrap();
        let staged = second.staging_state_events()[0];
        assert_ne!(staged, original);
        assert_eq!(context.arena().get(original).unwrap().bound_count(), 1);
        assert_eq!(context.arena().get(staged).unwrap().bound_count(), 1);
        assert_eq!(context.stream_event_cloner().pool().outstanding(), 2);

        let symbol = |context: &StateContext, id| {
            context
                .arena()
                .get(id)
                .unwrap()
                .attribute(0, 0)
                .and_then(AttributeValue::as_str)
                .map(str::to_string)
        };

        // Rebinding the copy's slot leaves the original untouched
        let rebound = context
            .copy_stream_event(&StreamEvent::new(2, vec![AttributeValue::from("Z")]))
            .unwrap();
        context.bind_event(staged, 0, rebound).unwrap();
        assert_eq!(symbol(&context, staged).as_deref(), Some("Z"));
        assert_eq!(symbol(&context, original).as_deref(), Some("A"));

        // Clearing the original's slot leaves the copy bound
        context.unbind_event(original, 0).unwrap();
        assert_eq!(context.arena().get(original).unwrap().bound_count(), 0);
        assert_eq!(symbol(&context, staged).as_deref(), Some("Z"));
        assert_eq!(context.stream_event_cloner().pool().outstanding(), 1);
    }

    #[test]
    fn test_failed_offer_releases_match_and_keeps_the_rest() {
        let pool = Arc::new(StreamEventPool::new(1));
        let arena = StateEventArena::new(StateEventFactory::new(2, 0), 8, Arc::clone(&pool));
        let mut context = StateContext::new(arena, StreamEventCloner::new(Arc::clone(&pool)));

        let mut start = step(0, StateType::Pattern, "A", Some(1));
        let first = context.arena_mut().borrow_event().unwrap();
        let second = context.arena_mut().borrow_event().unwrap();
        start.add_state(first, &mut context).unwrap();
        start.add_state(second, &mut context).unwrap();
        start.update_state(&mut context).unwrap();

        // Nothing left to copy the incoming event into
        let held = pool.borrow_event().unwrap();
        let err = start.process(&chunk("A", 1), &mut context).unwrap_err();
        assert!(matches!(err, EventFluxError::PoolExhausted { .. }));

        assert!(!context.arena().is_live(first));
        assert_eq!(start.pending_state_events(), &[second]);
        assert_eq!(context.arena().live_count(), 1);
        pool.release(held);
        assert_eq!(pool.outstanding(), 0);
    }

    #[test]
    fn test_update_state_is_idempotent() {
        let mut context = test_context(2);
        let mut start = step(0, StateType::Pattern, "A", Some(1));
        start.init(&mut context).unwrap();
        start.update_state(&mut context).unwrap();
        let before = start.pending_state_events().to_vec();
        start.update_state(&mut context).unwrap();
        assert_eq!(start.pending_state_events(), before.as_slice());
    }

    #[test]
    fn test_reset_state_reseeds_start_state() {
        let mut context = test_context(2);
        let mut start = step(0, StateType::Pattern, "A", Some(1));
        start.init(&mut context).unwrap();
        start.update_state(&mut context).unwrap();
        let seed = start.pending_state_events()[0];

        start.reset_state(&mut context).unwrap();
        assert!(start.pending_state_events().is_empty());
        assert_eq!(start.staging_state_events().len(), 1);
        // The old seed went back to the arena and its index was reused
        assert_eq!(start.staging_state_events(), &[seed]);
        assert_eq!(context.arena().live_count(), 1);
    }

    #[test]
    fn test_reset_state_does_not_reseed_when_staging_non_empty() {
        let mut context = test_context(2);
        let mut start = step(0, StateType::Pattern, "A", Some(1));
        let staged = context.arena_mut().borrow_event().unwrap();
        start.add_state(staged, &mut context).unwrap();
        start.reset_state(&mut context).unwrap();
        assert_eq!(start.staging_state_events(), &[staged]);
    }

    #[test]
    fn test_start_state_reset_applies_at_update() {
        let mut context = test_context(2);
        let mut start = step(0, StateType::Sequence, "A", Some(1));
        start.init(&mut context).unwrap();
        start.update_state(&mut context).unwrap();
        start.process(&chunk("A", 1), &mut context).unwrap();
        assert!(start.pending_state_events().is_empty());
        drain(&mut context);

        start.start_state_reset();
        assert!(start.is_reset_requested());
        start.update_state(&mut context).unwrap();
        assert!(!start.is_reset_requested());
        assert_eq!(start.pending_state_events().len(), 1);
        assert_eq!(start.reset_notifications(), 1);
    }

    #[test]
    fn test_process_rejects_multi_event_chunk() {
        let mut context = test_context(1);
        let mut start = step(0, StateType::Pattern, "A", None);
        let batch: ComplexEventChunk<StreamEvent> =
            [StreamEvent::default(), StreamEvent::default()].into_iter().collect();
        assert!(matches!(
            start.process(&batch, &mut context),
            Err(EventFluxError::ContractViolation { .. })
        ));
    }

    #[test]
    fn test_clone_processor_shares_config_not_state() {
        let mut context = test_context(2);
        let mut start = step(0, StateType::Pattern, "A", Some(1));
        start.init(&mut context).unwrap();
        start.update_state(&mut context).unwrap();

        let cloned = start.clone_processor();
        assert_eq!(cloned.state_id(), 0);
        assert!(cloned.is_start_state());
        assert!(cloned.pending_state_events().is_empty());
        assert_eq!(chain_length(cloned.next_processor().unwrap()), 2);
        assert_eq!(start.pending_state_events().len(), 1);
    }
}
