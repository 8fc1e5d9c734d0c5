// SPDX-License-Identifier: MIT OR Apache-2.0

//! StateStreamRuntime - drives one context of a pattern or sequence
//!
//! One runtime owns the step processors and the composite event arena of a
//! single context and must be fed by a single writer. Input follows the
//! windowing contract:
//!
//! | event type | effect                                   |
//! |------------|------------------------------------------|
//! | `Current`  | one processing pass                      |
//! | `Expired`  | ignored (no removal semantics for steps) |
//! | `Timer`    | ignored                                  |
//! | `Reset`    | every step's pending matches are dropped |
//!
//! A processing pass offers the event to each step in order and applies what
//! the step recorded (re-arms, hand-offs, completed matches, reset requests)
//! before moving to the next step. Hand-offs land in the receiving step's
//! staging list, so the event cannot satisfy two steps of the same match.
//! After all steps, every step promotes its staging list.
//!
//! A context-fatal error (pool exhaustion, broken invariant) terminates the
//! runtime. Matches the failed pass had in flight are returned to their pools
//! and every later call is rejected, so a damaged context never keeps
//! producing results.

use super::pre_state_processor::PreStateProcessor;
use super::state_context::{Outbox, StateContext, StateTransition};
use crate::core::config::PoolConfig;
use crate::core::error::{EventFluxError, EventFluxResult};
use crate::core::event::complex_event::{ComplexEventChunk, ComplexEventType};
use crate::core::event::state::{StateEventArena, StateEventFactory};
use crate::core::event::stream::{StreamEvent, StreamEventCloner, StreamEventPool};
use crate::core::query::output::MatchCallback;
use serde::Serialize;
use std::sync::Arc;

const COMPONENT: &str = "StateStreamRuntime";

/// Pools shared by every context created from the same template.
#[derive(Debug, Clone)]
pub struct EventPools {
    stream_pool: Arc<StreamEventPool>,
    state_event_capacity: usize,
}

impl EventPools {
    pub fn new(config: &PoolConfig) -> Self {
        let stream_pool = Arc::new(StreamEventPool::new(config.stream_event_capacity));
        if config.prefill {
            stream_pool.prefill();
        }
        Self {
            stream_pool,
            state_event_capacity: config.state_event_capacity,
        }
    }

    pub fn stream_pool(&self) -> &Arc<StreamEventPool> {
        &self.stream_pool
    }

    pub fn state_event_capacity(&self) -> usize {
        self.state_event_capacity
    }

    /// Context with its own arena of `step_count`-slot composite events.
    pub fn create_context(&self, step_count: usize, output_data_size: usize) -> StateContext {
        let arena = StateEventArena::new(
            StateEventFactory::new(step_count, output_data_size),
            self.state_event_capacity,
            Arc::clone(&self.stream_pool),
        );
        StateContext::new(arena, StreamEventCloner::new(Arc::clone(&self.stream_pool)))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RuntimeStatistics {
    pub events_processed: u64,
    pub events_ignored: u64,
    pub matches_emitted: u64,
    pub external_resets: u64,
    pub sequence_resets: u64,
}

/// How far a drained outbox got before one of its entries failed.
#[derive(Debug, Default, Clone, Copy)]
struct OutboxProgress {
    transitions: usize,
    completed: usize,
}

#[derive(Debug)]
pub struct StateStreamRuntime {
    processors: Vec<Box<dyn PreStateProcessor>>,
    context: StateContext,
    callback: Box<dyn MatchCallback>,
    /// Drained outbox, kept for its buffers
    applied: Outbox,
    /// Reused single-event chunk offered to each step
    input: ComplexEventChunk<StreamEvent>,
    started: bool,
    terminated: bool,
    statistics: RuntimeStatistics,
}

impl StateStreamRuntime {
    pub fn new(
        processors: Vec<Box<dyn PreStateProcessor>>,
        context: StateContext,
        callback: Box<dyn MatchCallback>,
    ) -> Self {
        Self {
            processors,
            context,
            callback,
            applied: Outbox::default(),
            input: ComplexEventChunk::with_capacity(1),
            started: false,
            terminated: false,
            statistics: RuntimeStatistics::default(),
        }
    }

    /// Seed the start state and make it pending.
    pub fn start(&mut self) -> EventFluxResult<()> {
        self.ensure_not_terminated()?;
        if self.started {
            return Ok(());
        }
        let result = self.init_all();
        self.check(result)?;
        self.started = true;
        log::debug!("state runtime started with {} steps", self.processors.len());
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Whether a fatal error ended this context.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Feed one event released by the windowing layer.
    pub fn send(&mut self, event: StreamEvent) -> EventFluxResult<()> {
        self.ensure_not_terminated()?;
        if !self.started {
            return Err(EventFluxError::contract_violation(
                COMPONENT,
                "event received before start()",
            ));
        }
        match event.event_type {
            ComplexEventType::Current => self.process_current(event),
            ComplexEventType::Expired | ComplexEventType::Timer => {
                log::trace!("ignoring {:?} event at {}", event.event_type, event.timestamp);
                self.statistics.events_ignored += 1;
                Ok(())
            }
            ComplexEventType::Reset => self.reset(),
        }
    }

    /// Feed a batch released by a window, in order.
    ///
    /// On error the failing event is consumed and the events after it are
    /// left in `chunk`, unsent.
    pub fn send_chunk(&mut self, chunk: &mut ComplexEventChunk<StreamEvent>) -> EventFluxResult<()> {
        let events: Vec<StreamEvent> = chunk.drain().collect();
        let mut remaining = events.into_iter();
        while let Some(event) = remaining.next() {
            if let Err(e) = self.send(event) {
                for unsent in remaining {
                    chunk.add(unsent);
                }
                return Err(e);
            }
        }
        Ok(())
    }

    /// Drop every pending match; start states re-seed.
    pub fn reset(&mut self) -> EventFluxResult<()> {
        self.ensure_not_terminated()?;
        let result = self.reset_all();
        self.check(result)?;
        self.statistics.external_resets += 1;
        log::debug!("state runtime reset");
        Ok(())
    }

    pub fn processor(&self, state_id: usize) -> Option<&dyn PreStateProcessor> {
        self.processors.get(state_id).map(|p| p.as_ref())
    }

    pub fn step_count(&self) -> usize {
        self.processors.len()
    }

    pub fn context(&self) -> &StateContext {
        &self.context
    }

    /// Composite events currently alive in this context's arena
    pub fn live_state_events(&self) -> usize {
        self.context.arena().live_count()
    }

    pub fn statistics(&self) -> RuntimeStatistics {
        self.statistics
    }

    fn process_current(&mut self, event: StreamEvent) -> EventFluxResult<()> {
        self.input.clear();
        self.input.add(event);
        let result = self.run_pass();
        self.input.clear();
        self.check(result)?;
        self.statistics.events_processed += 1;
        Ok(())
    }

    fn run_pass(&mut self) -> EventFluxResult<()> {
        for index in 0..self.processors.len() {
            if let Err(e) = self.processors[index].process(&self.input, &mut self.context) {
                // Whatever the failed step recorded is never applied
                self.discard_outbox();
                return Err(e);
            }
            self.apply_outbox()?;
        }
        self.update_all()
    }

    fn init_all(&mut self) -> EventFluxResult<()> {
        for processor in self.processors.iter_mut() {
            processor.init(&mut self.context)?;
        }
        self.update_all()
    }

    fn reset_all(&mut self) -> EventFluxResult<()> {
        for processor in self.processors.iter_mut() {
            processor.reset_state(&mut self.context)?;
        }
        self.update_all()
    }

    fn ensure_not_terminated(&self) -> EventFluxResult<()> {
        if self.terminated {
            return Err(EventFluxError::contract_violation(
                COMPONENT,
                "context was terminated by an earlier fatal error",
            ));
        }
        Ok(())
    }

    /// Terminate the context if `result` carries a context-fatal error.
    fn check(&mut self, result: EventFluxResult<()>) -> EventFluxResult<()> {
        if let Err(e) = &result {
            if e.is_context_fatal() {
                self.terminated = true;
                log::error!(
                    "terminating pattern context with {} live partial matches: {}",
                    self.context.arena().live_count(),
                    e
                );
            }
        }
        result
    }

    fn update_all(&mut self) -> EventFluxResult<()> {
        for processor in self.processors.iter_mut() {
            processor.update_state(&mut self.context)?;
        }
        Ok(())
    }

    fn apply_outbox(&mut self) -> EventFluxResult<()> {
        self.context.swap_outbox(&mut self.applied);
        let mut progress = OutboxProgress::default();
        let result = self.apply_recorded(&mut progress);
        if result.is_err() {
            self.release_unapplied(progress);
        }
        self.applied.clear();
        result
    }

    fn discard_outbox(&mut self) {
        self.context.swap_outbox(&mut self.applied);
        self.release_unapplied(OutboxProgress::default());
        self.applied.clear();
    }

    /// Release the matches owned by outbox entries that were never applied.
    ///
    /// A hand-off or completion owns its match; a re-arm only reads it.
    fn release_unapplied(&mut self, progress: OutboxProgress) {
        let advanced = self.applied.transitions[progress.transitions..]
            .iter()
            .filter_map(|transition| match *transition {
                StateTransition::Advance { event, .. } => Some(event),
                StateTransition::Every { .. } => None,
            });
        let completed = self.applied.completed[progress.completed..].iter().copied();

        let mut released = 0usize;
        for event in advanced.chain(completed) {
            if self.context.release_if_live(event) {
                released += 1;
            }
        }
        if released > 0 {
            log::debug!("released {} matches from an abandoned pass", released);
        }
    }

    fn apply_recorded(&mut self, progress: &mut OutboxProgress) -> EventFluxResult<()> {
        let step_count = self.processors.len();
        let unknown_step = |target: usize| {
            EventFluxError::invariant_violation(format!(
                "transition to step {target} in a chain of {step_count} steps"
            ))
        };

        // Re-arm copies are taken before the same match is handed off or released
        for transition in self.applied.transitions.iter() {
            match *transition {
                StateTransition::Every { target, event } => self
                    .processors
                    .get_mut(target)
                    .ok_or_else(|| unknown_step(target))?
                    .add_every_state(event, &mut self.context)?,
                StateTransition::Advance { target, event } => self
                    .processors
                    .get_mut(target)
                    .ok_or_else(|| unknown_step(target))?
                    .add_state(event, &mut self.context)?,
            }
            progress.transitions += 1;
        }

        for event in self.applied.completed.iter().copied() {
            self.callback.receive(self.context.arena().get(event)?);
            self.context.release_state_event(event)?;
            self.statistics.matches_emitted += 1;
            progress.completed += 1;
        }

        for state_id in self.applied.reset_requests.iter().copied() {
            self.processors
                .get_mut(state_id)
                .ok_or_else(|| unknown_step(state_id))?
                .start_state_reset();
            self.statistics.sequence_resets += 1;
        }
        Ok(())
    }
}
