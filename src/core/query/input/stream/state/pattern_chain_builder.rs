// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pattern Chain Builder - Factory for pattern and sequence state machines
//!
//! Validates a list of steps once and produces an immutable
//! [`PatternChainTemplate`]. Each context (query instance or partition) then
//! gets its own [`StateStreamRuntime`] from the template: processors are
//! cloned from prototypes that share their step configuration, and start with
//! no partial matches.
//!
//! Wiring for step `i` of `n`:
//!
//! ```text
//! StreamPreStateProcessor(i) -> [FilterProcessor] -> StreamPostStateProcessor(i)
//!     post.next_state_id       = i + 1            (None on the last step)
//!     post.next_every_state_id = i                (step-level every)
//!                              | 0                (whole-pattern every, last step)
//!     pre.callback_state_id    = 0
//! ```

use super::pre_state_processor::PreStateProcessor;
use super::state_stream_runtime::{EventPools, StateStreamRuntime};
use super::stream_post_state_processor::{PostStateConfig, StreamPostStateProcessor};
use super::stream_pre_state_processor::{PreStateConfig, StateType, StreamPreStateProcessor};
use crate::core::error::{EventFluxError, EventFluxResult};
use crate::core::event::state::StateEvent;
use crate::core::query::output::MatchCallback;
use crate::core::query::processor::{FilterProcessor, StateCondition};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Configuration for a single pattern step
#[derive(Clone)]
pub struct PatternStepConfig {
    /// Event alias (e1, e2, etc.)
    pub alias: String,
    /// Condition the candidate must satisfy once this step's event is bound;
    /// `None` accepts any event
    pub condition: Option<StateCondition>,
    /// Re-arm this step after every match so later events match again
    pub every: bool,
}

impl fmt::Debug for PatternStepConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternStepConfig")
            .field("alias", &self.alias)
            .field("has_condition", &self.condition.is_some())
            .field("every", &self.every)
            .finish()
    }
}

impl PatternStepConfig {
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            condition: None,
            every: false,
        }
    }

    pub fn with_condition<F>(mut self, condition: F) -> Self
    where
        F: Fn(&StateEvent) -> bool + Send + Sync + 'static,
    {
        self.condition = Some(Arc::new(condition));
        self
    }

    pub fn with_every(mut self, every: bool) -> Self {
        self.every = every;
        self
    }

    pub fn validate(&self) -> EventFluxResult<()> {
        if self.alias.trim().is_empty() {
            return Err(EventFluxError::validation_failed_with_field(
                "pattern step alias must not be empty",
                "alias",
            ));
        }
        Ok(())
    }
}

/// Pattern chain builder for creating multi-step state machines
#[derive(Debug)]
pub struct PatternChainBuilder {
    steps: Vec<PatternStepConfig>,
    state_type: StateType,
    is_every: bool,
    output_data_size: usize,
}

impl PatternChainBuilder {
    pub fn new(state_type: StateType) -> Self {
        Self {
            steps: Vec::new(),
            state_type,
            is_every: false,
            output_data_size: 0,
        }
    }

    pub fn add_step(&mut self, step: PatternStepConfig) -> &mut Self {
        self.steps.push(step);
        self
    }

    /// Enable EVERY over the whole pattern
    ///
    /// Every completed match re-arms the start state, so a new instance
    /// begins with the next matching event:
    /// - Pattern: EVERY (A -> B)
    /// - Events: A(1) → B(2) → A(3) → B(4)
    /// - Matches: A1-B2 and A3-B4
    ///
    /// Only valid in PATTERN mode.
    pub fn set_every(&mut self, is_every: bool) -> &mut Self {
        self.is_every = is_every;
        self
    }

    /// Number of projected output attributes carried by each composite event
    pub fn set_output_data_size(&mut self, size: usize) -> &mut Self {
        self.output_data_size = size;
        self
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Validate pattern chain constraints
    pub fn validate(&self) -> EventFluxResult<()> {
        if self.steps.is_empty() {
            return Err(EventFluxError::validation_failed(
                "Pattern chain must have at least one step",
            ));
        }

        let mut seen = HashSet::with_capacity(self.steps.len());
        for step in &self.steps {
            step.validate()?;
            if !seen.insert(step.alias.as_str()) {
                return Err(EventFluxError::validation_failed_with_field(
                    format!("Step alias '{}' is used more than once", step.alias),
                    "alias",
                ));
            }
            // A sequence step keeps a single live attempt; re-arming would add more
            if step.every && self.state_type == StateType::Sequence {
                return Err(EventFluxError::validation_failed_with_field(
                    format!(
                        "Step '{}' cannot be EVERY: EVERY is only supported in PATTERN mode, not SEQUENCE mode",
                        step.alias
                    ),
                    "every",
                ));
            }
        }

        if self.is_every {
            if self.state_type != StateType::Pattern {
                return Err(EventFluxError::validation_failed(
                    "EVERY patterns are only supported in PATTERN mode, not SEQUENCE mode",
                ));
            }
            if let Some(last) = self.steps.last().filter(|last| last.every && self.steps.len() > 1) {
                return Err(EventFluxError::validation_failed_with_field(
                    format!(
                        "Last step '{}' cannot be EVERY when the whole pattern is EVERY",
                        last.alias
                    ),
                    "every",
                ));
            }
        }

        Ok(())
    }

    /// Validate and wire the per-step processors into a reusable template
    pub fn build(self) -> EventFluxResult<PatternChainTemplate> {
        self.validate()?;

        let step_count = self.steps.len();
        let mut prototypes: Vec<Box<dyn PreStateProcessor>> = Vec::with_capacity(step_count);
        let mut aliases = Vec::with_capacity(step_count);

        for (state_id, step) in self.steps.into_iter().enumerate() {
            let is_last = state_id + 1 == step_count;
            let next_state_id = (!is_last).then_some(state_id + 1);
            let next_every_state_id = if step.every {
                Some(state_id)
            } else if is_last && self.is_every {
                Some(0)
            } else {
                None
            };

            let pre_config = PreStateConfig::new(state_id, self.state_type, state_id == 0)
                .with_callback_state(0);
            let post_config = PostStateConfig::new(state_id)
                .with_next_state(next_state_id)
                .with_next_every_state(next_every_state_id);

            let mut pre = StreamPreStateProcessor::new(Arc::new(pre_config));
            if let Some(condition) = step.condition {
                pre.set_to_last(Box::new(FilterProcessor::new(condition)));
            }
            pre.set_to_last(Box::new(StreamPostStateProcessor::new(Arc::new(post_config))));

            prototypes.push(Box::new(pre));
            aliases.push(step.alias);
        }

        log::debug!(
            "built {:?} chain [{}] (every: {})",
            self.state_type,
            aliases.join(" -> "),
            self.is_every
        );

        Ok(PatternChainTemplate {
            state_type: self.state_type,
            aliases,
            prototypes,
            output_data_size: self.output_data_size,
        })
    }
}

/// Immutable, shareable description of a built pattern.
#[derive(Debug)]
pub struct PatternChainTemplate {
    state_type: StateType,
    aliases: Vec<String>,
    prototypes: Vec<Box<dyn PreStateProcessor>>,
    output_data_size: usize,
}

impl PatternChainTemplate {
    pub fn state_type(&self) -> StateType {
        self.state_type
    }

    pub fn step_count(&self) -> usize {
        self.prototypes.len()
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Slot position of the step named `alias`
    pub fn position_of(&self, alias: &str) -> Option<usize> {
        self.aliases.iter().position(|a| a == alias)
    }

    pub fn output_data_size(&self) -> usize {
        self.output_data_size
    }

    pub fn prototype(&self, state_id: usize) -> Option<&dyn PreStateProcessor> {
        self.prototypes.get(state_id).map(|p| p.as_ref())
    }

    /// Fresh, not yet started runtime for one context.
    pub fn create_runtime(
        &self,
        pools: &EventPools,
        callback: Box<dyn MatchCallback>,
    ) -> StateStreamRuntime {
        let processors = self.prototypes.iter().map(|p| p.clone_processor()).collect();
        let context = pools.create_context(self.step_count(), self.output_data_size);
        StateStreamRuntime::new(processors, context, callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::query::processor::chain_names;

    fn two_steps(state_type: StateType) -> PatternChainBuilder {
        let mut builder = PatternChainBuilder::new(state_type);
        builder
            .add_step(PatternStepConfig::new("e1").with_condition(|_| true))
            .add_step(PatternStepConfig::new("e2"));
        builder
    }

    #[test]
    fn test_empty_chain_rejected() {
        let builder = PatternChainBuilder::new(StateType::Pattern);
        assert!(builder.validate().is_err());
    }

    #[test]
    fn test_duplicate_alias_rejected() {
        let mut builder = PatternChainBuilder::new(StateType::Pattern);
        builder
            .add_step(PatternStepConfig::new("e1"))
            .add_step(PatternStepConfig::new("e1"));
        let err = builder.validate().unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_blank_alias_rejected() {
        let mut builder = PatternChainBuilder::new(StateType::Pattern);
        builder.add_step(PatternStepConfig::new("  "));
        assert!(matches!(
            builder.validate(),
            Err(EventFluxError::ValidationFailed { .. })
        ));
    }

    #[test]
    fn test_every_only_in_pattern_mode() {
        let mut builder = two_steps(StateType::Sequence);
        builder.set_every(true);
        let err = builder.validate().unwrap_err();
        assert!(err.to_string().contains("PATTERN mode"));

        let mut builder = two_steps(StateType::Pattern);
        builder.set_every(true);
        assert!(builder.validate().is_ok());
    }

    #[test]
    fn test_step_every_rejected_in_sequence_mode() {
        let mut builder = PatternChainBuilder::new(StateType::Sequence);
        builder
            .add_step(PatternStepConfig::new("e1").with_every(true))
            .add_step(PatternStepConfig::new("e2").with_every(true))
            .add_step(PatternStepConfig::new("e3"));
        match builder.validate() {
            Err(EventFluxError::ValidationFailed { field, message }) => {
                assert_eq!(field.as_deref(), Some("every"));
                assert!(message.contains("'e1'"));
            }
            other => panic!("unexpected result: {other:?}"),
        }

        let mut builder = PatternChainBuilder::new(StateType::Pattern);
        builder
            .add_step(PatternStepConfig::new("e1").with_every(true))
            .add_step(PatternStepConfig::new("e2"));
        assert!(builder.validate().is_ok());
    }

    #[test]
    fn test_every_conflicts_with_last_step_every() {
        let mut builder = PatternChainBuilder::new(StateType::Pattern);
        builder
            .add_step(PatternStepConfig::new("e1"))
            .add_step(PatternStepConfig::new("e2").with_every(true))
            .set_every(true);
        assert!(builder.validate().is_err());
    }

    #[test]
    fn test_build_wires_chains() {
        let template = two_steps(StateType::Pattern).build().unwrap();
        assert_eq!(template.step_count(), 2);
        assert_eq!(template.position_of("e2"), Some(1));
        assert_eq!(template.position_of("missing"), None);

        let first = template.prototype(0).unwrap();
        assert!(first.is_start_state());
        assert_eq!(
            chain_names(first.next_processor().unwrap()),
            vec!["FilterProcessor", "StreamPostStateProcessor"]
        );

        let second = template.prototype(1).unwrap();
        assert!(!second.is_start_state());
        assert_eq!(second.callback_state_id(), 0);
        assert_eq!(
            chain_names(second.next_processor().unwrap()),
            vec!["StreamPostStateProcessor"]
        );
    }

    #[test]
    fn test_runtimes_do_not_share_state() {
        let template = two_steps(StateType::Pattern).build().unwrap();
        let pools = EventPools::new(&Default::default());
        let mut first = template.create_runtime(
            &pools,
            Box::new(crate::core::query::output::CollectingMatchCallback::new()),
        );
        let second = template.create_runtime(
            &pools,
            Box::new(crate::core::query::output::CollectingMatchCallback::new()),
        );
        first.start().unwrap();
        assert_eq!(first.processor(0).unwrap().pending_state_events().len(), 1);
        assert!(second.processor(0).unwrap().pending_state_events().is_empty());
    }
}
