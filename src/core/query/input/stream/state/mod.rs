// SPDX-License-Identifier: MIT OR Apache-2.0

// Partial-match state machine for pattern and sequence queries
pub mod pre_state_processor; // Step interface (trait)
pub mod state_context; // Arena, cloners and outbox shared by one context
pub mod stream_post_state_processor; // Advance / re-arm / complete routing
pub mod stream_pre_state; // Pending and staging lists
pub mod stream_pre_state_processor; // Single-stream step implementation

pub mod pattern_chain_builder; // Validated templates for multi-step chains

// Runtime infrastructure
pub mod partitioned_state_runtime; // One context per partition key
pub mod state_stream_runtime; // Single-context driver

pub use partitioned_state_runtime::{CallbackFactory, PartitionedStateRuntime};
pub use pattern_chain_builder::{PatternChainBuilder, PatternChainTemplate, PatternStepConfig};
pub use pre_state_processor::PreStateProcessor;
pub use state_context::{Outbox, StateContext, StateTransition};
pub use state_stream_runtime::{EventPools, RuntimeStatistics, StateStreamRuntime};
pub use stream_post_state_processor::{PostStateConfig, StreamPostStateProcessor};
pub use stream_pre_state::StreamPreState;
pub use stream_pre_state_processor::{PreStateConfig, StateType, StreamPreStateProcessor};
