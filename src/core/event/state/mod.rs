// SPDX-License-Identifier: MIT OR Apache-2.0

pub mod state_event;
pub mod state_event_arena;
pub mod state_event_cloner;
pub mod state_event_factory;

pub use state_event::StateEvent;
pub use state_event_arena::{StateEventArena, StateEventId};
pub use state_event_cloner::StateEventCloner;
pub use state_event_factory::StateEventFactory;
