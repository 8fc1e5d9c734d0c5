// SPDX-License-Identifier: MIT OR Apache-2.0

use super::state_event::StateEvent;

/// Produces zero-initialized composite events of a fixed shape.
#[derive(Debug, Clone, Copy)]
pub struct StateEventFactory {
    pub stream_event_size: usize,
    pub output_data_size: usize,
}

impl StateEventFactory {
    pub fn new(stream_event_size: usize, output_data_size: usize) -> Self {
        Self {
            stream_event_size,
            output_data_size,
        }
    }

    pub fn new_instance(&self) -> StateEvent {
        StateEvent::new(self.stream_event_size, self.output_data_size)
    }
}
