// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::core::error::{EventFluxError, EventFluxResult};
use crate::core::event::complex_event::ComplexEventType;
use crate::core::event::stream::StreamEvent;
use crate::core::event::value::AttributeValue;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_STATE_EVENT_ID: AtomicU64 = AtomicU64::new(1);

/// Composite event: one partial match, with a slot per pattern step.
///
/// Slot `i` holds the flat event bound at step `i`, or `None` while that step
/// is still open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateEvent {
    pub id: u64,
    pub timestamp: i64,
    pub event_type: ComplexEventType,
    pub stream_events: Vec<Option<StreamEvent>>,
    pub output_data: Vec<AttributeValue>,
}

impl StateEvent {
    pub fn new(stream_event_size: usize, output_data_size: usize) -> Self {
        Self {
            id: Self::next_id(),
            timestamp: -1,
            event_type: ComplexEventType::Current,
            stream_events: vec![None; stream_event_size],
            output_data: vec![AttributeValue::Null; output_data_size],
        }
    }

    pub fn next_id() -> u64 {
        NEXT_STATE_EVENT_ID.fetch_add(1, Ordering::Relaxed)
    }

    /// Number of slots (pattern steps)
    pub fn size(&self) -> usize {
        self.stream_events.len()
    }

    /// Bind `event` at `position`, returning whatever was bound there before.
    pub fn set_event(
        &mut self,
        position: usize,
        event: StreamEvent,
    ) -> EventFluxResult<Option<StreamEvent>> {
        Ok(self.slot_mut(position)?.replace(event))
    }

    /// Unbind the event at `position`.
    pub fn take_event(&mut self, position: usize) -> EventFluxResult<Option<StreamEvent>> {
        Ok(self.slot_mut(position)?.take())
    }

    pub fn get_stream_event(&self, position: usize) -> Option<&StreamEvent> {
        self.stream_events.get(position).and_then(Option::as_ref)
    }

    /// Attribute `index` of the event bound at `position`
    pub fn attribute(&self, position: usize, index: usize) -> Option<&AttributeValue> {
        self.get_stream_event(position)?.attribute(index)
    }

    pub fn bound_count(&self) -> usize {
        self.stream_events.iter().filter(|slot| slot.is_some()).count()
    }

    /// Every step has an event bound.
    pub fn is_complete(&self) -> bool {
        self.stream_events.iter().all(Option::is_some)
    }

    fn slot_mut(&mut self, position: usize) -> EventFluxResult<&mut Option<StreamEvent>> {
        let size = self.stream_events.len();
        self.stream_events.get_mut(position).ok_or_else(|| {
            EventFluxError::invariant_violation(format!(
                "slot {position} out of range for a composite event of {size} slots"
            ))
        })
    }
}
