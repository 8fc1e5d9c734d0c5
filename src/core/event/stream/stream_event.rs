// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::core::event::complex_event::ComplexEventType;
use crate::core::event::value::AttributeValue;
use serde::{Deserialize, Serialize};

/// A flat event: one row of a single input stream.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StreamEvent {
    pub timestamp: i64,
    pub event_type: ComplexEventType,
    pub data: Vec<AttributeValue>,
}

impl StreamEvent {
    pub fn new(timestamp: i64, data: Vec<AttributeValue>) -> Self {
        Self {
            timestamp,
            event_type: ComplexEventType::Current,
            data,
        }
    }

    pub fn with_type(mut self, event_type: ComplexEventType) -> Self {
        self.event_type = event_type;
        self
    }

    pub fn attribute(&self, index: usize) -> Option<&AttributeValue> {
        self.data.get(index)
    }

    pub fn is_expired(&self) -> bool {
        self.event_type == ComplexEventType::Expired
    }

    /// Return to the zero state, keeping the attribute buffer's allocation.
    pub(crate) fn clear(&mut self) {
        self.timestamp = 0;
        self.event_type = ComplexEventType::default();
        self.data.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_resets_fields() {
        let mut event = StreamEvent::new(10, vec![AttributeValue::Int(1)])
            .with_type(ComplexEventType::Expired);
        assert!(event.is_expired());
        event.clear();
        assert_eq!(event, StreamEvent::default());
    }
}
