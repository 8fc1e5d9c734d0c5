// SPDX-License-Identifier: MIT OR Apache-2.0

use super::stream_event::StreamEvent;
use super::stream_event_pool::StreamEventPool;
use crate::core::error::EventFluxResult;
use std::sync::Arc;

/// Copies flat events into instances drawn from a shared pool.
#[derive(Debug, Clone)]
pub struct StreamEventCloner {
    pool: Arc<StreamEventPool>,
}

impl StreamEventCloner {
    pub fn new(pool: Arc<StreamEventPool>) -> Self {
        Self { pool }
    }

    /// Independent copy with the same attributes, type and timestamp.
    pub fn copy_stream_event(&self, source: &StreamEvent) -> EventFluxResult<StreamEvent> {
        let mut copy = self.pool.borrow_event()?;
        copy.timestamp = source.timestamp;
        copy.event_type = source.event_type;
        copy.data.extend_from_slice(&source.data);
        Ok(copy)
    }

    pub fn release(&self, event: StreamEvent) {
        self.pool.release(event);
    }

    pub fn pool(&self) -> &Arc<StreamEventPool> {
        &self.pool
    }
}
