// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::core::error::{EventFluxError, EventFluxResult};
use serde::{Deserialize, Serialize};

/// Type of an event as released by the windowing layer (CURRENT, EXPIRED, TIMER, RESET).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ComplexEventType {
    #[default]
    Current,
    Expired,
    Timer,
    Reset,
}

/// Ordered, reusable batch of events handed between processors.
///
/// Iteration is cursor based: [`reset`](Self::reset) rewinds and
/// [`next_event`](Self::next_event) advances. [`clear`](Self::clear) keeps the
/// backing allocation so one chunk can be refilled for every hand-off.
#[derive(Debug, Clone)]
pub struct ComplexEventChunk<T> {
    events: Vec<T>,
    cursor: usize,
}

impl<T> Default for ComplexEventChunk<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ComplexEventChunk<T> {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            cursor: 0,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Vec::with_capacity(capacity),
            cursor: 0,
        }
    }

    /// Chunk holding exactly one event
    pub fn single(event: T) -> Self {
        let mut chunk = Self::with_capacity(1);
        chunk.add(event);
        chunk
    }

    pub fn add(&mut self, event: T) {
        self.events.push(event);
    }

    /// Rewind the cursor to the first event
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    pub fn has_next(&self) -> bool {
        self.cursor < self.events.len()
    }

    pub fn next_event(&mut self) -> Option<&T> {
        let event = self.events.get(self.cursor)?;
        self.cursor += 1;
        Some(event)
    }

    pub fn first(&self) -> Option<&T> {
        self.events.first()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.cursor = 0;
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.events.iter()
    }

    pub fn drain(&mut self) -> std::vec::Drain<'_, T> {
        self.cursor = 0;
        self.events.drain(..)
    }

    /// The only event in the chunk.
    ///
    /// State processors accept exactly one event per call; anything else is a
    /// contract violation reported against `component`.
    pub fn single_event(&self, component: &str) -> EventFluxResult<&T> {
        match self.events.as_slice() {
            [event] => Ok(event),
            events => Err(EventFluxError::contract_violation(
                component,
                format!("expected a chunk of exactly one event, got {}", events.len()),
            )),
        }
    }
}

impl<T> FromIterator<T> for ComplexEventChunk<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            events: iter.into_iter().collect(),
            cursor: 0,
        }
    }
}
